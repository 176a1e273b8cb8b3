// ABOUTME: Environment variable names and parsing helpers for Backstage
// ABOUTME: Shared by the CLI binary and any package that reads configuration

pub mod constants;

use std::env;
use tracing::warn;

/// Read an environment variable, treating empty values as unset
pub fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a boolean flag, falling back to `default` when unset or unparseable
pub fn env_flag(name: &str, default: bool) -> bool {
    match env_string(name) {
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                warn!("Ignoring invalid boolean for {}: {}", name, other);
                default
            }
        },
        None => default,
    }
}

/// Read a millisecond timeout, falling back to `default_ms`
pub fn env_millis(name: &str, default_ms: u64) -> u64 {
    match env_string(name) {
        Some(value) => value.parse::<u64>().unwrap_or_else(|_| {
            warn!("Ignoring invalid timeout for {}: {}", name, value);
            default_ms
        }),
        None => default_ms,
    }
}
