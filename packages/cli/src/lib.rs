// ABOUTME: Backstage server binary support: configuration, logging, startup, and commands
// ABOUTME: The `backstage` binary is a thin clap front end over this library

pub mod commands;
pub mod config;
pub mod logging;
pub mod server;

pub use backstage_core::ServiceKey;
pub use config::{Config, ConfigError, LogFormat};
pub use server::run_server;
