use std::env;
use std::path::PathBuf;

/// Health check request timeout
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 3_000;

/// Remote activities proxy timeout
pub const ACTIVITIES_TIMEOUT_MS: u64 = 8_000;

/// Client data sync timeout
pub const CLIENT_SYNC_TIMEOUT_MS: u64 = 15_000;

/// Months of hosting billed when a quote does not say otherwise
pub const DEFAULT_HOSTING_MONTHS: u32 = 12;

/// Days a proposal stays valid after it is issued
pub const PROPOSAL_VALIDITY_DAYS: i64 = 30;

/// Largest accepted upload (2 MB)
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Header carrying the shared secret on calls to a client deployment
pub const CLIENT_API_KEY_HEADER: &str = "x-backstage-key";

/// Header carrying a project's telemetry key on ingestion calls
pub const TELEMETRY_API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the generated quote number on PDF responses
pub const QUOTE_NUMBER_HEADER: &str = "x-cotizacion-numero";

/// Header carrying the service key on privileged requests
pub const SERVICE_KEY_HEADER: &str = "x-service-key";

/// Get the path to the Backstage directory (~/.backstage)
pub fn backstage_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".backstage")
    } else {
        dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".backstage")
    }
}

/// Default SQLite database location (~/.backstage/backstage.db)
pub fn default_database_path() -> PathBuf {
    backstage_dir().join("backstage.db")
}

/// Default object storage root (~/.backstage/uploads)
pub fn default_upload_dir() -> PathBuf {
    backstage_dir().join("uploads")
}
