// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Backstage

// Server
pub const BACKSTAGE_HOST: &str = "BACKSTAGE_HOST";
pub const PORT: &str = "PORT";
pub const BACKSTAGE_PUBLIC_URL: &str = "BACKSTAGE_PUBLIC_URL";

// CORS Configuration
pub const CORS_ORIGIN: &str = "CORS_ORIGIN";

// Database
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const BACKSTAGE_RUN_MIGRATIONS: &str = "BACKSTAGE_RUN_MIGRATIONS";

// Credential tiers
pub const BACKSTAGE_PUBLIC_KEY: &str = "BACKSTAGE_PUBLIC_KEY";
pub const BACKSTAGE_SERVICE_KEY: &str = "BACKSTAGE_SERVICE_KEY";

// Object storage
pub const BACKSTAGE_UPLOAD_DIR: &str = "BACKSTAGE_UPLOAD_DIR";

// Quotes and branding
pub const BACKSTAGE_CATALOG_PATH: &str = "BACKSTAGE_CATALOG_PATH";
pub const BACKSTAGE_BRAND_NAME: &str = "BACKSTAGE_BRAND_NAME";
pub const BACKSTAGE_BRAND_EMAIL: &str = "BACKSTAGE_BRAND_EMAIL";
pub const BACKSTAGE_BRAND_WEBSITE: &str = "BACKSTAGE_BRAND_WEBSITE";
pub const BACKSTAGE_AVATAR_PATH: &str = "BACKSTAGE_AVATAR_PATH";

// Outbound HTTP timeouts
pub const BACKSTAGE_HEALTH_TIMEOUT_MS: &str = "BACKSTAGE_HEALTH_TIMEOUT_MS";
pub const BACKSTAGE_ACTIVITIES_TIMEOUT_MS: &str = "BACKSTAGE_ACTIVITIES_TIMEOUT_MS";
pub const BACKSTAGE_SYNC_TIMEOUT_MS: &str = "BACKSTAGE_SYNC_TIMEOUT_MS";

// Background health polling (0 disables it)
pub const BACKSTAGE_HEALTH_POLL_SECS: &str = "BACKSTAGE_HEALTH_POLL_SECS";

// Support workflow
pub const BACKSTAGE_STRICT_TICKET_TRANSITIONS: &str = "BACKSTAGE_STRICT_TICKET_TRANSITIONS";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
pub const BACKSTAGE_LOG_FORMAT: &str = "BACKSTAGE_LOG_FORMAT";
