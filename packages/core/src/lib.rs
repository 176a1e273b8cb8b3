// ABOUTME: Core constants and utilities for Backstage
// ABOUTME: Foundational package providing shared functionality across all Backstage packages

pub mod constants;
pub mod secret;
pub mod utils;
pub mod validation;

// Re-export constants
pub use constants::{backstage_dir, default_database_path, default_upload_dir};

// Re-export the service key wrapper
pub use secret::ServiceKey;

// Re-export utilities
pub use utils::{format_clp, generate_id, generate_secret};

// Re-export validation
pub use validation::{require_non_empty, validate_email, ValidationError};
