// ABOUTME: Server configuration loaded from environment variables
// ABOUTME: Validates ports, URLs, and numbers; the service key stays wrapped until handed to the API

use std::net::{IpAddr, SocketAddr};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use backstage_api::ApiSettings;
use backstage_config::constants::*;
use backstage_config::{env_flag, env_millis, env_string};
use backstage_core::constants::{ACTIVITIES_TIMEOUT_MS, CLIENT_SYNC_TIMEOUT_MS, HEALTH_CHECK_TIMEOUT_MS};
use backstage_core::ServiceKey;
use backstage_proposals::Brand;
use backstage_storage::StorageConfig;
use backstage_support::TransitionPolicy;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4010;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_AVATAR_PATH: &str = "assets/avatar.jpg";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid bind address: {0}")]
    InvalidHost(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("Invalid log format: {0} (expected compact or json)")]
    InvalidLogFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" | "pretty" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub run_migrations: bool,
    pub public_key: Option<String>,
    pub service_key: Option<ServiceKey>,
    pub cors_origin: String,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub catalog_path: Option<PathBuf>,
    pub brand_name: Option<String>,
    pub brand_email: Option<String>,
    pub brand_website: Option<String>,
    pub avatar_path: PathBuf,
    pub health_timeout: Duration,
    pub activities_timeout: Duration,
    pub sync_timeout: Duration,
    /// `None` leaves background polling off
    pub health_poll_interval: Option<Duration>,
    pub strict_ticket_transitions: bool,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env_string(PORT) {
            Some(value) => value.parse::<u16>()?,
            None => DEFAULT_PORT,
        };

        // Validate port is in valid range
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let host_str = env_string(BACKSTAGE_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host_str
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host_str.clone()))?;

        let database_url = env_string(DATABASE_URL)
            .unwrap_or_else(|| StorageConfig::default().database_url);

        let health_poll_interval = match env_string(BACKSTAGE_HEALTH_POLL_SECS) {
            Some(value) => {
                let secs = value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                    name: BACKSTAGE_HEALTH_POLL_SECS,
                    value: value.clone(),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let log_format = match env_string(BACKSTAGE_LOG_FORMAT) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Config {
            host,
            port,
            database_url,
            run_migrations: env_flag(BACKSTAGE_RUN_MIGRATIONS, true),
            public_key: env_string(BACKSTAGE_PUBLIC_KEY),
            service_key: env_string(BACKSTAGE_SERVICE_KEY).map(ServiceKey::new),
            cors_origin: env_string(CORS_ORIGIN).unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            upload_dir: env_string(BACKSTAGE_UPLOAD_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(backstage_core::default_upload_dir),
            public_url: env_string(BACKSTAGE_PUBLIC_URL)
                .unwrap_or_else(|| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            catalog_path: env_string(BACKSTAGE_CATALOG_PATH).map(PathBuf::from),
            brand_name: env_string(BACKSTAGE_BRAND_NAME),
            brand_email: env_string(BACKSTAGE_BRAND_EMAIL),
            brand_website: env_string(BACKSTAGE_BRAND_WEBSITE),
            avatar_path: env_string(BACKSTAGE_AVATAR_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AVATAR_PATH)),
            health_timeout: Duration::from_millis(env_millis(
                BACKSTAGE_HEALTH_TIMEOUT_MS,
                HEALTH_CHECK_TIMEOUT_MS,
            )),
            activities_timeout: Duration::from_millis(env_millis(
                BACKSTAGE_ACTIVITIES_TIMEOUT_MS,
                ACTIVITIES_TIMEOUT_MS,
            )),
            sync_timeout: Duration::from_millis(env_millis(
                BACKSTAGE_SYNC_TIMEOUT_MS,
                CLIENT_SYNC_TIMEOUT_MS,
            )),
            health_poll_interval,
            strict_ticket_transitions: env_flag(BACKSTAGE_STRICT_TICKET_TRANSITIONS, false),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            database_url: self.database_url.clone(),
            run_migrations: self.run_migrations,
            ..StorageConfig::default()
        }
    }

    pub fn brand(&self) -> Brand {
        let defaults = Brand::default();
        Brand {
            nombre: self.brand_name.clone().unwrap_or(defaults.nombre),
            email: self.brand_email.clone(),
            sitio_web: self.brand_website.clone(),
            avatar_path: Some(self.avatar_path.clone()),
            color: defaults.color,
        }
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_ticket_transitions {
            TransitionPolicy::Forward
        } else {
            TransitionPolicy::Free
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            public_key: self.public_key.clone(),
            service_key: self.service_key.clone(),
            upload_dir: self.upload_dir.clone(),
            public_url: self.public_url.clone(),
            brand: self.brand(),
            transition_policy: self.transition_policy(),
            health_timeout: self.health_timeout,
            activities_timeout: self.activities_timeout,
            sync_timeout: self.sync_timeout,
        }
    }
}
