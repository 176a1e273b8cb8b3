// ABOUTME: Authenticated GET requests against a client deployment's Backstage API
// ABOUTME: Maps transport, status, timeout, and cancellation outcomes to ClientApiError

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use backstage_core::constants::CLIENT_API_KEY_HEADER;

/// Failures talking to a client deployment, each with its own message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientApiError {
    #[error("Project has no client API URL configured")]
    MissingUrl,

    #[error("Project has no client API key configured")]
    MissingKey,

    #[error("Client API URL '{0}' is not a valid http(s) URL")]
    InvalidUrl(String),

    #[error("Client API is unreachable: {0}")]
    Unreachable(String),

    #[error("Client API rejected the configured API key")]
    InvalidCredentials,

    #[error("Client API does not expose {0}; the deployment may be outdated")]
    MissingEndpoint(String),

    #[error("Client API failed with HTTP {0}")]
    Upstream(u16),

    #[error("Client API did not answer within {0} ms")]
    Timeout(u64),

    #[error("Request to the client API was cancelled")]
    Cancelled,

    #[error("Client API returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// Resolved base URL and shared secret for one client deployment
#[derive(Debug, Clone)]
pub struct ClientEndpoint {
    pub base: Url,
    pub api_key: String,
}

impl ClientEndpoint {
    pub fn resolve(url: Option<&str>, api_key: Option<&str>) -> Result<Self, ClientApiError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ClientApiError::MissingUrl)?;
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ClientApiError::MissingKey)?;

        let mut base = Url::parse(url).map_err(|_| ClientApiError::InvalidUrl(url.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientApiError::InvalidUrl(url.to_string()));
        }
        // Join relative paths under the configured prefix rather than replacing its last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            api_key: api_key.to_string(),
        })
    }

    /// Absolute URL for an API path or a relative asset reference
    pub fn join(&self, path: &str) -> Option<Url> {
        self.base.join(path.trim_start_matches('/')).ok()
    }

    /// Absolute form of a possibly relative URL found in a payload
    pub fn resolve_asset(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match Url::parse(value) {
            Ok(absolute) => Some(absolute.to_string()),
            Err(_) => self.base.join(value).ok().map(|u| u.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientApi {
    http: reqwest::Client,
}

impl ClientApi {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// GET `path` under the endpoint and return the body bytes of a 2xx answer
    pub async fn get(
        &self,
        endpoint: &ClientEndpoint,
        path: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ClientApiError> {
        let url = endpoint
            .join(path)
            .ok_or_else(|| ClientApiError::InvalidUrl(endpoint.base.to_string()))?;
        let timeout_ms = timeout.as_millis() as u64;
        debug!("GET {} (timeout {} ms)", url, timeout_ms);

        let request = async {
            let response = self
                .http
                .get(url.clone())
                .header(CLIENT_API_KEY_HEADER, &endpoint.api_key)
                .send()
                .await
                .map_err(|e| transport_error(e, timeout_ms))?;

            let status = response.status();
            match status.as_u16() {
                401 => return Err(ClientApiError::InvalidCredentials),
                404 => return Err(ClientApiError::MissingEndpoint(path.to_string())),
                code if !status.is_success() => return Err(ClientApiError::Upstream(code)),
                _ => {}
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| transport_error(e, timeout_ms))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientApiError::Cancelled),
            outcome = tokio::time::timeout(timeout, request) => {
                outcome.unwrap_or(Err(ClientApiError::Timeout(timeout_ms)))
            }
        }
    }
}

fn transport_error(error: reqwest::Error, timeout_ms: u64) -> ClientApiError {
    if error.is_timeout() {
        ClientApiError::Timeout(timeout_ms)
    } else {
        ClientApiError::Unreachable(error.to_string())
    }
}
