// ABOUTME: Application error type returned by every handler
// ABOUTME: Maps domain errors to status codes, machine-readable codes, and sanitized messages

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use backstage_core::ValidationError;
use backstage_monitoring::{ClientApiError, SyncError};
use backstage_pricing::PricingError;
use backstage_proposals::ProposalError;
use backstage_storage::StorageError;
use backstage_support::SupportError;

/// Main application error type that all handlers return
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Unauthorized access")]
    Unauthorized,

    /// A call to a client deployment failed
    #[error(transparent)]
    Remote(#[from] ClientApiError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Structured error response format for API consistency
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ErrorDetail,
    request_id: String,
}

/// Error detail structure with machine-readable codes
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// Convert AppError to appropriate HTTP status code and error code
    fn to_status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Remote(remote) => match remote {
                ClientApiError::MissingUrl
                | ClientApiError::MissingKey
                | ClientApiError::InvalidUrl(_) => {
                    (StatusCode::BAD_REQUEST, "CLIENT_API_NOT_CONFIGURED")
                }
                ClientApiError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "CLIENT_API_UNAUTHORIZED")
                }
                ClientApiError::MissingEndpoint(_) => {
                    (StatusCode::BAD_GATEWAY, "CLIENT_API_ENDPOINT_MISSING")
                }
                ClientApiError::Unreachable(_) => (StatusCode::BAD_GATEWAY, "CLIENT_API_UNREACHABLE"),
                ClientApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "CLIENT_API_ERROR"),
                ClientApiError::InvalidPayload(_) => {
                    (StatusCode::BAD_GATEWAY, "CLIENT_API_INVALID_PAYLOAD")
                }
                ClientApiError::Timeout(_) | ClientApiError::Cancelled => {
                    (StatusCode::GATEWAY_TIMEOUT, "CLIENT_API_TIMEOUT")
                }
            },
            AppError::Storage(storage_error) => match storage_error {
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
                StorageError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Get user-friendly error message (sanitized for external consumption)
    fn to_user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => format!("Validation failed: {}", msg),
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::Unauthorized => "A valid API key is required".to_string(),
            // Transport details can carry internal hostnames
            AppError::Remote(ClientApiError::Unreachable(_)) => {
                "Client API is unreachable".to_string()
            }
            AppError::Remote(remote) => remote.to_string(),
            AppError::Storage(StorageError::NotFound(resource)) => format!("{} not found", resource),
            AppError::Storage(StorageError::Conflict(msg)) => msg.clone(),
            AppError::Storage(_) => "Data storage error".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status_code, error_code) = self.to_status_and_code();
        let user_message = self.to_user_message();

        // Log internal errors with full context but don't expose details
        if status_code.is_server_error() {
            error!(
                request_id = %request_id,
                error_code = %error_code,
                error = %self,
                "Request failed"
            );
        } else {
            info!(
                request_id = %request_id,
                error_code = %error_code,
                error = %self,
                "API error response"
            );
        }

        let error_response = ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: error_code.to_string(),
                message: user_message,
            },
            request_id,
        };

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<SupportError> for AppError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::Validation(e) => e.into(),
            SupportError::InvalidTransition { .. } => AppError::Validation(err.to_string()),
            SupportError::Storage(e) => e.into(),
        }
    }
}

impl From<ProposalError> for AppError {
    fn from(err: ProposalError) -> Self {
        match err {
            ProposalError::Pricing(e) => e.into(),
            ProposalError::InvalidState(e) => AppError::Validation(e.to_string()),
            ProposalError::MissingClientName => {
                AppError::Validation("cliente.nombre is required".to_string())
            }
            ProposalError::Storage(e) => e.into(),
            other @ (ProposalError::Render(_) | ProposalError::CorruptPayload { .. }) => {
                AppError::Internal(anyhow::anyhow!(other.to_string()))
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Remote(e) => e.into(),
            SyncError::Storage(e) => e.into(),
        }
    }
}
