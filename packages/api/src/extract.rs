// ABOUTME: JSON body extractor whose rejections use the API error envelope
// ABOUTME: Malformed or incomplete bodies surface as 400 VALIDATION_ERROR instead of axum's plain text

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// Drop-in replacement for `Json<T>` in handler arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    debug!(status = %rejection.status(), "Rejected request body");
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::validation("request body must be application/json")
        }
        other => AppError::validation(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        nombre: String,
    }

    fn request(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_field_is_a_validation_error() {
        let err = ApiJson::<Payload>::from_request(request("application/json", "{}"), &())
            .await
            .unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("nombre"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_a_validation_error() {
        let err = ApiJson::<Payload>::from_request(request("text/plain", "{}"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let ApiJson(body) =
            ApiJson::<Payload>::from_request(request("application/json", r#"{"nombre":"Sur"}"#), &())
                .await
                .unwrap();
        assert_eq!(body.nombre, "Sur");
    }
}
