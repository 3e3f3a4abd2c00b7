//! Extractors whose rejections use the response envelope
//!
//! axum's own `Json` and `Path` reject with a plain-text body. These wrap
//! them and turn the rejection into an [`ApiError`] with code
//! `INVALID_PARAMETER`, keeping axum's status (400, 415 or 422).

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use super::response::{ApiError, error_codes};

/// JSON request body
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

/// Path parameters
#[derive(Debug)]
pub struct PathParam<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        ApiError::new(
            rejection.status(),
            error_codes::INVALID_PARAMETER,
            format!("Invalid JSON: {}", rejection.body_text()),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(
            rejection.status(),
            error_codes::INVALID_PARAMETER,
            format!("Invalid path: {}", rejection.body_text()),
        )
    }
}

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(PathParam(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use axum::http::Request as HttpRequest;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        amount: String,
    }

    fn json_request(body: &'static str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_uses_envelope_code() {
        let err = JsonBody::<Payload>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, error_codes::INVALID_PARAMETER);
        assert!(err.msg.starts_with("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_missing_field_keeps_unprocessable_status() {
        let err = JsonBody::<Payload>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, error_codes::INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"amount":"1.00"}"#))
            .unwrap();
        let err = JsonBody::<Payload>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.code, error_codes::INVALID_PARAMETER);
    }
}
