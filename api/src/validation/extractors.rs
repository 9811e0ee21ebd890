//! Custom Axum extractors for validated input
//!
//! `ValidatedJson<T>` reads the request body, sanitizes it into `T` and
//! validates the result before the handler runs.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
};
use serde_json::{Map, Value};

use super::validators::ValidationError;
use crate::error::ApiError;

/// Trait for request types built from a loosely typed JSON payload
pub trait Validatable: Sized {
    /// Build the sanitized value from the raw payload. Never fails.
    fn from_payload(payload: &Value) -> Self;

    /// Check the sanitized value
    fn validate(&self) -> Result<(), ValidationError>;
}

/// JSON extractor that sanitizes and validates its payload
///
/// Bodies without a JSON content type, and empty bodies, are read as an empty
/// object so that every field counts as missing. Bodies that claim to be JSON
/// but fail to parse are rejected.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: Validatable + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = has_json_content_type(req.headers());

        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                ApiError::InvalidBody(rejection.body_text())
            }
        })?;

        let payload = parse_payload(is_json, &body)?;
        let data = T::from_payload(&payload);
        data.validate()?;

        Ok(ValidatedJson(data))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn parse_payload(is_json: bool, body: &[u8]) -> Result<Value, ApiError> {
    if !is_json || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body).map_err(|err| ApiError::InvalidBody(err.to_string()))
}
