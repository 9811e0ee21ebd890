use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pilot999_shared::{messages, ContactReply};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::mailer::DeliveryError;
use crate::metrics;
use crate::validation::ValidationError;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Every way a request can fail
///
/// Validation failures are reported to the caller verbatim. Configuration and
/// delivery failures are logged in full and answered with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("malformed request body: {0}")]
    InvalidBody(String),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("email transport not configured: {0}")]
    Configuration(#[from] ConfigError),
    #[error("email delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("no route for {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Delivery(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message safe to show the caller
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(err) => err.to_string(),
            ApiError::InvalidBody(_) => messages::INVALID_BODY.to_string(),
            ApiError::PayloadTooLarge => messages::PAYLOAD_TOO_LARGE.to_string(),
            ApiError::Configuration(_) => messages::NOT_CONFIGURED.to_string(),
            ApiError::Delivery(_) => messages::SEND_FAILED.to_string(),
            ApiError::NotFound(_) => messages::NOT_FOUND.to_string(),
        }
    }

    fn outcome(&self) -> Option<&'static str> {
        match self {
            ApiError::Validation(_) | ApiError::InvalidBody(_) | ApiError::PayloadTooLarge => {
                Some(metrics::OUTCOME_REJECTED)
            }
            ApiError::Configuration(_) => Some(metrics::OUTCOME_MISCONFIGURED),
            ApiError::Delivery(_) => Some(metrics::OUTCOME_DELIVERY_FAILED),
            ApiError::NotFound(_) => None,
        }
    }

    fn log(&self, correlation_id: &str) {
        match self {
            ApiError::Configuration(err) => {
                tracing::error!(correlation_id, error = %err, "contact relay is misconfigured")
            }
            ApiError::Delivery(err) => {
                tracing::warn!(correlation_id, error = %err, "contact email delivery failed")
            }
            ApiError::NotFound(path) => tracing::debug!(correlation_id, path = %path, "route not found"),
            other => tracing::info!(correlation_id, reason = %other, "contact submission rejected"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        self.log(&correlation_id);
        if let Some(outcome) = self.outcome() {
            metrics::record_contact_outcome(outcome);
        }

        let mut response = (self.status(), Json(ContactReply::error(self.public_message())))
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static(CORRELATION_ID_HEADER), value);
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn configuration_details_are_hidden() {
        let response = ApiError::Configuration(ConfigError::MissingEnv("SMTP_HOST")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Server email not configured.");
        assert!(!body.to_string().contains("SMTP_HOST"));
    }

    #[tokio::test]
    async fn delivery_details_are_hidden() {
        let response =
            ApiError::Delivery(DeliveryError::Smtp("550 mailbox unavailable".into())).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Email send failed.");
    }

    #[tokio::test]
    async fn validation_reason_is_specific() {
        let response = ApiError::from(ValidationError::InvalidEmail).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid email.");
    }
}
