use async_trait::async_trait;
use pilot999_shared::{ContactReply, ContactRequest};
use reqwest::Url;
use thiserror::Error;

use crate::api_base::ApiBase;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// What came back from the relay. `reply` is `None` when the body was not a
/// reply object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub reply: Option<ContactReply>,
}

impl ApiResponse {
    /// Accepted only with a 2xx status and `ok: true` in the body
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.reply.as_ref().is_some_and(|reply| reply.ok)
    }

    /// Error text supplied by the server, if any
    pub fn error_message(&self) -> Option<&str> {
        self.reply
            .as_ref()
            .and_then(|reply| reply.error.as_deref())
            .filter(|message| !message.is_empty())
    }
}

/// The relay's submit operation
#[async_trait]
pub trait ContactApi: Send + Sync {
    /// `Err` only when no HTTP response arrived at all
    async fn submit(&self, request: &ContactRequest) -> Result<ApiResponse, ClientError>;
}

pub struct HttpContactApi {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpContactApi {
    pub fn new(site: &Url, base: &ApiBase) -> Result<Self, ClientError> {
        let endpoint = base
            .resolve(site, "contact")
            .map_err(ClientError::InvalidUrl)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ContactApi for HttpContactApi {
    async fn submit(&self, request: &ContactRequest) -> Result<ApiResponse, ClientError> {
        tracing::debug!(endpoint = %self.endpoint, "submitting contact form");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        // An unreadable or non-JSON body is a failed submission, not a network error
        let reply = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<ContactReply>(&bytes).ok(),
            Err(err) => {
                tracing::debug!(error = %err, "could not read response body");
                None
            }
        };

        Ok(ApiResponse { status, reply })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_needs_status_and_ok_flag() {
        let ok = ApiResponse {
            status: 200,
            reply: Some(ContactReply::ok()),
        };
        let ok_flag_on_error_status = ApiResponse {
            status: 500,
            reply: Some(ContactReply::ok()),
        };
        let no_body = ApiResponse {
            status: 200,
            reply: None,
        };

        assert!(ok.is_success());
        assert!(!ok_flag_on_error_status.is_success());
        assert!(!no_body.is_success());
    }

    #[test]
    fn test_error_message_ignores_blank_text() {
        let with_message = ApiResponse {
            status: 400,
            reply: Some(ContactReply::error("Invalid email.")),
        };
        let blank = ApiResponse {
            status: 400,
            reply: Some(ContactReply::error("")),
        };

        assert_eq!(with_message.error_message(), Some("Invalid email."));
        assert_eq!(blank.error_message(), None);
    }

    #[test]
    fn test_endpoint_follows_api_base() {
        let site = Url::parse("http://localhost:8080/").unwrap();
        let api = HttpContactApi::new(&site, &ApiBase::new(Some("/relay/"))).unwrap();

        assert_eq!(api.endpoint().as_str(), "http://localhost:8080/relay/contact");
    }
}
