use crate::config::DispatchConfig;
use crate::domain::ports::EventTransport;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

pub const CLIENT_IDENTIFIER: &str = concat!("contact-relay/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP {status}: {reason} - {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// Posts each event as JSON with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(CLIENT_IDENTIFIER)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        Self::new(config.request_timeout())
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    type Error = TransportError;

    async fn post_json(&self, target_url: &str, body: String) -> std::result::Result<(), TransportError> {
        let response = self
            .client
            .post(target_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Event response from {}: {}", target_url, status);

        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(TransportError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        })
    }
}
