use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when handing a message to the email provider
#[derive(Debug, Error)]
pub enum SendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

impl SendError {
    /// Transport failures, throttling and provider-side errors may succeed on
    /// a later attempt; rejected payloads will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::RequestError(_) => true,
            SendError::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            SendError::InvalidRecipient(_) => false,
        }
    }
}

/// Outbound email collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError>;

    fn name(&self) -> &str;
}

/// Payload accepted by the transactional email API
#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Mailer backed by a JSON-over-HTTP transactional email API
pub struct HttpMailer {
    endpoint: String,
    api_key: String,
    from: String,
    client: Client,
}

impl HttpMailer {
    pub fn new(
        endpoint: String,
        api_key: String,
        from: String,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            from,
            client,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        if !to.contains('@') {
            return Err(SendError::InvalidRecipient(to.to_string()));
        }

        let payload = OutboundEmail {
            from: &self.from,
            to: [to],
            subject,
            text: body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Email accepted by provider for {}", to);
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Mailer that only logs; the development default
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        tracing::info!("[log mailer] to={} subject={:?} ({} bytes)", to, subject, body.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
