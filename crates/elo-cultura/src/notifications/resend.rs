use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{EmailMessage, Mailer, MailerError};
use crate::config::EmailConfig;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Resend HTTP API transport.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, api_key: String, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
            endpoint: RESEND_API_URL.to_string(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &EmailConfig) -> Option<Self> {
        config
            .api_key
            .clone()
            .map(|key| Self::new(client, key, config.from.clone()))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let payload = ResendPayload {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Fallback transport for environments without e-mail credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!(
            template = message.template,
            to = %message.to,
            subject = %message.subject,
            "e-mail delivery disabled; notification logged only"
        );
        Ok(())
    }
}
