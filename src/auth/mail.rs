//! Mail delivery abstraction for OTP dispatch.
//!
//! The default sender for local dev is `LogMailer`, which logs and returns
//! `Ok(())`. `HttpMailer` posts the message as JSON to a delivery endpoint
//! (an SMTP bridge or a provider API).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::api::APP_USER_AGENT;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error for the caller to surface.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(to_email = %to, subject = %subject, body = %body, "mail send stub");
        Ok(())
    }
}

/// Posts messages to an HTTP mail endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: Url,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: Url, from: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build mail client")?;

        Ok(Self {
            client,
            endpoint,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "text": body,
        });

        self.client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .context("failed to reach mail endpoint")?
            .error_for_status()
            .context("mail endpoint rejected message")?;

        Ok(())
    }
}
