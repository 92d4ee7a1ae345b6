use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::MailError;

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Outbound mail delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Delivers mail by posting it as JSON to an HTTP mail relay.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!("Sending notification '{}' to {:?}", mail.subject, mail.to);
        debug!("Mail relay URL: {}", self.endpoint);

        let res = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(mail)
            .send()
            .await?;
        info!("Mail relay responded with status: {}", res.status());

        if !res.status().is_success() {
            return Err(MailError::Rejected(res.status().as_u16()));
        }
        Ok(())
    }
}

/// Logs messages instead of sending them. Used when no relay is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        info!(
            "No mail relay configured; would send '{}' from {} to {:?}:\n{}",
            mail.subject, mail.from, mail.to, mail.body
        );
        Ok(())
    }
}
