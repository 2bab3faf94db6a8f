use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
#[error("email delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Out-of-band notification channel.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), DeliveryError>;
}

/// Development sender: writes messages to the log instead of delivering them.
#[derive(Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), DeliveryError> {
        if email.to.trim().is_empty() {
            return Err(DeliveryError("missing recipient".into()));
        }
        info!(from = %self.from, to = %email.to, subject = %email.subject, "email sent");
        debug!(body = %email.body, "email body");
        Ok(())
    }
}
