use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One outbound message to a reporter.
pub struct OutboundNotification {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification relay failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid notifier configuration: {0}")]
    InvalidConfig(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, notification: &OutboundNotification) -> Result<(), NotifyError>;
}
