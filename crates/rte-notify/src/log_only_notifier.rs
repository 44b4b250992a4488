use async_trait::async_trait;

use crate::notifier::{Notifier, NotifyError, OutboundNotification};

#[derive(Debug, Clone, Copy, Default)]
/// Notifier used when no relay is configured; the message only reaches the log.
pub struct LogOnlyNotifier;

#[async_trait]
impl Notifier for LogOnlyNotifier {
    async fn send_message(&self, notification: &OutboundNotification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            message_id = %notification.message_id,
            "notification not relayed"
        );
        Ok(())
    }
}
