//! Reporter notifications sent after a ticket write.

mod http_relay_notifier;
mod log_only_notifier;
mod notifier;
mod ticket_notification;

pub use http_relay_notifier::{HttpRelayConfig, HttpRelayNotifier};
pub use log_only_notifier::LogOnlyNotifier;
pub use notifier::{Notifier, NotifyError, OutboundNotification};
pub use ticket_notification::{render_ticket_notification, NotificationSender};
