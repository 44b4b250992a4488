use rte_routing::render_ticket_message_id;
use rte_tracker::{ProviderKind, Ticket};

use crate::notifier::OutboundNotification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Account coordinates stamped into a notification's message id.
pub struct NotificationSender<'a> {
    pub repo: &'a str,
    pub provider: ProviderKind,
    pub mailbox: &'a str,
    pub from: &'a str,
}

/// Build the reporter notification for a ticket the provider just wrote.
///
/// `unique` keeps message ids distinct across writes to the same ticket.
pub fn render_ticket_notification(
    sender: NotificationSender<'_>,
    to: &str,
    ticket: &Ticket,
    occurrences: u64,
    unique: u64,
) -> OutboundNotification {
    let mut body = format!("#{}: {}\n", ticket.number, ticket.title);
    if let Some(url) = ticket.public_url() {
        body.push_str(url);
        body.push('\n');
    }
    if let Some(reporter) = ticket.reporter.as_deref() {
        body.push_str(&format!("reporter: {reporter}\n"));
    }
    body.push_str(&format!("occurrences: {occurrences}\n"));

    OutboundNotification {
        to: to.to_string(),
        from: sender.from.to_string(),
        subject: format!("[{}] {}", sender.repo, ticket.title),
        body,
        message_id: render_ticket_message_id(
            sender.repo,
            ticket.number,
            sender.provider.as_str(),
            sender.mailbox,
            unique,
        ),
    }
}

#[cfg(test)]
mod tests {
    use rte_routing::{extract_ticket_route, SecretOverrides};
    use rte_tracker::{ProviderKind, Ticket};

    use super::{render_ticket_notification, NotificationSender};

    fn ticket() -> Ticket {
        Ticket {
            number: 42,
            title: "timeout after 30s".to_string(),
            body: String::new(),
            state: "open".to_string(),
            labels: Vec::new(),
            url: None,
            html_url: Some("https://github.test/owner/repo/issues/42".to_string()),
            reporter: Some("octo".to_string()),
        }
    }

    fn sender() -> NotificationSender<'static> {
        NotificationSender {
            repo: "owner/repo",
            provider: ProviderKind::Github,
            mailbox: "mailbox",
            from: "errors@example.test",
        }
    }

    #[test]
    fn unit_render_ticket_notification_references_ticket_attributes() {
        let notification =
            render_ticket_notification(sender(), "dev@example.test", &ticket(), 3, 1_700_000_000_000);
        assert_eq!(notification.to, "dev@example.test");
        assert_eq!(notification.from, "errors@example.test");
        assert_eq!(notification.subject, "[owner/repo] timeout after 30s");
        assert_eq!(
            notification.body,
            "#42: timeout after 30s\nhttps://github.test/owner/repo/issues/42\nreporter: octo\noccurrences: 3\n"
        );
        assert_eq!(
            notification.message_id,
            "<owner/repo/issues/42@github.mailbox.1700000000000>"
        );
    }

    #[test]
    fn functional_rendered_message_id_routes_replies_back_to_the_ticket() {
        let notification = render_ticket_notification(sender(), "dev@example.test", &ticket(), 1, 7);
        let route = extract_ticket_route(
            Some(&notification.message_id),
            &SecretOverrides::default(),
        )
        .expect("route");
        assert_eq!(route.repo, "owner/repo");
        assert_eq!(route.number, 42);
        assert_eq!(route.provider, "github");
        assert_eq!(route.secret, "mailbox");
    }
}
