use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::secret_overrides::SecretOverrides;

fn message_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\s*<([^<>@\s]+)/issues/([0-9]+)@([^<>@\s.]+)\.([^<>@\s]+)\.([^<>@\s.]+)>\s*$",
        )
        .expect("message id pattern is valid")
    })
}

fn angle_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^<>\s]+>").expect("angle token pattern is valid"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Ticket coordinates recovered from a notification message id.
pub struct TicketRoute {
    pub repo: String,
    pub number: u64,
    pub provider: String,
    pub secret: String,
    #[serde(skip)]
    pub mailbox: String,
}

/// Render the message id stamped on ticket notifications.
///
/// Replies quote it back, and [`extract_ticket_route`] recovers the ticket.
pub fn render_ticket_message_id(
    repo: &str,
    number: u64,
    provider: &str,
    mailbox: &str,
    unique: u64,
) -> String {
    format!("<{repo}/issues/{number}@{provider}.{mailbox}.{unique}>")
}

/// Parse `<repo/issues/number@provider.secret.trailing>`.
pub fn extract_ticket_route(
    message_id: Option<&str>,
    overrides: &SecretOverrides,
) -> Option<TicketRoute> {
    let captures = message_id_pattern().captures(message_id?)?;
    let repo = captures.get(1)?.as_str();
    let number = captures.get(2)?.as_str().parse::<u64>().ok()?;
    let provider = captures.get(3)?.as_str();
    let mailbox = captures.get(4)?.as_str();
    Some(TicketRoute {
        repo: repo.to_string(),
        number,
        provider: provider.to_string(),
        secret: overrides.resolve(mailbox),
        mailbox: mailbox.to_string(),
    })
}

/// Return the first ticket route among the ids of an `In-Reply-To`/`References` header.
pub fn first_ticket_route(header: Option<&str>, overrides: &SecretOverrides) -> Option<TicketRoute> {
    angle_token_pattern()
        .find_iter(header?)
        .find_map(|token| extract_ticket_route(Some(token.as_str()), overrides))
}
