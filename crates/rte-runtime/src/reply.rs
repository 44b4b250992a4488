use rte_tracker::{TicketId, TrackerError};
use serde::Serialize;

use crate::account_registry::Account;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyOutcome {
    pub repo: String,
    pub ticket: TicketId,
}

/// Post a reply to a ticket notification as a comment on that ticket.
///
/// Replies bypass the debouncer and leave the occurrence history alone.
pub async fn post_reply_comment(
    account: &Account,
    ticket: TicketId,
    body: &str,
) -> Result<ReplyOutcome, TrackerError> {
    account.client.comment_on_ticket(ticket, body).await?;
    tracing::info!(repo = %account.key.repo, ticket_id = %ticket, "reply commented");
    Ok(ReplyOutcome {
        repo: account.key.repo.clone(),
        ticket,
    })
}
