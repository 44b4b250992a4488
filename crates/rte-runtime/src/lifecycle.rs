use std::sync::Arc;

use rte_core::{normalize_title, strip_document_wrapper, HistoryCodec};
use rte_notify::{render_ticket_notification, NotificationSender, Notifier};
use rte_tracker::{Ticket, TicketAttrs, TicketId, TicketStatus, TrackerError};
use serde::Serialize;
use thiserror::Error;

use crate::account_registry::Account;
use crate::clock::Clock;
use crate::debouncer::DuplicateCounter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent { to: String },
    /// The provider knows no reporter address.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandleOutcome {
    /// Folded into a lookup already in flight for the same key.
    Debounced { generic_title: String },
    Created {
        ticket: TicketId,
        occurrences: u64,
        notification: NotificationStatus,
    },
    Updated {
        ticket: TicketId,
        occurrences: u64,
        notification: NotificationStatus,
    },
    Reopened {
        ticket: TicketId,
        occurrences: u64,
        notification: NotificationStatus,
    },
    SkippedWontfix { ticket: TicketId, occurrences: u64 },
}

impl HandleOutcome {
    pub fn ticket(&self) -> Option<TicketId> {
        match self {
            Self::Debounced { .. } => None,
            Self::Created { ticket, .. }
            | Self::Updated { ticket, .. }
            | Self::Reopened { ticket, .. }
            | Self::SkippedWontfix { ticket, .. } => Some(*ticket),
        }
    }

    pub fn occurrences(&self) -> u64 {
        match self {
            Self::Debounced { .. } => 0,
            Self::Created { occurrences, .. }
            | Self::Updated { occurrences, .. }
            | Self::Reopened { occurrences, .. }
            | Self::SkippedWontfix { occurrences, .. } => *occurrences,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("ticket lookup for '{generic_title}' failed: {source}")]
    Lookup {
        generic_title: String,
        #[source]
        source: TrackerError,
    },
    #[error("ticket {action} failed: {source}")]
    Write {
        action: &'static str,
        #[source]
        source: TrackerError,
    },
}

/// Decides create/update/reopen for an error report and notifies the reporter.
pub struct TicketLifecycleController {
    counter: Arc<DuplicateCounter>,
    codec: HistoryCodec,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    notify_from: String,
}

impl TicketLifecycleController {
    pub fn new(
        counter: Arc<DuplicateCounter>,
        codec: HistoryCodec,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        notify_from: impl Into<String>,
    ) -> Self {
        Self {
            counter,
            codec,
            notifier,
            clock,
            notify_from: notify_from.into(),
        }
    }

    pub fn counter(&self) -> &DuplicateCounter {
        &self.counter
    }

    pub fn codec(&self) -> &HistoryCodec {
        &self.codec
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, account, body),
        fields(repo = %account.key.repo, provider = %account.key.provider)
    )]
    pub async fn handle(
        &self,
        account: &Account,
        title: &str,
        body: &str,
    ) -> Result<HandleOutcome, LifecycleError> {
        let generic_title = normalize_title(Some(title));
        if self.counter.note_occurrence(&account.key, &generic_title) {
            tracing::debug!(%generic_title, "occurrence folded into pending lookup");
            return Ok(HandleOutcome::Debounced { generic_title });
        }

        let lookup = account.client.find_ticket_by_title(&generic_title).await;
        let occurrences = self
            .counter
            .consume_and_reset(&account.key, &generic_title)
            .max(1);
        let found = lookup.map_err(|source| LifecycleError::Lookup {
            generic_title: generic_title.clone(),
            source,
        })?;

        let status = found
            .as_ref()
            .map(|ticket| account.client.classify(ticket));
        if let (Some(ticket), Some(TicketStatus::Wontfix)) = (found.as_ref(), status) {
            let id = account.client.id_for(ticket);
            tracing::info!(
                %generic_title,
                ticket_id = %id,
                occurrences,
                "ticket marked wontfix, skipping"
            );
            return Ok(HandleOutcome::SkippedWontfix {
                ticket: id,
                occurrences,
            });
        }

        let attrs = TicketAttrs {
            title: title.to_string(),
            body: self.final_body(body, found.as_ref(), occurrences),
        };
        let outcome = match (found.as_ref(), status) {
            (Some(ticket), Some(TicketStatus::Closed)) => {
                let id = account.client.id_for(ticket);
                let written = account
                    .client
                    .reopen_ticket(id, &attrs)
                    .await
                    .map_err(|source| LifecycleError::Write {
                        action: "reopen",
                        source,
                    })?;
                tracing::info!(%generic_title, ticket_id = %id, occurrences, "reopened ticket");
                let notification = self.notify(account, &written, occurrences).await;
                HandleOutcome::Reopened {
                    ticket: id,
                    occurrences,
                    notification,
                }
            }
            (Some(ticket), _) => {
                let id = account.client.id_for(ticket);
                let written = account
                    .client
                    .update_ticket(id, &attrs)
                    .await
                    .map_err(|source| LifecycleError::Write {
                        action: "update",
                        source,
                    })?;
                tracing::info!(%generic_title, ticket_id = %id, occurrences, "updated ticket");
                let notification = self.notify(account, &written, occurrences).await;
                HandleOutcome::Updated {
                    ticket: id,
                    occurrences,
                    notification,
                }
            }
            (None, _) => {
                let written = account
                    .client
                    .create_ticket(&attrs)
                    .await
                    .map_err(|source| LifecycleError::Write {
                        action: "create",
                        source,
                    })?;
                let id = account.client.id_for(&written);
                tracing::info!(%generic_title, ticket_id = %id, occurrences, "created ticket");
                let notification = self.notify(account, &written, occurrences).await;
                HandleOutcome::Created {
                    ticket: id,
                    occurrences,
                    notification,
                }
            }
        };
        Ok(outcome)
    }

    fn final_body(&self, body: &str, found: Option<&Ticket>, occurrences: u64) -> String {
        let visible = strip_document_wrapper(body);
        let prior = found
            .map(|ticket| self.codec.decode(&ticket.body).history)
            .unwrap_or_default();
        self.codec
            .merge_occurrences(&visible, &prior, occurrences, self.clock.today())
    }

    async fn notify(
        &self,
        account: &Account,
        ticket: &Ticket,
        occurrences: u64,
    ) -> NotificationStatus {
        let to = match account.client.resolve_reporter_email().await {
            Ok(Some(to)) => to,
            Ok(None) => {
                tracing::debug!(
                    ticket_id = ticket.number,
                    "no reporter address, notification skipped"
                );
                return NotificationStatus::Skipped;
            }
            Err(error) => {
                tracing::warn!(
                    ticket_id = ticket.number,
                    %error,
                    "reporter address lookup failed"
                );
                return NotificationStatus::Failed {
                    error: error.to_string(),
                };
            }
        };

        let notification = render_ticket_notification(
            NotificationSender {
                repo: &account.key.repo,
                provider: account.key.provider,
                mailbox: &account.mailbox,
                from: &self.notify_from,
            },
            &to,
            ticket,
            occurrences,
            self.clock.unix_ms(),
        );
        match self.notifier.send_message(&notification).await {
            Ok(()) => {
                tracing::info!(ticket_id = ticket.number, %to, "notification sent");
                NotificationStatus::Sent { to }
            }
            Err(error) => {
                tracing::warn!(ticket_id = ticket.number, %to, %error, "notification failed");
                NotificationStatus::Failed {
                    error: error.to_string(),
                }
            }
        }
    }
}
