use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::{Ticket, TicketAttrs, TicketId, TicketStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Closed set of supported tracker backends.
pub enum ProviderKind {
    None,
    Github,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider '{0}', expected one of: none, github")]
pub struct ProviderKindParseError(pub String);

impl FromStr for ProviderKind {
    type Err = ProviderKindParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "github" => Ok(Self::Github),
            _ => Err(ProviderKindParseError(raw.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed with status {status}: {body}")]
    HttpStatus {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid repository '{0}', expected owner/repo")]
    InvalidRepo(String),
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("ticket #{0} not found")]
    TicketNotFound(TicketId),
}

#[async_trait]
/// Capability set the lifecycle controller needs from an issue tracker.
pub trait TicketProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Find the ticket whose normalized title equals `generic_title`.
    async fn find_ticket_by_title(&self, generic_title: &str)
        -> Result<Option<Ticket>, TrackerError>;

    async fn create_ticket(&self, attrs: &TicketAttrs) -> Result<Ticket, TrackerError>;

    async fn update_ticket(&self, id: TicketId, attrs: &TicketAttrs)
        -> Result<Ticket, TrackerError>;

    async fn reopen_ticket(&self, id: TicketId, attrs: &TicketAttrs)
        -> Result<Ticket, TrackerError>;

    async fn comment_on_ticket(&self, id: TicketId, body: &str) -> Result<(), TrackerError>;

    /// Address that should hear about ticket writes, when the provider knows one.
    async fn resolve_reporter_email(&self) -> Result<Option<String>, TrackerError>;

    fn is_closed(&self, ticket: &Ticket) -> bool {
        ticket.is_state("closed")
    }

    fn is_wontfix(&self, ticket: &Ticket) -> bool {
        ticket.has_wontfix_label()
    }

    fn id_for(&self, ticket: &Ticket) -> TicketId {
        TicketId(ticket.number)
    }

    fn classify(&self, ticket: &Ticket) -> TicketStatus {
        if self.is_wontfix(ticket) {
            TicketStatus::Wontfix
        } else if self.is_closed(ticket) {
            TicketStatus::Closed
        } else {
            TicketStatus::Open
        }
    }
}
