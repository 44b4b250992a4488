use std::fmt;

use serde::{Deserialize, Serialize};

/// Labels that mark a ticket as intentionally not fixed.
pub const WONTFIX_LABELS: [&str; 2] = ["wontfix", "won't fix"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Provider-side identifier used to address an existing ticket.
pub struct TicketId(pub u64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Title and body sent on create/update/reopen.
pub struct TicketAttrs {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Closed,
    Wontfix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Provider's view of a ticket after a lookup or write.
pub struct Ticket {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
}

impl Ticket {
    pub fn has_label(&self, wanted: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn has_wontfix_label(&self) -> bool {
        WONTFIX_LABELS.iter().any(|label| self.has_label(label))
    }

    pub fn is_state(&self, state: &str) -> bool {
        self.state.eq_ignore_ascii_case(state)
    }

    /// Best URL for humans, falling back to the API URL.
    pub fn public_url(&self) -> Option<&str> {
        self.html_url.as_deref().or(self.url.as_deref())
    }
}
