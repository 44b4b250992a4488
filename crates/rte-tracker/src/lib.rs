//! Issue-tracker provider adapters for runtimeerror.
//!
//! The lifecycle controller only talks to [`TicketProvider`]. Each
//! [`ProviderKind`] has exactly one implementation: [`NoneProvider`] keeps
//! tickets in process, [`GithubProvider`] speaks the GitHub REST API.

mod github_provider;
mod none_provider;
mod provider;
mod retry_policy;
mod ticket;

pub use github_provider::{GithubProvider, GithubProviderConfig};
pub use none_provider::NoneProvider;
pub use provider::{ProviderKind, ProviderKindParseError, TicketProvider, TrackerError};
pub use retry_policy::RetryPolicy;
pub use ticket::{Ticket, TicketAttrs, TicketId, TicketStatus, WONTFIX_LABELS};
