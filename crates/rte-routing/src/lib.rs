//! Inbound address routing for runtimeerror.
//!
//! Parses the sender address of an error report into the account it belongs
//! to, parses notification message ids back into ticket routes, and applies
//! `<secret>_SECRET` overrides so real credentials never travel in addresses.

pub mod account_route;
pub mod secret_overrides;
pub mod ticket_route;

pub use account_route::{extract_account_route, AccountRoute};
pub use secret_overrides::{SecretOverrides, SECRET_OVERRIDE_SUFFIX};
pub use ticket_route::{
    extract_ticket_route, first_ticket_route, render_ticket_message_id, TicketRoute,
};
