//! Runtime orchestration for runtimeerror: debouncing, account registry,
//! ticket lifecycle and inbound report dispatch.

mod account_registry;
mod clock;
mod config;
mod debouncer;
mod dispatch;
mod lifecycle;
mod reply;
mod sync_helpers;

pub use account_registry::{
    Account, AccountKey, AccountRegistry, ProviderFactory, RegistryError, StandardProviderFactory,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{RuntimeConfig, DEFAULT_NOTIFY_FROM};
pub use debouncer::DuplicateCounter;
pub use dispatch::{
    render_report_body, DispatchError, DispatchOutcome, InboundDispatcher, InboundReport,
};
pub use lifecycle::{HandleOutcome, LifecycleError, NotificationStatus, TicketLifecycleController};
pub use reply::{post_reply_comment, ReplyOutcome};
