//! Occurrence-correlation primitives shared by runtimeerror crates.
//!
//! Provides generic-title normalization, the occurrence history codec that
//! lives at the tail of a ticket body, the sparkline chart URL builder, and
//! the HTML table renderer used for JSON error reports.

pub mod chart_url;
pub mod day_label;
pub mod generic_title;
pub mod json_tables;
pub mod occurrence_history;

pub use chart_url::{ChartUrlBuilder, DEFAULT_SPARKLINE_URL_TEMPLATE};
pub use day_label::{day_label, days_since_label, parse_day_label};
pub use generic_title::normalize_title;
pub use json_tables::render_json_tables;
pub use occurrence_history::{
    strip_document_wrapper, DecodedBody, HistoryCodec, OccurrenceEntry, OccurrenceHistory,
    DEFAULT_HISTORY_NAMESPACE,
};
