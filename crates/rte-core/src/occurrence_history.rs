//! Occurrence history embedded at the tail of a rendered ticket body.
//!
//! A body carrying history ends with `<br/>\n` and an `<img/>` whose `alt` and
//! `title` attributes hold `{"<namespace>":[label, count, label, count, ...]}`.
//! The image source is the sparkline URL for the day-by-day counts. Bodies written by
//! older releases carry the bare JSON object after the line break instead.

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::chart_url::ChartUrlBuilder;
use crate::day_label::{day_label, days_since_label, parse_day_label};

pub const DEFAULT_HISTORY_NAMESPACE: &str = "runtimeerror";
pub const HISTORY_LINE_BREAK: &str = "<br/>\n";

fn document_wrapper_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?is)^\s*(?:<!doctype[^>]*>\s*)?<html\b[^>]*>.*?(<body\b[^>]*>.*</body\s*>).*?</html\s*>\s*$",
        )
        .expect("document wrapper pattern is valid")
    })
}

fn history_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^(.*)<br\s*/?>\r?\n(<img\b[^>]*>|\{[^<>]*\})\s*$")
            .expect("history suffix pattern is valid")
    })
}

fn metadata_attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b(alt|title)\s*=\s*(?:'([^']*)'|"([^"]*)")"#)
            .expect("metadata attribute pattern is valid")
    })
}

/// Reduce a full `<html>` document to its `<body>` element.
///
/// Bodies without a document shell are returned unchanged.
pub fn strip_document_wrapper(body: &str) -> Cow<'_, str> {
    match document_wrapper_pattern()
        .captures(body)
        .and_then(|captures| captures.get(1))
    {
        Some(inner) => Cow::Owned(inner.as_str().to_string()),
        None => Cow::Borrowed(body),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccurrenceEntry {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
/// Day-labelled occurrence counts, most recent last.
pub struct OccurrenceHistory {
    entries: Vec<OccurrenceEntry>,
}

impl OccurrenceHistory {
    pub fn new(entries: Vec<OccurrenceEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[OccurrenceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.entries.iter().map(|entry| entry.count).collect()
    }

    /// Fold `occurrences` into the entry for `label`.
    ///
    /// Only the last entry is considered; an older entry with the same label
    /// stays where it is and a new one is appended.
    pub fn record(&mut self, label: &str, occurrences: u64) {
        match self.entries.last_mut() {
            Some(last) if last.label == label => {
                last.count = last.count.saturating_add(occurrences);
            }
            _ => self.entries.push(OccurrenceEntry {
                label: label.to_string(),
                count: occurrences,
            }),
        }
    }

    /// Drop entries older than `days` calendar days, counting `today` as day one.
    pub fn retain_recent(&mut self, today: NaiveDate, days: u32) {
        if days == 0 {
            return;
        }
        let window = i64::from(days);
        self.entries.retain(|entry| {
            days_since_label(&entry.label, today).is_some_and(|elapsed| elapsed < window)
        });
    }

    pub fn to_flat_values(&self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.entries.len().saturating_mul(2));
        for entry in &self.entries {
            values.push(Value::String(entry.label.clone()));
            values.push(Value::from(entry.count));
        }
        values
    }

    /// Strict inverse of [`Self::to_flat_values`].
    pub fn from_flat_values(values: &[Value]) -> Option<Self> {
        if values.len() % 2 != 0 {
            return None;
        }
        let mut entries = Vec::with_capacity(values.len() / 2);
        for pair in values.chunks_exact(2) {
            let label = pair[0].as_str()?;
            parse_day_label(label)?;
            let count = pair[1].as_u64()?;
            entries.push(OccurrenceEntry {
                label: label.to_string(),
                count,
            });
        }
        Some(Self { entries })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedBody {
    pub visible_body: String,
    pub history: OccurrenceHistory,
}

#[derive(Debug, Clone)]
/// Encodes and decodes occurrence history for one namespace.
pub struct HistoryCodec {
    namespace: String,
    chart: ChartUrlBuilder,
    retention_days: u32,
}

impl Default for HistoryCodec {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_NAMESPACE, ChartUrlBuilder::default())
    }
}

impl HistoryCodec {
    pub fn new(namespace: impl Into<String>, chart: ChartUrlBuilder) -> Self {
        Self {
            namespace: namespace.into(),
            chart,
            retention_days: 0,
        }
    }

    pub fn with_retention_days(mut self, retention_days: u32) -> Self {
        self.retention_days = retention_days;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn chart(&self) -> &ChartUrlBuilder {
        &self.chart
    }

    pub fn metadata_json(&self, history: &OccurrenceHistory) -> String {
        let mut map = Map::new();
        map.insert(
            self.namespace.clone(),
            Value::Array(history.to_flat_values()),
        );
        Value::Object(map).to_string()
    }

    /// Split a ticket body into its visible part and embedded history.
    ///
    /// Missing or malformed metadata yields an empty history and leaves the
    /// (unwrapped) body untouched.
    pub fn decode(&self, body: &str) -> DecodedBody {
        let unwrapped = strip_document_wrapper(body);
        let parsed = history_suffix_pattern()
            .captures(&unwrapped)
            .and_then(|captures| {
                let visible = captures.get(1)?.as_str();
                let suffix = captures.get(2)?.as_str();
                let history = self.parse_suffix(suffix)?;
                Some((visible.to_string(), history))
            });
        match parsed {
            Some((visible_body, history)) => DecodedBody {
                visible_body,
                history,
            },
            None => DecodedBody {
                visible_body: unwrapped.into_owned(),
                history: OccurrenceHistory::default(),
            },
        }
    }

    /// Day-by-day counts from the oldest entry through `today`, zero on days without one.
    ///
    /// Entries whose label cannot be placed on the calendar are left out.
    pub fn chart_series(&self, history: &OccurrenceHistory, today: NaiveDate) -> Vec<u64> {
        let placed = history
            .entries()
            .iter()
            .filter_map(|entry| {
                let elapsed = days_since_label(&entry.label, today)?;
                Some((usize::try_from(elapsed).ok()?, entry.count))
            })
            .collect::<Vec<_>>();
        let Some(span) = placed.iter().map(|(elapsed, _)| *elapsed).max() else {
            return Vec::new();
        };
        let mut series = vec![0_u64; span + 1];
        for (elapsed, count) in placed {
            let slot = &mut series[span - elapsed];
            *slot = slot.saturating_add(count);
        }
        series
    }

    pub fn encode(
        &self,
        visible_body: &str,
        history: &OccurrenceHistory,
        today: NaiveDate,
    ) -> String {
        let json = self.metadata_json(history);
        let src = self.chart.build_url(&self.chart_series(history, today));
        format!("{visible_body}{HISTORY_LINE_BREAK}<img src='{src}' alt='{json}' title='{json}'/>")
    }

    /// Append `occurrences` dated `today` to `prior` and re-encode under `visible_body`.
    pub fn merge_occurrences(
        &self,
        visible_body: &str,
        prior: &OccurrenceHistory,
        occurrences: u64,
        today: NaiveDate,
    ) -> String {
        let mut history = prior.clone();
        history.record(&day_label(today), occurrences);
        history.retain_recent(today, self.retention_days);
        let visible = strip_document_wrapper(visible_body);
        self.encode(&visible, &history, today)
    }

    /// Decode `body`, fold in `occurrences` for `today`, and re-encode it.
    pub fn update_body(&self, body: &str, occurrences: u64, today: NaiveDate) -> String {
        let decoded = self.decode(body);
        self.merge_occurrences(&decoded.visible_body, &decoded.history, occurrences, today)
    }

    fn parse_suffix(&self, suffix: &str) -> Option<OccurrenceHistory> {
        if suffix.starts_with('{') {
            return self.parse_metadata_json(suffix);
        }
        let mut candidates = metadata_attribute_pattern()
            .captures_iter(suffix)
            .filter_map(|captures| {
                let name = captures.get(1)?.as_str().to_ascii_lowercase();
                let value = captures.get(2).or_else(|| captures.get(3))?.as_str();
                Some((name, unescape_attribute(value)))
            })
            .collect::<Vec<_>>();
        candidates.sort_by_key(|(name, _)| if name == "title" { 0 } else { 1 });
        candidates
            .iter()
            .find_map(|(_, value)| self.parse_metadata_json(value))
    }

    fn parse_metadata_json(&self, raw: &str) -> Option<OccurrenceHistory> {
        let value = serde_json::from_str::<Value>(raw).ok()?;
        let values = value.get(&self.namespace)?.as_array()?;
        OccurrenceHistory::from_flat_values(values)
    }
}

fn unescape_attribute(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
