use chrono::{Datelike, NaiveDate};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Render the `Jan 05` style label used for one day of occurrence history.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}

/// Parse a day label into `(month, day)`; `None` when the label is not date-shaped.
pub fn parse_day_label(label: &str) -> Option<(u32, u32)> {
    let (month_raw, day_raw) = label.split_once(' ')?;
    let month = MONTH_ABBREVIATIONS
        .iter()
        .position(|candidate| *candidate == month_raw)?;
    if day_raw.len() != 2 || !day_raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let day = day_raw.parse::<u32>().ok()?;
    let month = u32::try_from(month).ok()?.saturating_add(1);
    // 2000 is a leap year, so `Feb 29` stays valid here.
    NaiveDate::from_ymd_opt(2000, month, day)?;
    Some((month, day))
}

/// Days elapsed between the most recent calendar date carrying `label` and `today`.
pub fn days_since_label(label: &str, today: NaiveDate) -> Option<i64> {
    let (month, day) = parse_day_label(label)?;
    let mut year = today.year();
    for _ in 0..8 {
        if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) {
            if candidate <= today {
                return Some(today.signed_duration_since(candidate).num_days());
            }
        }
        year -= 1;
    }
    None
}
