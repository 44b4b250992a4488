use std::sync::OnceLock;

use regex::{Captures, Regex};

pub const HEX_PLACEHOLDER: &str = "{HEX}";
pub const NUMBER_PLACEHOLDER: &str = "{N}";

fn reply_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:(?:re|fwd?):\s*)+").expect("reply prefix pattern is valid")
    })
}

fn hex_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:0[xX][0-9a-fA-F]+|[0-9a-fA-F]+)\b").expect("hex token pattern is valid")
    })
}

fn digit_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[0-9]+").expect("digit run pattern is valid")
    })
}

fn is_hex_looking(token: &str) -> bool {
    if token.starts_with("0x") || token.starts_with("0X") {
        return true;
    }
    let has_letter = token
        .chars()
        .any(|ch| matches!(ch, 'a'..='f' | 'A'..='F'));
    let has_digit = token.chars().any(|ch| ch.is_ascii_digit());
    has_letter && has_digit
}

/// Canonicalize an error title into the generic key used to group occurrences.
///
/// Reply/forward prefixes are stripped, hexadecimal-looking tokens collapse to
/// `{HEX}` and remaining decimal runs collapse to `{N}`. Hex detection runs
/// first so `0x1234567` yields a single `{HEX}`. The result is idempotent.
pub fn normalize_title(title: Option<&str>) -> String {
    let Some(title) = title.filter(|value| !value.is_empty()) else {
        return String::new();
    };
    let stripped = reply_prefix_pattern().replace(title, "");
    let hexless = hex_token_pattern().replace_all(&stripped, |captures: &Captures<'_>| {
        let token = &captures[0];
        if is_hex_looking(token) {
            HEX_PLACEHOLDER.to_string()
        } else {
            token.to_string()
        }
    });
    digit_run_pattern()
        .replace_all(&hexless, NUMBER_PLACEHOLDER)
        .into_owned()
}
