use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::secret_overrides::SecretOverrides;

fn sender_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*"([^"]+)"\s*<([^<>@\s]+)@([^<>@\s.]+)\.([^<>@\s]+)>\s*$"#)
            .expect("sender pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Account coordinates parsed from an error report's sender address.
pub struct AccountRoute {
    pub repo: String,
    /// Resolved credential; equals `mailbox` unless an override applies.
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub provider: String,
    /// Public local-part secret as written in the address.
    #[serde(skip)]
    pub mailbox: String,
}

/// Parse `"<repo>" <secret[+label...]@provider.host>` into an [`AccountRoute`].
///
/// Returns `None` for anything that is not exactly that shape.
pub fn extract_account_route(
    from_address: Option<&str>,
    overrides: &SecretOverrides,
) -> Option<AccountRoute> {
    let captures = sender_pattern().captures(from_address?)?;
    let repo = captures.get(1)?.as_str().trim();
    let local_part = captures.get(2)?.as_str();
    let provider = captures.get(3)?.as_str();
    if repo.is_empty() {
        return None;
    }

    let mut parts = local_part.split('+');
    let mailbox = parts.next().filter(|value| !value.is_empty())?;
    let label_parts = parts.filter(|part| !part.is_empty()).collect::<Vec<_>>();
    let label = if label_parts.is_empty() {
        None
    } else {
        Some(label_parts.join(" "))
    };

    Some(AccountRoute {
        repo: repo.to_string(),
        secret: overrides.resolve(mailbox),
        label,
        provider: provider.to_string(),
        mailbox: mailbox.to_string(),
    })
}
