//! Secret override snapshot keyed by the public mailbox secret.
//!
//! A sender address only carries a public alias. Deployments map that alias to
//! the real provider credential through `<alias>_SECRET` variables; empty
//! values are ignored so a blank variable never wipes a credential.

use std::collections::BTreeMap;

pub const SECRET_OVERRIDE_SUFFIX: &str = "_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Snapshot of `<secret>_SECRET` values taken at startup.
pub struct SecretOverrides {
    values: BTreeMap<String, String>,
}

fn resolve_non_empty_value(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl SecretOverrides {
    /// Collect overrides from `(name, value)` pairs, keeping only `*_SECRET` names.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values = pairs
            .into_iter()
            .filter_map(|(name, value)| {
                let secret = name.as_ref().strip_suffix(SECRET_OVERRIDE_SUFFIX)?;
                if secret.is_empty() {
                    return None;
                }
                let value = resolve_non_empty_value(Some(value.as_ref()))?;
                Some((secret.to_string(), value))
            })
            .collect();
        Self { values }
    }

    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn override_for(&self, secret: &str) -> Option<&str> {
        self.values.get(secret).map(String::as_str)
    }

    /// Return the override for `secret`, or `secret` itself.
    pub fn resolve(&self, secret: &str) -> String {
        self.override_for(secret).unwrap_or(secret).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::SecretOverrides;

    #[test]
    fn unit_from_pairs_keeps_only_secret_suffixed_names() {
        let overrides = SecretOverrides::from_pairs([
            ("abc.def_SECRET", "XYZ123"),
            ("PATH", "/usr/bin"),
            ("_SECRET", "orphan"),
            ("blank_SECRET", "   "),
        ]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.override_for("abc.def"), Some("XYZ123"));
        assert_eq!(overrides.override_for("blank"), None);
    }

    #[test]
    fn unit_resolve_falls_back_to_public_secret() {
        let overrides = SecretOverrides::from_pairs([("abc.def_SECRET", " XYZ123 ")]);
        assert_eq!(overrides.resolve("abc.def"), "XYZ123");
        assert_eq!(overrides.resolve("other"), "other");
        assert!(SecretOverrides::default().is_empty());
    }
}
