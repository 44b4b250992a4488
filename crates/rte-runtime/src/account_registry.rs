use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rte_routing::{AccountRoute, TicketRoute};
use rte_tracker::{
    GithubProvider, GithubProviderConfig, NoneProvider, ProviderKind, ProviderKindParseError,
    TicketProvider, TrackerError,
};
use thiserror::Error;

use crate::sync_helpers::lock_or_recover;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Value identity of an account: equal triples are the same account.
pub struct AccountKey {
    pub repo: String,
    pub secret: String,
    pub provider: ProviderKind,
}

impl AccountKey {
    pub fn new(repo: impl Into<String>, secret: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            repo: repo.into(),
            secret: secret.into(),
            provider,
        }
    }
}

/// A tracker account bound to its provider client.
pub struct Account {
    pub key: AccountKey,
    /// Public local-part stamped into outbound message ids.
    pub mailbox: String,
    pub client: Arc<dyn TicketProvider>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("repo", &self.key.repo)
            .field("provider", &self.key.provider)
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}

impl Account {
    pub fn repo(&self) -> &str {
        &self.key.repo
    }

    pub fn provider(&self) -> ProviderKind {
        self.key.provider
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    UnknownProvider(#[from] ProviderKindParseError),
    #[error("failed to build {provider} client for {repo}: {source}")]
    Client {
        repo: String,
        provider: ProviderKind,
        #[source]
        source: TrackerError,
    },
}

/// Builds the provider client an account is bound to.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, key: &AccountKey) -> Result<Arc<dyn TicketProvider>, TrackerError>;
}

#[derive(Debug, Clone, Default)]
/// One client implementation per [`ProviderKind`].
pub struct StandardProviderFactory {
    github: GithubProviderConfig,
}

impl StandardProviderFactory {
    pub fn new(github: GithubProviderConfig) -> Self {
        Self { github }
    }
}

impl ProviderFactory for StandardProviderFactory {
    fn build(&self, key: &AccountKey) -> Result<Arc<dyn TicketProvider>, TrackerError> {
        match key.provider {
            ProviderKind::None => Ok(Arc::new(NoneProvider::new(key.repo.clone()))),
            ProviderKind::Github => Ok(Arc::new(GithubProvider::new(
                &self.github,
                &key.repo,
                &key.secret,
            )?)),
        }
    }
}

/// Process-wide cache of accounts keyed by (repo, secret, provider).
pub struct AccountRegistry {
    factory: Arc<dyn ProviderFactory>,
    accounts: Mutex<HashMap<AccountKey, Arc<Account>>>,
}

impl AccountRegistry {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            factory,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.accounts).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached account for the triple, building it on first use.
    pub fn find_or_create(
        &self,
        repo: &str,
        secret: &str,
        provider: ProviderKind,
    ) -> Result<Arc<Account>, RegistryError> {
        self.find_or_create_with_mailbox(repo, secret, provider, secret)
    }

    pub fn find_or_create_for_route(
        &self,
        route: &AccountRoute,
    ) -> Result<Arc<Account>, RegistryError> {
        let provider = route.provider.parse::<ProviderKind>()?;
        self.find_or_create_with_mailbox(&route.repo, &route.secret, provider, &route.mailbox)
    }

    pub fn find_or_create_for_ticket_route(
        &self,
        route: &TicketRoute,
    ) -> Result<Arc<Account>, RegistryError> {
        let provider = route.provider.parse::<ProviderKind>()?;
        self.find_or_create_with_mailbox(&route.repo, &route.secret, provider, &route.mailbox)
    }

    fn find_or_create_with_mailbox(
        &self,
        repo: &str,
        secret: &str,
        provider: ProviderKind,
        mailbox: &str,
    ) -> Result<Arc<Account>, RegistryError> {
        let key = AccountKey::new(repo, secret, provider);
        let mut accounts = lock_or_recover(&self.accounts);
        if let Some(account) = accounts.get(&key) {
            return Ok(Arc::clone(account));
        }

        let client = self
            .factory
            .build(&key)
            .map_err(|source| RegistryError::Client {
                repo: key.repo.clone(),
                provider,
                source,
            })?;
        tracing::debug!(repo = %key.repo, %provider, "registered account");
        let account = Arc::new(Account {
            key: key.clone(),
            mailbox: mailbox.to_string(),
            client,
        });
        accounts.insert(key, Arc::clone(&account));
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rte_routing::{extract_account_route, SecretOverrides};
    use rte_tracker::ProviderKind;

    use super::{AccountKey, AccountRegistry, RegistryError, StandardProviderFactory};

    fn registry() -> AccountRegistry {
        AccountRegistry::new(Arc::new(StandardProviderFactory::default()))
    }

    #[test]
    fn unit_find_or_create_returns_same_instance_for_equal_triples() {
        let registry = registry();
        let first = registry
            .find_or_create("owner/repo", "s3cret", ProviderKind::None)
            .expect("account");
        let second = registry
            .find_or_create("owner/repo", "s3cret", ProviderKind::None)
            .expect("account");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.key, AccountKey::new("owner/repo", "s3cret", ProviderKind::None));
        assert_eq!(registry.len(), 1);

        let other = registry
            .find_or_create("owner/repo", "other", ProviderKind::None)
            .expect("account");
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn functional_find_or_create_for_route_applies_secret_override_and_keeps_mailbox() {
        let registry = registry();
        let overrides = SecretOverrides::from_pairs([("mailbox_SECRET", "real-token")]);
        let route = extract_account_route(
            Some(r#""owner/repo" <mailbox+prod@github.example.test>"#),
            &overrides,
        )
        .expect("route");
        let account = registry
            .find_or_create_for_route(&route)
            .expect("account");
        assert_eq!(account.key.secret, "real-token");
        assert_eq!(account.mailbox, "mailbox");
        assert_eq!(account.provider(), ProviderKind::Github);
        assert_eq!(account.client.kind(), ProviderKind::Github);
    }

    #[test]
    fn regression_unknown_provider_tag_is_a_registry_error() {
        let registry = registry();
        let route = extract_account_route(
            Some(r#""owner/repo" <mailbox@smtp.example.test>"#),
            &SecretOverrides::default(),
        )
        .expect("route");
        let error = registry
            .find_or_create_for_route(&route)
            .expect_err("smtp is not a provider");
        assert!(matches!(error, RegistryError::UnknownProvider(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn regression_invalid_github_repo_is_a_client_error() {
        let registry = registry();
        let error = registry
            .find_or_create("not-a-repo", "token", ProviderKind::Github)
            .expect_err("repo must be owner/name");
        assert!(matches!(
            error,
            RegistryError::Client {
                provider: ProviderKind::Github,
                ..
            }
        ));
    }
}
