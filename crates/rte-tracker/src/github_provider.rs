use std::time::Duration;

use async_trait::async_trait;
use rte_core::normalize_title;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::{ProviderKind, TicketProvider, TrackerError};
use crate::retry_policy::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after, truncate_for_error,
    RetryPolicy,
};
use crate::ticket::{Ticket, TicketAttrs, TicketId};

const GITHUB_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubProviderConfig {
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
    /// Upper bound on issue-list pages scanned per title lookup.
    pub search_max_pages: u32,
}

impl Default for GithubProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            request_timeout_ms: 15_000,
            retry: RetryPolicy::default(),
            search_max_pages: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    fn parse(raw: &str) -> Result<Self, TrackerError> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| TrackerError::InvalidRepo(raw.to_string()))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(TrackerError::InvalidRepo(raw.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GithubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<GithubLabel>,
    url: Option<String>,
    html_url: Option<String>,
    user: Option<GithubUser>,
    pull_request: Option<Value>,
}

impl From<GithubIssue> for Ticket {
    fn from(issue: GithubIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            state: issue.state,
            labels: issue.labels.into_iter().map(|label| label.name).collect(),
            url: issue.url,
            html_url: issue.html_url,
            reporter: issue.user.map(|user| user.login),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    verified: bool,
}

/// GitHub issues adapter bound to one repository and token.
#[derive(Debug, Clone)]
pub struct GithubProvider {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
    retry: RetryPolicy,
    search_max_pages: u32,
}

impl GithubProvider {
    pub fn new(
        config: &GithubProviderConfig,
        repo: &str,
        token: &str,
    ) -> Result<Self, TrackerError> {
        let repo = RepoRef::parse(repo)?;
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("runtimeerror"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header).map_err(|_| {
                TrackerError::InvalidCredential(
                    "github token is not a valid header value".to_string(),
                )
            })?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repo,
            retry: config.retry,
            search_max_pages: config.search_max_pages.max(1),
        })
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_base, self.repo.owner, self.repo.name
        )
    }

    async fn request_json<T, F>(
        &self,
        operation: &str,
        mut request_builder: F,
    ) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header(
                    "x-runtimeerror-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let bytes = response.bytes().await?;
                        return serde_json::from_slice::<T>(&bytes).map_err(|error| {
                            TrackerError::InvalidResponse(format!(
                                "failed to decode github {operation}: {error}"
                            ))
                        });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if self.retry.allows_another_attempt(attempt)
                        && is_retryable_status(status.as_u16())
                    {
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying github request"
                        );
                        tokio::time::sleep(self.retry.delay_for(attempt, retry_after)).await;
                        continue;
                    }

                    return Err(TrackerError::HttpStatus {
                        operation: format!("github api {operation}"),
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 800),
                    });
                }
                Err(error) => {
                    if self.retry.allows_another_attempt(attempt)
                        && is_retryable_transport_error(&error)
                    {
                        tracing::debug!(operation, attempt, %error, "retrying github request");
                        tokio::time::sleep(self.retry.delay_for(attempt, None)).await;
                        continue;
                    }
                    return Err(TrackerError::Http(error));
                }
            }
        }
    }

    async fn patch_issue(
        &self,
        operation: &str,
        id: TicketId,
        payload: Value,
    ) -> Result<Ticket, TrackerError> {
        let url = format!("{}/{}", self.issues_url(), id);
        let issue: GithubIssue = self
            .request_json(operation, || self.http.patch(&url).json(&payload))
            .await?;
        Ok(issue.into())
    }
}

#[async_trait]
impl TicketProvider for GithubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn find_ticket_by_title(
        &self,
        generic_title: &str,
    ) -> Result<Option<Ticket>, TrackerError> {
        let url = self.issues_url();
        for page in 1..=self.search_max_pages {
            let page_value = page.to_string();
            let per_page = GITHUB_PAGE_SIZE.to_string();
            let chunk: Vec<GithubIssue> = self
                .request_json("list issues", || {
                    self.http.get(&url).query(&[
                        ("state", "all"),
                        ("sort", "updated"),
                        ("direction", "desc"),
                        ("per_page", per_page.as_str()),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            let matched = chunk.into_iter().find(|issue| {
                issue.pull_request.is_none()
                    && normalize_title(Some(&issue.title)) == generic_title
            });
            if let Some(issue) = matched {
                return Ok(Some(issue.into()));
            }
            if chunk_len < GITHUB_PAGE_SIZE {
                break;
            }
        }
        Ok(None)
    }

    #[tracing::instrument(level = "debug", skip(self, attrs), fields(title = %attrs.title))]
    async fn create_ticket(&self, attrs: &TicketAttrs) -> Result<Ticket, TrackerError> {
        let url = self.issues_url();
        let payload = json!({ "title": attrs.title, "body": attrs.body });
        let issue: GithubIssue = self
            .request_json("create issue", || self.http.post(&url).json(&payload))
            .await?;
        Ok(issue.into())
    }

    #[tracing::instrument(level = "debug", skip(self, attrs), fields(title = %attrs.title))]
    async fn update_ticket(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
    ) -> Result<Ticket, TrackerError> {
        let payload = json!({ "title": attrs.title, "body": attrs.body });
        self.patch_issue("update issue", id, payload).await
    }

    #[tracing::instrument(level = "debug", skip(self, attrs), fields(title = %attrs.title))]
    async fn reopen_ticket(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
    ) -> Result<Ticket, TrackerError> {
        let payload = json!({ "title": attrs.title, "body": attrs.body, "state": "open" });
        self.patch_issue("reopen issue", id, payload).await
    }

    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn comment_on_ticket(&self, id: TicketId, body: &str) -> Result<(), TrackerError> {
        let url = format!("{}/{}/comments", self.issues_url(), id);
        let payload = json!({ "body": body });
        let _: Value = self
            .request_json("create issue comment", || self.http.post(&url).json(&payload))
            .await?;
        Ok(())
    }

    async fn resolve_reporter_email(&self) -> Result<Option<String>, TrackerError> {
        let url = format!("{}/user/emails", self.api_base);
        let emails: Vec<GithubEmail> = self
            .request_json("list user emails", || self.http.get(&url))
            .await?;
        let primary = emails
            .iter()
            .find(|email| email.primary && email.verified)
            .or_else(|| emails.iter().find(|email| email.verified));
        Ok(primary.map(|email| email.email.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{GithubProvider, GithubProviderConfig, RepoRef};
    use crate::provider::TrackerError;

    #[test]
    fn unit_repo_ref_parse_accepts_owner_repo_shape() {
        let repo = RepoRef::parse(" owner/name ").expect("parse repo");
        assert_eq!(repo.owner, "owner");
        assert_eq!(repo.name, "name");
        for raw in ["missing", "/name", "owner/", "a/b/c"] {
            assert!(matches!(
                RepoRef::parse(raw),
                Err(TrackerError::InvalidRepo(_))
            ));
        }
    }

    #[test]
    fn regression_new_rejects_token_that_cannot_be_a_header() {
        let error =
            GithubProvider::new(&GithubProviderConfig::default(), "owner/repo", "bad\ntoken")
                .expect_err("newline in token");
        assert!(matches!(error, TrackerError::InvalidCredential(_)));
    }
}
