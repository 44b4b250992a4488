use std::time::Duration;

use async_trait::async_trait;

use crate::notifier::{Notifier, NotifyError, OutboundNotification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRelayConfig {
    pub url: String,
    pub bearer_token: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// Hands notifications to an HTTP mail relay as JSON.
pub struct HttpRelayNotifier {
    http: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpRelayNotifier {
    pub fn new(config: &HttpRelayConfig) -> Result<Self, NotifyError> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "relay url must not be empty".to_string(),
            ));
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("runtimeerror"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            bearer_token: config
                .bearer_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }
}

#[async_trait]
impl Notifier for HttpRelayNotifier {
    #[tracing::instrument(level = "debug", skip(self, notification), fields(to = %notification.to))]
    async fn send_message(&self, notification: &OutboundNotification) -> Result<(), NotifyError> {
        let mut request = self.http.post(&self.url).json(notification);
        if let Some(token) = self.bearer_token.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(400).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpRelayConfig, HttpRelayNotifier};
    use crate::notifier::NotifyError;

    #[test]
    fn regression_new_rejects_blank_relay_url() {
        let error = HttpRelayNotifier::new(&HttpRelayConfig {
            url: "  ".to_string(),
            bearer_token: None,
            request_timeout_ms: 1_000,
        })
        .expect_err("blank url");
        assert!(matches!(error, NotifyError::InvalidConfig(_)));
    }
}
