use std::borrow::Cow;
use std::sync::Arc;

use rte_core::render_json_tables;
use rte_routing::{extract_account_route, first_ticket_route, SecretOverrides};
use rte_tracker::{TicketId, TrackerError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::account_registry::{AccountRegistry, RegistryError};
use crate::lifecycle::{HandleOutcome, LifecycleError, TicketLifecycleController};
use crate::reply::{post_reply_comment, ReplyOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// An error report or a reply to one, as received from the inbound transport.
pub struct InboundReport {
    pub from: String,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dispatch", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Handled {
        repo: String,
        result: HandleOutcome,
    },
    Replied(ReplyOutcome),
    /// Not addressed to any account; the report is discarded.
    Dropped { reason: String },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("reply comment on ticket #{ticket} failed: {source}")]
    Reply {
        ticket: TicketId,
        #[source]
        source: TrackerError,
    },
}

/// Render a JSON object report as HTML tables; other bodies pass through.
pub fn render_report_body(body: &str) -> Cow<'_, str> {
    let trimmed = body.trim();
    if !trimmed.starts_with('{') {
        return Cow::Borrowed(body);
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Cow::Owned(render_json_tables(&map)),
        _ => Cow::Borrowed(body),
    }
}

/// Routes inbound reports to reply comments or the lifecycle controller.
pub struct InboundDispatcher {
    registry: Arc<AccountRegistry>,
    controller: Arc<TicketLifecycleController>,
    overrides: SecretOverrides,
}

impl InboundDispatcher {
    pub fn new(
        registry: Arc<AccountRegistry>,
        controller: Arc<TicketLifecycleController>,
        overrides: SecretOverrides,
    ) -> Self {
        Self {
            registry,
            controller,
            overrides,
        }
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        report: &InboundReport,
    ) -> Result<DispatchOutcome, DispatchError> {
        if let Some(route) = first_ticket_route(report.in_reply_to.as_deref(), &self.overrides) {
            let account = self.registry.find_or_create_for_ticket_route(&route)?;
            let ticket = TicketId(route.number);
            let outcome = post_reply_comment(&account, ticket, &report.body)
                .await
                .map_err(|source| DispatchError::Reply { ticket, source })?;
            return Ok(DispatchOutcome::Replied(outcome));
        }

        let Some(route) = extract_account_route(Some(&report.from), &self.overrides) else {
            tracing::debug!(from = %report.from, "report sender is not an account address");
            return Ok(DispatchOutcome::Dropped {
                reason: format!("unroutable sender '{}'", report.from),
            });
        };
        let account = self.registry.find_or_create_for_route(&route)?;
        let body = render_report_body(&report.body);
        let result = self
            .controller
            .handle(&account, &report.subject, &body)
            .await?;
        Ok(DispatchOutcome::Handled {
            repo: route.repo,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rte_core::HistoryCodec;
    use rte_notify::LogOnlyNotifier;
    use rte_routing::SecretOverrides;
    use rte_tracker::TicketId;

    use super::{
        render_report_body, DispatchError, DispatchOutcome, InboundDispatcher, InboundReport,
    };
    use crate::account_registry::{AccountRegistry, RegistryError, StandardProviderFactory};
    use crate::clock::FixedClock;
    use crate::debouncer::DuplicateCounter;
    use crate::lifecycle::{HandleOutcome, TicketLifecycleController};
    use crate::reply::ReplyOutcome;

    fn dispatcher() -> InboundDispatcher {
        let controller = TicketLifecycleController::new(
            Arc::new(DuplicateCounter::new()),
            HistoryCodec::default(),
            Arc::new(LogOnlyNotifier),
            Arc::new(FixedClock {
                today: NaiveDate::from_ymd_opt(2024, 3, 9).expect("date"),
                unix_ms: 1,
            }),
            "errors@example.test",
        );
        InboundDispatcher::new(
            Arc::new(AccountRegistry::new(Arc::new(
                StandardProviderFactory::default(),
            ))),
            Arc::new(controller),
            SecretOverrides::default(),
        )
    }

    fn report(from: &str, subject: &str, body: &str) -> InboundReport {
        InboundReport {
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            in_reply_to: None,
        }
    }

    #[test]
    fn unit_render_report_body_turns_json_objects_into_tables() {
        assert_eq!(
            render_report_body(r#"{"a":1}"#),
            "<table><tr><th align=\"left\">a</th><td align=\"left\">1</td></tr></table>"
        );
        assert_eq!(render_report_body("[1,2]"), "[1,2]");
        assert_eq!(render_report_body("{not json"), "{not json");
        assert_eq!(render_report_body("plain"), "plain");
    }

    #[tokio::test]
    async fn functional_dispatch_creates_then_routes_reply_to_ticket() {
        let dispatcher = dispatcher();
        let outcome = dispatcher
            .dispatch(&report(
                r#""owner/repo" <box@none.example.test>"#,
                "NoMethodError 12",
                "trace",
            ))
            .await
            .expect("dispatch");
        assert!(matches!(
            outcome,
            DispatchOutcome::Handled {
                result: HandleOutcome::Created {
                    ticket: TicketId(1),
                    ..
                },
                ..
            }
        ));

        let mut reply = report("dev@example.test", "Re: NoMethodError 12", "on it");
        reply.in_reply_to = Some("<owner/repo/issues/1@none.box.1>".to_string());
        let replied = dispatcher.dispatch(&reply).await.expect("reply");
        assert_eq!(
            replied,
            DispatchOutcome::Replied(ReplyOutcome {
                repo: "owner/repo".to_string(),
                ticket: TicketId(1),
            })
        );
        assert_eq!(dispatcher.registry().len(), 1);
    }

    #[tokio::test]
    async fn regression_unroutable_sender_is_dropped_not_failed() {
        let outcome = dispatcher()
            .dispatch(&report("someone@example.test", "boom", "body"))
            .await
            .expect("dispatch");
        assert!(matches!(outcome, DispatchOutcome::Dropped { .. }));
    }

    #[tokio::test]
    async fn regression_unknown_provider_surfaces_registry_error() {
        let error = dispatcher()
            .dispatch(&report(
                r#""owner/repo" <box@smtp.example.test>"#,
                "boom",
                "body",
            ))
            .await
            .expect_err("smtp is not a provider");
        assert!(matches!(
            error,
            DispatchError::Registry(RegistryError::UnknownProvider(_))
        ));
    }

    #[tokio::test]
    async fn regression_reply_to_missing_ticket_is_a_reply_error() {
        let mut reply = report("dev@example.test", "Re: boom", "hello");
        reply.in_reply_to = Some("<a@b> <owner/repo/issues/5@none.box.1>".to_string());
        let error = dispatcher()
            .dispatch(&reply)
            .await
            .expect_err("ticket 5 does not exist");
        assert!(matches!(
            error,
            DispatchError::Reply {
                ticket: TicketId(5),
                ..
            }
        ));
    }
}
