use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rte_core::HistoryCodec;
use rte_notify::{Notifier, NotifyError, OutboundNotification};
use rte_routing::SecretOverrides;
use rte_runtime::{
    AccountKey, AccountRegistry, Clock, DispatchOutcome, DuplicateCounter, HandleOutcome,
    InboundDispatcher, InboundReport, NotificationStatus, ProviderFactory,
    TicketLifecycleController,
};
use rte_tracker::{
    NoneProvider, ProviderKind, Ticket, TicketAttrs, TicketId, TicketProvider, TrackerError,
};
use tokio::sync::Mutex as AsyncMutex;

/// In-memory tracker that also knows the reporter's address.
struct ReportingProvider {
    inner: NoneProvider,
    reporter: String,
}

#[async_trait]
impl TicketProvider for ReportingProvider {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    async fn find_ticket_by_title(
        &self,
        generic_title: &str,
    ) -> Result<Option<Ticket>, TrackerError> {
        self.inner.find_ticket_by_title(generic_title).await
    }

    async fn create_ticket(&self, attrs: &TicketAttrs) -> Result<Ticket, TrackerError> {
        self.inner.create_ticket(attrs).await
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
    ) -> Result<Ticket, TrackerError> {
        self.inner.update_ticket(id, attrs).await
    }

    async fn reopen_ticket(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
    ) -> Result<Ticket, TrackerError> {
        self.inner.reopen_ticket(id, attrs).await
    }

    async fn comment_on_ticket(&self, id: TicketId, body: &str) -> Result<(), TrackerError> {
        self.inner.comment_on_ticket(id, body).await
    }

    async fn resolve_reporter_email(&self) -> Result<Option<String>, TrackerError> {
        Ok(Some(self.reporter.clone()))
    }
}

struct SharedFactory {
    provider: Arc<ReportingProvider>,
}

impl ProviderFactory for SharedFactory {
    fn build(&self, _key: &AccountKey) -> Result<Arc<dyn TicketProvider>, TrackerError> {
        Ok(self.provider.clone())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: AsyncMutex<Vec<OutboundNotification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, notification: &OutboundNotification) -> Result<(), NotifyError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

struct SteppingClock {
    today: Mutex<NaiveDate>,
}

impl SteppingClock {
    fn advance_days(&self, days: u64) {
        let mut today = self.today.lock().expect("clock mutex poisoned");
        *today = today
            .checked_add_days(chrono::Days::new(days))
            .expect("valid date");
    }
}

impl Clock for SteppingClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().expect("clock mutex poisoned")
    }

    fn unix_ms(&self) -> u64 {
        1_700_000_000_000
    }
}

struct Harness {
    provider: Arc<ReportingProvider>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<SteppingClock>,
    dispatcher: InboundDispatcher,
}

fn harness() -> Harness {
    let provider = Arc::new(ReportingProvider {
        inner: NoneProvider::new("owner/repo"),
        reporter: "dev@example.test".to_string(),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(SteppingClock {
        today: Mutex::new(NaiveDate::from_ymd_opt(2024, 1, 4).expect("valid date")),
    });
    let controller = TicketLifecycleController::new(
        Arc::new(DuplicateCounter::new()),
        HistoryCodec::default(),
        notifier.clone(),
        clock.clone(),
        "errors@example.test",
    );
    let registry = AccountRegistry::new(Arc::new(SharedFactory {
        provider: provider.clone(),
    }));
    let dispatcher = InboundDispatcher::new(
        Arc::new(registry),
        Arc::new(controller),
        SecretOverrides::from_pairs([("box_SECRET", "resolved-token")]),
    );
    Harness {
        provider,
        notifier,
        clock,
        dispatcher,
    }
}

fn report(subject: &str, body: &str) -> InboundReport {
    InboundReport {
        from: "\"owner/repo\" <box+web@none.example.test>".to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        in_reply_to: None,
    }
}

fn handled(outcome: DispatchOutcome) -> HandleOutcome {
    match outcome {
        DispatchOutcome::Handled { result, .. } => result,
        other => panic!("unexpected dispatch outcome: {other:?}"),
    }
}

#[tokio::test]
async fn integration_report_lifecycle_create_reply_reopen_and_wontfix() {
    let harness = harness();

    let created = handled(
        harness
            .dispatcher
            .dispatch(&report("Undefined method 'id' for nil at line 42", "trace A"))
            .await
            .expect("first report"),
    );
    assert_eq!(
        created,
        HandleOutcome::Created {
            ticket: TicketId(1),
            occurrences: 1,
            notification: NotificationStatus::Sent {
                to: "dev@example.test".to_string()
            },
        }
    );
    let sent = harness.notifier.sent.lock().await.clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].message_id,
        "<owner/repo/issues/1@none.box.1700000000000>"
    );

    let reply = InboundReport {
        from: "dev@example.test".to_string(),
        subject: "Re: Undefined method".to_string(),
        body: "looking into it".to_string(),
        in_reply_to: Some(sent[0].message_id.clone()),
    };
    assert!(matches!(
        harness.dispatcher.dispatch(&reply).await.expect("reply"),
        DispatchOutcome::Replied(_)
    ));
    assert_eq!(
        harness.provider.inner.comments(),
        vec![(TicketId(1), "looking into it".to_string())]
    );

    harness
        .provider
        .inner
        .close_ticket(TicketId(1), false)
        .expect("close");
    harness.clock.advance_days(1);
    let reopened = handled(
        harness
            .dispatcher
            .dispatch(&report(
                "Re: Undefined method 'id' for nil at line 97",
                "<html><head></head><body>trace B</body></html>",
            ))
            .await
            .expect("second report"),
    );
    assert!(matches!(
        reopened,
        HandleOutcome::Reopened {
            ticket: TicketId(1),
            occurrences: 1,
            ..
        }
    ));
    let ticket = harness.provider.inner.tickets().remove(0);
    assert_eq!(ticket.state, "open");
    assert!(ticket.body.starts_with("<body>trace B</body><br/>\n<img "));
    assert!(ticket
        .body
        .contains(r#"alt='{"runtimeerror":["Jan 04",1,"Jan 05",1]}'"#));

    harness
        .provider
        .inner
        .close_ticket(TicketId(1), true)
        .expect("wontfix");
    let skipped = handled(
        harness
            .dispatcher
            .dispatch(&report("Undefined method 'id' for nil at line 1", "trace C"))
            .await
            .expect("third report"),
    );
    assert_eq!(
        skipped,
        HandleOutcome::SkippedWontfix {
            ticket: TicketId(1),
            occurrences: 1
        }
    );
    assert_eq!(harness.notifier.sent.lock().await.len(), 2);
    assert_eq!(harness.dispatcher.registry().len(), 1);
}

#[tokio::test]
async fn integration_json_report_is_rendered_as_tables() {
    let harness = harness();
    let body = serde_json::json!({"error": "boom <x>", "context": {"user": 7}}).to_string();

    handled(
        harness
            .dispatcher
            .dispatch(&report("json report", &body))
            .await
            .expect("json report"),
    );

    let ticket = harness.provider.inner.tickets().remove(0);
    assert!(ticket.body.starts_with(
        "<table><tr><th align=\"left\">error</th><td align=\"left\">boom &lt;x&gt;</td></tr></table><h4>context</h4>"
    ));
}
