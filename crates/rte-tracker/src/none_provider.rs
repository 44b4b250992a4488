use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rte_core::normalize_title;

use crate::provider::{ProviderKind, TicketProvider, TrackerError};
use crate::ticket::{Ticket, TicketAttrs, TicketId};

#[derive(Debug, Default)]
struct NoneProviderState {
    tickets: Vec<Ticket>,
    comments: Vec<(TicketId, String)>,
}

#[derive(Debug)]
/// Tracker that keeps tickets in process memory and never touches the network.
pub struct NoneProvider {
    repo: String,
    state: Mutex<NoneProviderState>,
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl NoneProvider {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            state: Mutex::new(NoneProviderState::default()),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        lock_or_recover(&self.state).tickets.clone()
    }

    pub fn comments(&self) -> Vec<(TicketId, String)> {
        lock_or_recover(&self.state).comments.clone()
    }

    /// Mark a ticket closed, optionally labelling it wontfix.
    pub fn close_ticket(&self, id: TicketId, wontfix: bool) -> Result<Ticket, TrackerError> {
        let mut state = lock_or_recover(&self.state);
        let ticket = find_mut(&mut state.tickets, id)?;
        ticket.state = "closed".to_string();
        if wontfix && !ticket.has_wontfix_label() {
            ticket.labels.push("wontfix".to_string());
        }
        Ok(ticket.clone())
    }

    fn write(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
        reopen: bool,
    ) -> Result<Ticket, TrackerError> {
        let mut state = lock_or_recover(&self.state);
        let ticket = find_mut(&mut state.tickets, id)?;
        ticket.title = attrs.title.clone();
        ticket.body = attrs.body.clone();
        if reopen {
            ticket.state = "open".to_string();
        }
        Ok(ticket.clone())
    }
}

fn find_mut(tickets: &mut [Ticket], id: TicketId) -> Result<&mut Ticket, TrackerError> {
    tickets
        .iter_mut()
        .find(|ticket| ticket.number == id.0)
        .ok_or(TrackerError::TicketNotFound(id))
}

#[async_trait]
impl TicketProvider for NoneProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::None
    }

    async fn find_ticket_by_title(
        &self,
        generic_title: &str,
    ) -> Result<Option<Ticket>, TrackerError> {
        let state = lock_or_recover(&self.state);
        Ok(state
            .tickets
            .iter()
            .rev()
            .find(|ticket| normalize_title(Some(&ticket.title)) == generic_title)
            .cloned())
    }

    async fn create_ticket(&self, attrs: &TicketAttrs) -> Result<Ticket, TrackerError> {
        let mut state = lock_or_recover(&self.state);
        let number = u64::try_from(state.tickets.len())
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let ticket = Ticket {
            number,
            title: attrs.title.clone(),
            body: attrs.body.clone(),
            state: "open".to_string(),
            labels: Vec::new(),
            url: None,
            html_url: None,
            reporter: None,
        };
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
    ) -> Result<Ticket, TrackerError> {
        self.write(id, attrs, false)
    }

    async fn reopen_ticket(
        &self,
        id: TicketId,
        attrs: &TicketAttrs,
    ) -> Result<Ticket, TrackerError> {
        self.write(id, attrs, true)
    }

    async fn comment_on_ticket(&self, id: TicketId, body: &str) -> Result<(), TrackerError> {
        let mut state = lock_or_recover(&self.state);
        find_mut(&mut state.tickets, id)?;
        state.comments.push((id, body.to_string()));
        Ok(())
    }

    async fn resolve_reporter_email(&self) -> Result<Option<String>, TrackerError> {
        Ok(None)
    }
}
