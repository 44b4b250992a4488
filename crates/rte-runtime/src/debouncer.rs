use std::collections::HashMap;
use std::sync::Mutex;

use crate::account_registry::AccountKey;
use crate::sync_helpers::lock_or_recover;

type CounterKey = (AccountKey, String);

#[derive(Debug, Default)]
/// Pending occurrence counts per (account, generic title).
///
/// The first note for a key opens a pending window; later notes only
/// increment it until the window is drained.
pub struct DuplicateCounter {
    pending: Mutex<HashMap<CounterKey, u64>>,
}

impl DuplicateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence; `true` means a pending window already exists.
    pub fn note_occurrence(&self, account: &AccountKey, generic_title: &str) -> bool {
        let mut pending = lock_or_recover(&self.pending);
        let count = pending
            .entry((account.clone(), generic_title.to_string()))
            .or_insert(0);
        *count = count.saturating_add(1);
        *count > 1
    }

    /// Return the pending count and close the window.
    pub fn consume_and_reset(&self, account: &AccountKey, generic_title: &str) -> u64 {
        lock_or_recover(&self.pending)
            .remove(&(account.clone(), generic_title.to_string()))
            .unwrap_or(0)
    }

    pub fn pending(&self, account: &AccountKey, generic_title: &str) -> Option<u64> {
        lock_or_recover(&self.pending)
            .get(&(account.clone(), generic_title.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
