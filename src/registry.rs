//! Live notification registry.
//!
//! Maps a report id to the outbound channel of the client that asked for its
//! status updates. One registry instance is created at startup and a clone is
//! handed to both the WebSocket handler and the [`Dispatcher`].
//!
//! # Concurrency
//!
//! The whole map sits behind a single mutex. Every operation holds the lock
//! only for one map access and never across an `.await`, so the registry is
//! safe to share between any number of registering clients and in-flight
//! status sequences.
//!
//! # Semantics
//!
//! - Registration is last-write-wins: a second `register` for the same id
//!   replaces the first sender.
//! - The registry does not own channel lifecycles. An entry whose client has
//!   disconnected stays in the map and simply stops being deliverable.
//!
//! [`Dispatcher`]: crate::dispatcher::Dispatcher

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::model::StatusUpdate;

/// Outbound half of a client's notification channel.
pub type StatusSender = mpsc::UnboundedSender<StatusUpdate>;

/// Shared `report id -> channel` map.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Mutex<HashMap<String, StatusSender>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the channel for `report_id`.
    pub fn register(&self, report_id: impl Into<String>, sender: StatusSender) {
        self.lock().insert(report_id.into(), sender);
    }

    /// Current channel for `report_id`, if any client registered one.
    ///
    /// The returned sender may already be closed.
    pub fn lookup(&self, report_id: &str) -> Option<StatusSender> {
        self.lock().get(report_id).cloned()
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, StatusSender>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusLabel;

    fn update(status: StatusLabel) -> StatusUpdate {
        StatusUpdate { status }
    }

    #[test]
    fn test_lookup_missing() {
        let registry = Registry::new();
        assert!(registry.lookup("unknown").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.register("r1", tx);

        let sender = registry.lookup("r1").unwrap();
        sender.send(update(StatusLabel::Preparing)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), update(StatusLabel::Preparing));
    }

    #[test]
    fn test_register_replaces_previous_channel() {
        let registry = Registry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        registry.register("r1", old_tx);
        registry.register("r1", new_tx);
        assert_eq!(registry.len(), 1);

        registry
            .lookup("r1")
            .unwrap()
            .send(update(StatusLabel::Resolved))
            .unwrap();

        assert_eq!(new_rx.try_recv().unwrap(), update(StatusLabel::Resolved));
        assert!(old_rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_entry_is_kept_but_closed() {
        let registry = Registry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("r1", tx);

        drop(rx);

        let sender = registry.lookup("r1").unwrap();
        assert!(sender.is_closed());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = Registry::new();
        let handle = registry.clone();
        let (tx, _rx) = mpsc::unbounded_channel();

        handle.register("r1", tx);

        assert!(registry.lookup("r1").is_some());
    }
}
