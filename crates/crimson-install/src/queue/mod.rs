//! Install queue management.
//!
//! A pure FIFO admission list of `Pending` jobs, unique by `app_name`.
//!
//! # Design
//!
//! - Pure synchronous state (no async, no IO, no tracing)
//! - No internal locking; `InstallManager` serializes access
//! - The active job is never stored here; callers pass its name to
//!   [`InstallQueue::enqueue`] so duplicates against it are rejected too

use std::collections::VecDeque;

use crimson_core::{InstallError, InstallItem, InstallStatus};

/// FIFO of pending install jobs.
#[derive(Debug, Default)]
pub struct InstallQueue {
    pending: VecDeque<InstallItem>,
}

impl InstallQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Check if a title is currently queued.
    pub fn contains(&self, app_name: &str) -> bool {
        self.pending.iter().any(|item| item.app_name() == app_name)
    }

    /// Append `item` to the tail.
    ///
    /// `active` is the name of the job that currently owns the engine, if
    /// any. Returns the 1-based position in the queue. On `DuplicateJob` the
    /// queue is left unchanged.
    pub fn enqueue(&mut self, item: InstallItem, active: Option<&str>) -> Result<usize, InstallError> {
        let name = item.app_name();
        if active == Some(name) || self.contains(name) {
            return Err(InstallError::duplicate(name));
        }
        if item.status != InstallStatus::Pending {
            return Err(InstallError::invalid_transition(
                "enqueue",
                Some(item.status),
            ));
        }

        self.pending.push_back(item);
        Ok(self.pending.len())
    }

    /// Pop the next item from the front of the queue.
    pub fn pop_next(&mut self) -> Option<InstallItem> {
        self.pending.pop_front()
    }

    /// Remove a pending item by name. Returns `None` if it is not queued.
    pub fn remove(&mut self, app_name: &str) -> Option<InstallItem> {
        let pos = self
            .pending
            .iter()
            .position(|item| item.app_name() == app_name)?;
        self.pending.remove(pos)
    }

    /// Remove every pending item, preserving order.
    pub fn drain(&mut self) -> Vec<InstallItem> {
        self.pending.drain(..).collect()
    }

    /// Find a pending item by name.
    pub fn get(&self, app_name: &str) -> Option<&InstallItem> {
        self.pending.iter().find(|item| item.app_name() == app_name)
    }

    /// Titles in queue order.
    pub fn names_in_order(&self) -> Vec<String> {
        self.pending
            .iter()
            .map(|item| item.app_name().to_string())
            .collect()
    }

    /// Iterate over pending items in order.
    pub fn iter(&self) -> impl Iterator<Item = &InstallItem> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crimson_core::InstallAction;

    fn pending(name: &str) -> InstallItem {
        InstallItem::new(name, InstallAction::Install, "/games")
    }

    #[test]
    fn test_enqueue_preserves_fifo_order() {
        let mut queue = InstallQueue::new();
        assert_eq!(queue.enqueue(pending("A"), None).unwrap(), 1);
        assert_eq!(queue.enqueue(pending("B"), None).unwrap(), 2);
        assert_eq!(queue.enqueue(pending("C"), None).unwrap(), 3);

        assert_eq!(queue.names_in_order(), vec!["A", "B", "C"]);
        assert_eq!(queue.pop_next().unwrap().app_name(), "A");
        assert_eq!(queue.names_in_order(), vec!["B", "C"]);
    }

    #[test]
    fn test_duplicate_in_queue_rejected() {
        let mut queue = InstallQueue::new();
        queue.enqueue(pending("A"), None).unwrap();

        let err = queue.enqueue(pending("A"), None).unwrap_err();
        assert!(matches!(err, InstallError::DuplicateJob { ref app_name } if app_name == "A"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_duplicate_of_active_rejected() {
        let mut queue = InstallQueue::new();
        let err = queue.enqueue(pending("A"), Some("A")).unwrap_err();
        assert!(matches!(err, InstallError::DuplicateJob { .. }));
        assert!(queue.is_empty());

        assert!(queue.enqueue(pending("B"), Some("A")).is_ok());
    }

    #[test]
    fn test_non_pending_item_rejected() {
        let mut queue = InstallQueue::new();
        let mut item = pending("A");
        item.transition(InstallStatus::Cancelled).unwrap();

        assert!(matches!(
            queue.enqueue(item, None),
            Err(InstallError::InvalidTransition { .. })
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let mut queue = InstallQueue::new();
        assert!(queue.pop_next().is_none());
    }

    #[test]
    fn test_remove_from_middle() {
        let mut queue = InstallQueue::new();
        for name in ["A", "B", "C"] {
            queue.enqueue(pending(name), None).unwrap();
        }

        let removed = queue.remove("B").unwrap();
        assert_eq!(removed.app_name(), "B");
        assert_eq!(queue.names_in_order(), vec!["A", "C"]);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut queue = InstallQueue::new();
        queue.enqueue(pending("A"), None).unwrap();
        assert!(queue.remove("Z").is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_removed_name_can_be_requeued() {
        let mut queue = InstallQueue::new();
        queue.enqueue(pending("A"), None).unwrap();
        queue.remove("A");
        assert!(queue.enqueue(pending("A"), None).is_ok());
    }

    #[test]
    fn test_drain_empties_in_order() {
        let mut queue = InstallQueue::new();
        queue.enqueue(pending("A"), None).unwrap();
        queue.enqueue(pending("B"), None).unwrap();

        let drained: Vec<_> = queue.drain().into_iter().map(|i| i.app_name().to_string()).collect();
        assert_eq!(drained, vec!["A", "B"]);
        assert!(queue.is_empty());
    }
}
