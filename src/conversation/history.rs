//! Bounded most-recent-first list of asked questions.

use std::collections::VecDeque;

use crate::config::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone)]
pub struct HistoryTracker {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for HistoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryTracker {
    /// Tracker holding the last five questions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Tracker with a custom bound. Zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest past capacity.
    /// Duplicates are kept.
    pub fn record(&mut self, question: impl Into<String>) {
        self.entries.push_front(question.into());
        self.entries.truncate(self.capacity);
    }

    /// Most-recent-first snapshot.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
