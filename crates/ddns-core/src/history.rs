//! Bounded operation history
//!
//! A capacity-limited log of what the engine did, kept for display. It is not
//! an audit trail; the remote zone is the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Severity of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for HistoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HistoryLevel::Info => "info",
            HistoryLevel::Warning => "warning",
            HistoryLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub level: HistoryLevel,
    pub message: String,
}

/// Ring buffer of [`HistoryEntry`]s; the oldest entry is evicted first
#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl History {
    /// Create an empty history holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, evicting the oldest one when full
    ///
    /// The entry is also emitted through `tracing` at the matching level.
    pub fn push(&mut self, level: HistoryLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            HistoryLevel::Info => tracing::info!("{}", message),
            HistoryLevel::Warning => tracing::warn!("{}", message),
            HistoryLevel::Error => tracing::error!("{}", message),
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(HistoryLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(HistoryLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(HistoryLevel::Error, message);
    }

    /// Newest entries first, at most `limit` of them
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry, keeping the capacity
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Change the capacity, dropping the oldest entries if it shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_newest_entries_in_order() {
        let mut history = History::new(100);
        for i in 0..101 {
            history.info(format!("entry {i}"));
        }

        assert_eq!(history.len(), 100);
        let all = history.recent(usize::MAX);
        assert_eq!(all.first().unwrap().message, "entry 100");
        assert_eq!(all.last().unwrap().message, "entry 1");
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut history = History::new(3);
        history.info("a");
        history.error("b");
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.capacity(), 3);
        history.info("c");
        assert_eq!(history.recent(10)[0].message, "c");
    }

    #[test]
    fn recent_is_limited() {
        let mut history = History::new(5);
        history.info("a");
        history.error("b");
        history.warning("c");

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "c");
        assert_eq!(recent[0].level, HistoryLevel::Warning);
        assert_eq!(recent[1].level, HistoryLevel::Error);
    }

    #[test]
    fn shrinking_drops_oldest() {
        let mut history = History::new(4);
        for m in ["a", "b", "c", "d"] {
            history.info(m);
        }
        history.set_capacity(2);
        let kept: Vec<_> = history.recent(10).into_iter().map(|e| e.message).collect();
        assert_eq!(kept, vec!["d", "c"]);
    }

    #[test]
    fn zero_capacity_still_keeps_one() {
        let mut history = History::new(0);
        history.info("a");
        history.info("b");
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
    }
}
