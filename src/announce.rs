//! Announcement log shown next to the cab
//!
//! Append-only with a fixed capacity: the oldest entry falls off when a new
//! one arrives at capacity.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::LOG_CAPACITY;
use crate::sim::LogSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Monotonic sequence number, unique for the log's lifetime
    pub id: u64,
    /// Host timestamp in seconds
    pub at: f64,
    pub text: String,
    pub source: LogSource,
    pub urgent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementLog {
    entries: VecDeque<Entry>,
    next_id: u64,
}

impl Default for AnnouncementLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY),
            next_id: 0,
        }
    }

    pub fn push(&mut self, at: f64, text: impl Into<String>, source: LogSource, urgent: bool) {
        if self.entries.len() == LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
            id: self.next_id,
            at,
            text: text.into(),
            source,
            urgent,
        });
        self.next_id += 1;
    }

    /// Empty the log. Ids keep counting so hosts can still key on them.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Entry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = AnnouncementLog::new();
        for i in 0..7 {
            log.push(i as f64, format!("line {i}"), LogSource::System, false);
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["line 2", "line 3", "line 4", "line 5", "line 6"]);
        assert_eq!(log.latest().map(|e| e.id), Some(6));
    }

    #[test]
    fn test_clear_keeps_ids_monotonic() {
        let mut log = AnnouncementLog::new();
        log.push(0.0, "a", LogSource::System, false);
        log.clear();
        assert!(log.is_empty());
        log.push(1.0, "b", LogSource::Station, true);
        let latest = log.latest().cloned();
        assert_eq!(latest.as_ref().map(|e| e.id), Some(1));
        assert_eq!(latest.map(|e| e.urgent), Some(true));
    }
}
