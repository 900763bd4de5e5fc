//! Per-name failure accounting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrences of a failure and the latest diagnostic text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub count: u32,
    pub text: String,
}

/// Map of scene name to its failure record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExceptionLog {
    entries: BTreeMap<String, ExceptionRecord>,
}

impl ExceptionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more failure for `name` and keep only this diagnostic
    pub fn append(&mut self, name: &str, text: impl Into<String>) {
        let record = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| ExceptionRecord {
                count: 0,
                text: String::new(),
            });
        record.count += 1;
        record.text = text.into();
    }

    /// Record for `name`, if it ever failed
    pub fn get(&self, name: &str) -> Option<&ExceptionRecord> {
        self.entries.get(name)
    }

    /// Number of failures recorded for `name`
    pub fn count(&self, name: &str) -> u32 {
        self.entries.get(name).map(|r| r.count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct failing names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Forget every record
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Records in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExceptionRecord)> {
        self.entries.iter()
    }

    /// Log the accumulated failures, if any
    pub fn dump(&self) {
        if self.entries.is_empty() {
            return;
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => log::warn!("Scene exceptions during this run:\n{}", json),
            Err(e) => log::warn!("Scene exceptions during this run ({} entries, unprintable: {})", self.len(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_increments_and_keeps_latest() {
        let mut log = ExceptionLog::new();
        log.append("GameKill", "first");
        log.append("GameKill", "second");
        log.append("GameDead", "other");

        let record = log.get("GameKill").unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.text, "second");
        assert_eq!(log.count("GameDead"), 1);
        assert_eq!(log.count("Lobby"), 0);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut log = ExceptionLog::new();
        log.append("GameKill", "boom");
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["GameKill"]["count"], 1);
        assert_eq!(json["GameKill"]["text"], "boom");
    }
}
