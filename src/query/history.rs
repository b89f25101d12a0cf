use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// File inside an index directory holding the project's search history
pub const HISTORY_FILE: &str = "history.json";

/// Recently searched phrases, newest last, with a browsing cursor.
///
/// Holds at most `capacity` entries; pushing onto a full history drops the
/// oldest. The cursor is not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistory {
    capacity: usize,
    entries: VecDeque<String>,
    #[serde(skip)]
    cursor: Option<usize>,
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            cursor: None,
        }
    }

    /// Record a phrase and reset the cursor.
    ///
    /// Repeating the most recent phrase does not add a second entry.
    pub fn push(&mut self, phrase: &str) {
        self.cursor = None;

        let phrase = phrase.trim();
        if phrase.is_empty() || self.entries.back().map(String::as_str) == Some(phrase) {
            return;
        }

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(phrase.to_string());
    }

    /// Step to the next older entry, staying on the oldest at the end
    pub fn older(&mut self) -> Option<&str> {
        let idx = match self.cursor {
            None => self.entries.len().checked_sub(1)?,
            Some(i) => i.saturating_sub(1),
        };
        self.cursor = Some(idx);
        self.entries.get(idx).map(String::as_str)
    }

    /// Step to the next newer entry; past the newest the cursor resets
    pub fn newer(&mut self) -> Option<&str> {
        let idx = self.cursor? + 1;
        if idx >= self.entries.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(idx);
        self.entries.get(idx).map(String::as_str)
    }

    /// Entry under the cursor
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.cursor?).map(String::as_str)
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(String::as_str)
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

    /// Load the history stored in `index_path`, empty if there is none.
    ///
    /// A smaller `capacity` than the stored one trims the oldest entries.
    pub fn load(index_path: &Path, capacity: usize) -> Result<Self> {
        let path = index_path.join(HISTORY_FILE);
        let mut history = if path.exists() {
            serde_json::from_str::<SearchHistory>(&fs::read_to_string(&path)?)?
        } else {
            Self::new(capacity)
        };

        history.capacity = capacity.max(1);
        while history.entries.len() > history.capacity {
            history.entries.pop_front();
        }
        Ok(history)
    }

    pub fn save(&self, index_path: &Path) -> Result<()> {
        fs::write(
            index_path.join(HISTORY_FILE),
            serde_json::to_string_pretty(self)?,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(phrases: &[&str], capacity: usize) -> SearchHistory {
        let mut history = SearchHistory::new(capacity);
        for phrase in phrases {
            history.push(phrase);
        }
        history
    }

    #[test]
    fn test_drops_oldest_when_full() {
        let history = history(&["a", "b", "c", "d"], 3);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["b", "c", "d"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_repeat_of_newest_is_ignored() {
        let history = history(&["a", "a ", "b", "a"], 10);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_cursor_navigation() {
        let mut history = history(&["one", "two", "three"], 10);
        assert_eq!(history.current(), None);
        assert_eq!(history.newer(), None);

        assert_eq!(history.older(), Some("three"));
        assert_eq!(history.older(), Some("two"));
        assert_eq!(history.older(), Some("one"));
        assert_eq!(history.older(), Some("one"));
        assert_eq!(history.newer(), Some("two"));
        assert_eq!(history.current(), Some("two"));
        assert_eq!(history.newer(), Some("three"));
        assert_eq!(history.newer(), None);
        assert_eq!(history.current(), None);

        history.older();
        history.push("four");
        assert_eq!(history.current(), None);
    }

    #[test]
    fn test_empty_history_navigation() {
        let mut history = SearchHistory::new(0);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.older(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_persisted_per_index() {
        let dir = tempfile::tempdir().unwrap();
        history(&["x", "y", "z"], 5).save(dir.path()).unwrap();

        let loaded = SearchHistory::load(dir.path(), 2).unwrap();
        assert_eq!(loaded.iter().collect::<Vec<_>>(), vec!["y", "z"]);

        let other = tempfile::tempdir().unwrap();
        assert!(SearchHistory::load(other.path(), 5).unwrap().is_empty());
    }
}
