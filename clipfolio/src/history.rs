//! Clipboard history: a capped, de-duplicated, most-recent-first list of text.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::interface::{ClipfolioError, ClipfolioResult};
use crate::persistence;

/// Default number of entries kept
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

pub struct HistoryStore {
    entries: Vec<String>,
    limit: usize,
    file: Option<PathBuf>,
}

impl HistoryStore {
    /// Load history from `path`. Duplicates and empty strings in the file are
    /// dropped and the list is cut to `limit`.
    pub fn open<P: AsRef<Path>>(path: P, limit: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let loaded = persistence::load_history(&path);
        let loaded_len = loaded.len();

        let mut store = Self {
            entries: Vec::with_capacity(limit),
            limit: limit.max(1),
            file: Some(path),
        };
        for text in loaded {
            if !text.is_empty() && !store.entries.contains(&text) {
                store.entries.push(text);
            }
        }
        store.entries.truncate(store.limit);

        info!(entries = store.entries.len(), "Loaded history");
        if store.entries.len() != loaded_len {
            debug!(dropped = loaded_len - store.entries.len(), "Normalized history file");
            store.persist();
        }
        store
    }

    /// A store that never touches the filesystem (for testing)
    pub fn in_memory(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
            file: None,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e == text)
    }

    fn persist(&self) {
        if let Some(path) = &self.file {
            if let Err(e) = persistence::save_history(path, &self.entries) {
                error!(path = %path.display(), error = %e, "Failed to save history");
            }
        }
    }

    fn check_index(&self, index: usize) -> ClipfolioResult<()> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(ClipfolioError::InvalidIndex {
                index,
                len: self.entries.len(),
            })
        }
    }

    /// Put `text` at the front, removing any earlier copy and evicting past the cap.
    /// Returns false for empty text, which is ignored.
    pub fn record(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.entries.first().map(String::as_str) == Some(text) {
            return true;
        }

        if let Some(pos) = self.entries.iter().position(|e| e == text) {
            self.entries.remove(pos);
        }
        self.entries.insert(0, text.to_string());
        self.entries.truncate(self.limit);

        self.persist();
        true
    }

    /// Mark `text` as most recently used, whichever surface it came from.
    pub fn promote(&mut self, text: &str) -> bool {
        self.record(text)
    }

    /// Remove one entry. History deletions are not undoable.
    pub fn delete_at(&mut self, index: usize) -> ClipfolioResult<String> {
        self.check_index(index)?;
        let removed = self.entries.remove(index);
        self.persist();
        Ok(removed)
    }

    /// Replace the entry at `index`. Another entry with the same text is dropped
    /// so the list stays duplicate-free.
    pub fn edit_at(&mut self, index: usize, text: &str) -> ClipfolioResult<()> {
        self.check_index(index)?;
        if text.is_empty() {
            return Err(ClipfolioError::InvalidInput("History text is empty".into()));
        }

        self.entries[index] = text.to_string();
        if let Some(dup) = self
            .entries
            .iter()
            .enumerate()
            .position(|(i, e)| i != index && e == text)
        {
            self.entries.remove(dup);
        }

        self.persist();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_promotes_existing() {
        let mut history = HistoryStore::in_memory(DEFAULT_HISTORY_LIMIT);
        history.record("alpha");
        history.record("beta");
        history.record("alpha");
        assert_eq!(history.entries(), ["alpha", "beta"]);
    }

    #[test]
    fn test_empty_text_ignored() {
        let mut history = HistoryStore::in_memory(DEFAULT_HISTORY_LIMIT);
        assert!(!history.record(""));
        assert!(history.is_empty());
    }

    #[test]
    fn test_cap_and_no_duplicates_hold_for_any_sequence() {
        let mut history = HistoryStore::in_memory(5);
        let inputs = ["a", "b", "c", "a", "d", "e", "f", "b", "g", "a", "a", "h"];
        for text in inputs {
            history.record(text);
            assert!(history.len() <= 5);
            assert_eq!(history.get(0), Some(text));

            let mut seen = history.entries().to_vec();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), history.len(), "duplicate in {:?}", history.entries());
        }
        assert_eq!(history.entries(), ["h", "a", "g", "b", "f"]);
    }

    #[test]
    fn test_eviction_from_tail() {
        let mut history = HistoryStore::in_memory(2);
        history.record("one");
        history.record("two");
        history.record("three");
        assert_eq!(history.entries(), ["three", "two"]);
    }

    #[test]
    fn test_delete_and_clear() {
        let mut history = HistoryStore::in_memory(10);
        history.record("one");
        history.record("two");
        assert_eq!(history.delete_at(1).unwrap(), "one");
        assert!(matches!(
            history.delete_at(5),
            Err(ClipfolioError::InvalidIndex { index: 5, len: 1 })
        ));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_edit_keeps_entries_unique() {
        let mut history = HistoryStore::in_memory(10);
        for text in ["c", "b", "a"] {
            history.record(text);
        }
        history.edit_at(0, "c").unwrap();
        assert_eq!(history.entries(), ["c", "b"]);

        history.edit_at(1, "z").unwrap();
        assert_eq!(history.entries(), ["c", "z"]);
        assert!(history.edit_at(0, "").is_err());
    }

    #[test]
    fn test_persists_every_mutation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut history = HistoryStore::open(&path, 10);
        history.record("first");
        history.record("second");
        assert_eq!(persistence::load_history(&path), ["second", "first"]);

        history.delete_at(0).unwrap();
        assert_eq!(persistence::load_history(&path), ["first"]);

        history.clear();
        assert!(persistence::load_history(&path).is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_failed_save_keeps_in_memory_change() {
        let dir = TempDir::new().unwrap();
        // A directory at the file path makes every save fail
        let path = dir.path().join("history.json");
        std::fs::create_dir(&path).unwrap();

        let mut history = HistoryStore::open(&path, 10);
        assert!(history.record("first"));
        assert!(history.record("second"));
        history.edit_at(0, "second!").unwrap();
        assert_eq!(history.delete_at(1).unwrap(), "first");
        assert_eq!(history.entries(), ["second!"]);
        assert!(path.is_dir());
    }

    #[test]
    fn test_open_normalizes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"["a", "", "b", "a", "c", "d"]"#).unwrap();

        let history = HistoryStore::open(&path, 3);
        assert_eq!(history.entries(), ["a", "b", "c"]);
        assert_eq!(persistence::load_history(&path), ["a", "b", "c"]);
    }
}
