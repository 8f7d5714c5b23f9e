//! ClipboardStore - the main-thread facade over history and favorites
//!
//! Owns both stores and the folder selection the UI is showing. All
//! mutations run here on the caller's thread; background signals (clipboard
//! changes, hotkey triggers) are marshalled in by [`crate::app::App`].

use tracing::{debug, info};

use crate::config::Config;
use crate::favorites::{DeleteOutcome, FavoritesStore, DEFAULT_UNDO_LIMIT};
use crate::history::HistoryStore;
use crate::interface::{
    ClipboardAccess, ClipfolioError, ClipfolioResult, ConfirmPrompt, KeystrokeInjector,
    SearchOptions, SearchOutcome, SearchScope, DEFAULT_FOLDER,
};
use crate::models::{ItemRef, PasteTarget};
use crate::persistence::DataPaths;
use crate::search::{SearchEngine, SearchSources};

pub struct ClipboardStore {
    history: HistoryStore,
    favorites: FavoritesStore,
    current_folder: String,
    engine: SearchEngine,
}

impl ClipboardStore {
    /// Load both stores from disk. Unreadable files start empty.
    pub fn open(paths: &DataPaths, config: &Config) -> Self {
        let history = HistoryStore::open(&paths.history, config.history_limit());
        let favorites = FavoritesStore::open(&paths.favorites, config.undo_limit);
        Self::from_parts(history, favorites)
    }

    /// A store that never touches the filesystem (for testing)
    pub fn new_in_memory(history_limit: usize) -> Self {
        Self::from_parts(
            HistoryStore::in_memory(history_limit),
            FavoritesStore::in_memory(DEFAULT_UNDO_LIMIT),
        )
    }

    fn from_parts(history: HistoryStore, favorites: FavoritesStore) -> Self {
        Self {
            history,
            favorites,
            current_folder: DEFAULT_FOLDER.to_string(),
            engine: SearchEngine::new(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn current_folder(&self) -> &str {
        &self.current_folder
    }

    pub fn select_folder(&mut self, name: &str) -> ClipfolioResult<()> {
        self.favorites.folder(name)?;
        self.current_folder = name.to_string();
        Ok(())
    }

    /// Keep the selection pointing at a folder that exists.
    fn fix_current_folder(&mut self) {
        if !self.favorites.collection().contains(&self.current_folder) {
            debug!(folder = %self.current_folder, "Selected folder is gone, selecting default");
            self.current_folder = DEFAULT_FOLDER.to_string();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────

    /// Record text observed on the clipboard.
    pub fn on_clipboard_text(&mut self, text: &str) -> bool {
        self.history.record(text)
    }

    pub fn delete_history(&mut self, index: usize) -> ClipfolioResult<String> {
        self.history.delete_at(index)
    }

    pub fn edit_history(&mut self, index: usize, text: &str) -> ClipfolioResult<()> {
        self.history.edit_at(index, text)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Favorites
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_favorite(&mut self, folder: &str, text: &str, description: &str) -> ClipfolioResult<bool> {
        self.favorites.add(folder, text, description)
    }

    /// Save a history entry as a favorite in `folder`.
    pub fn favorite_from_history(
        &mut self,
        index: usize,
        folder: &str,
        description: &str,
    ) -> ClipfolioResult<bool> {
        let text = self
            .history
            .get(index)
            .ok_or(ClipfolioError::InvalidIndex {
                index,
                len: self.history.len(),
            })?
            .to_string();
        self.favorites.add(folder, &text, description)
    }

    pub fn edit_favorite(
        &mut self,
        at: &ItemRef,
        text: &str,
        description: &str,
    ) -> ClipfolioResult<()> {
        self.favorites.edit(&at.folder, at.index, text, description)
    }

    pub fn move_favorite(&mut self, folder: &str, from_index: usize, to_index: usize) -> ClipfolioResult<()> {
        self.favorites.move_item(folder, from_index, to_index)
    }

    pub fn drop_favorite(&mut self, folder: &str, from_index: usize, drop_row: usize) -> ClipfolioResult<()> {
        self.favorites.move_to_drop_row(folder, from_index, drop_row)
    }

    pub fn shift_favorite(&mut self, at: &ItemRef, delta: isize) -> ClipfolioResult<Option<usize>> {
        self.favorites.shift(&at.folder, at.index, delta)
    }

    pub fn delete_favorite(
        &mut self,
        at: &ItemRef,
        confirm: &dyn ConfirmPrompt,
    ) -> ClipfolioResult<DeleteOutcome> {
        let outcome = self.favorites.delete(&at.folder, at.index, confirm)?;
        self.fix_current_folder();
        Ok(outcome)
    }

    /// Undo the last favorite deletion and select the folder it went back into.
    pub fn undo_delete(&mut self) -> Option<ItemRef> {
        let restored = self.favorites.undo()?;
        self.current_folder = restored.folder.clone();
        Some(restored)
    }

    pub fn move_to_folder(&mut self, at: &ItemRef, target_folder: &str) -> ClipfolioResult<usize> {
        self.favorites.move_to_folder(at, target_folder)
    }

    pub fn create_folder(&mut self, name: &str, seed: Option<&ItemRef>) -> ClipfolioResult<()> {
        self.favorites.create_folder(name, seed)
    }

    /// Rename a folder; a selection on it follows the new name.
    pub fn rename_folder(&mut self, old: &str, new: &str) -> ClipfolioResult<()> {
        self.favorites.rename_folder(old, new)?;
        if self.current_folder == old {
            self.current_folder = new.to_string();
        }
        Ok(())
    }

    pub fn delete_folder(&mut self, name: &str) -> ClipfolioResult<()> {
        self.favorites.delete_folder(name)?;
        self.fix_current_folder();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Copy / paste
    // ─────────────────────────────────────────────────────────────────────────

    pub fn resolve(&self, target: &PasteTarget) -> ClipfolioResult<String> {
        match target {
            PasteTarget::History(index) => self
                .history
                .get(*index)
                .map(str::to_string)
                .ok_or(ClipfolioError::InvalidIndex {
                    index: *index,
                    len: self.history.len(),
                }),
            PasteTarget::Favorite(at) => Ok(self.favorites.item(at)?.text.clone()),
        }
    }

    /// Put the target's text on the clipboard without pasting it.
    pub fn copy(
        &mut self,
        target: &PasteTarget,
        clipboard: &mut dyn ClipboardAccess,
    ) -> ClipfolioResult<String> {
        let text = self.resolve(target)?;
        clipboard.write_text(&text)?;
        Ok(text)
    }

    /// Promote the target in history, put it on the clipboard, and send the
    /// paste shortcut to the focused application.
    pub fn paste(
        &mut self,
        target: &PasteTarget,
        clipboard: &mut dyn ClipboardAccess,
        injector: &mut dyn KeystrokeInjector,
    ) -> ClipfolioResult<String> {
        let text = self.resolve(target)?;
        self.history.promote(&text);
        clipboard.write_text(&text)?;
        injector.send_paste_keystroke()?;
        info!(chars = text.chars().count(), "Pasted entry");
        Ok(text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────

    pub fn search(&self, query: &str, scope: &SearchScope, options: SearchOptions) -> SearchOutcome {
        let sources = SearchSources {
            history: self.history.entries(),
            favorites: self.favorites.collection(),
            current_folder: &self.current_folder,
        };
        self.engine.search(&sources, query, scope, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{FixedAnswer, SearchSource};

    #[derive(Default)]
    struct FakeClipboard {
        text: String,
    }

    impl ClipboardAccess for FakeClipboard {
        fn read_text(&mut self) -> ClipfolioResult<String> {
            Ok(self.text.clone())
        }

        fn write_text(&mut self, text: &str) -> ClipfolioResult<()> {
            self.text = text.to_string();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeInjector {
        presses: usize,
        fail: bool,
    }

    impl KeystrokeInjector for FakeInjector {
        fn send_paste_keystroke(&mut self) -> ClipfolioResult<()> {
            if self.fail {
                return Err(ClipfolioError::Clipboard("no focus".into()));
            }
            self.presses += 1;
            Ok(())
        }
    }

    fn store_with_history(texts: &[&str]) -> ClipboardStore {
        let mut store = ClipboardStore::new_in_memory(30);
        for text in texts.iter().rev() {
            store.on_clipboard_text(text);
        }
        store
    }

    #[test]
    fn test_paste_history_promotes_and_injects() {
        let mut store = store_with_history(&["one", "two", "three"]);
        let mut clipboard = FakeClipboard::default();
        let mut injector = FakeInjector::default();

        let text = store
            .paste(&PasteTarget::History(2), &mut clipboard, &mut injector)
            .unwrap();
        assert_eq!(text, "three");
        assert_eq!(clipboard.text, "three");
        assert_eq!(injector.presses, 1);
        assert_eq!(store.history().entries(), ["three", "one", "two"]);
    }

    #[test]
    fn test_paste_favorite_adds_to_history() {
        let mut store = store_with_history(&["one"]);
        store.add_favorite(DEFAULT_FOLDER, "fav", "").unwrap();
        let mut clipboard = FakeClipboard::default();
        let mut injector = FakeInjector::default();

        store
            .paste(
                &PasteTarget::Favorite(ItemRef::new(DEFAULT_FOLDER, 0)),
                &mut clipboard,
                &mut injector,
            )
            .unwrap();
        assert_eq!(store.history().entries(), ["fav", "one"]);
    }

    #[test]
    fn test_paste_bad_target_changes_nothing() {
        let mut store = store_with_history(&["one"]);
        let mut clipboard = FakeClipboard::default();
        let mut injector = FakeInjector::default();

        let result = store.paste(&PasteTarget::History(9), &mut clipboard, &mut injector);
        assert!(matches!(result, Err(ClipfolioError::InvalidIndex { index: 9, len: 1 })));
        assert!(clipboard.text.is_empty());
        assert_eq!(injector.presses, 0);
    }

    #[test]
    fn test_paste_injector_error_surfaces() {
        let mut store = store_with_history(&["one"]);
        let mut clipboard = FakeClipboard::default();
        let mut injector = FakeInjector { presses: 0, fail: true };
        let result = store.paste(&PasteTarget::History(0), &mut clipboard, &mut injector);
        assert!(matches!(result, Err(ClipfolioError::Clipboard(_))));
        assert_eq!(clipboard.text, "one");
    }

    #[test]
    fn test_copy_does_not_touch_history() {
        let mut store = store_with_history(&["one", "two"]);
        let mut clipboard = FakeClipboard::default();
        store.copy(&PasteTarget::History(1), &mut clipboard).unwrap();
        assert_eq!(clipboard.text, "two");
        assert_eq!(store.history().entries(), ["one", "two"]);
    }

    #[test]
    fn test_selection_follows_rename_and_falls_back() {
        let mut store = ClipboardStore::new_in_memory(30);
        store.create_folder("work", None).unwrap();
        store.select_folder("work").unwrap();
        assert!(store.select_folder("missing").is_err());
        assert_eq!(store.current_folder(), "work");

        store.rename_folder("work", "jobs").unwrap();
        assert_eq!(store.current_folder(), "jobs");

        store.delete_folder("jobs").unwrap();
        assert_eq!(store.current_folder(), DEFAULT_FOLDER);
    }

    #[test]
    fn test_emptied_folder_removal_resets_selection() {
        let mut store = ClipboardStore::new_in_memory(30);
        store.create_folder("tmp", None).unwrap();
        store.add_favorite("tmp", "x", "").unwrap();
        store.select_folder("tmp").unwrap();

        let outcome = store
            .delete_favorite(&ItemRef::new("tmp", 0), &FixedAnswer(true))
            .unwrap();
        assert!(outcome.folder_removed);
        assert_eq!(store.current_folder(), DEFAULT_FOLDER);

        assert_eq!(store.undo_delete(), Some(ItemRef::new("tmp", 0)));
        assert_eq!(store.favorites().folder("tmp").unwrap().len(), 1);
        assert_eq!(store.current_folder(), "tmp");
    }

    #[test]
    fn test_undo_selects_restored_folder() {
        let mut store = ClipboardStore::new_in_memory(30);
        store.create_folder("work", None).unwrap();
        store.add_favorite("work", "keep", "").unwrap();
        store.add_favorite("work", "drop", "").unwrap();
        store
            .delete_favorite(&ItemRef::new("work", 0), &FixedAnswer(false))
            .unwrap();
        assert_eq!(store.current_folder(), DEFAULT_FOLDER);

        assert_eq!(store.undo_delete(), Some(ItemRef::new("work", 0)));
        assert_eq!(store.current_folder(), "work");

        // Nothing left to undo: selection stays put
        store.select_folder(DEFAULT_FOLDER).unwrap();
        assert_eq!(store.undo_delete(), None);
        assert_eq!(store.current_folder(), DEFAULT_FOLDER);
    }

    #[test]
    fn test_favorite_from_history() {
        let mut store = store_with_history(&["snippet"]);
        assert!(store.favorite_from_history(0, DEFAULT_FOLDER, "note").unwrap());
        assert!(!store.favorite_from_history(0, DEFAULT_FOLDER, "note").unwrap());
        assert!(store.favorite_from_history(3, DEFAULT_FOLDER, "").is_err());

        let item = store.favorites().item(&ItemRef::new(DEFAULT_FOLDER, 0)).unwrap();
        assert_eq!(item.description, "note");
    }

    #[test]
    fn test_search_current_folder_scope() {
        let mut store = store_with_history(&["apple pie"]);
        store.create_folder("fruit", None).unwrap();
        store.add_favorite("fruit", "apple", "").unwrap();
        store.add_favorite(DEFAULT_FOLDER, "apple juice", "").unwrap();
        store.select_folder("fruit").unwrap();

        let outcome = store.search("apple", &SearchScope::CurrentFolder, SearchOptions::default());
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].source, SearchSource::Folder("fruit".into()));

        let outcome = store.search("apple", &SearchScope::All, SearchOptions::default());
        let sources: Vec<String> = outcome.hits.iter().map(|h| h.source_label()).collect();
        assert_eq!(sources, vec!["history", "folder:default", "folder:fruit"]);
    }
}
