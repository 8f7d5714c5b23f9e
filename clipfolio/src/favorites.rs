//! Favorites: named folders of saved snippets
//!
//! `FavoritesCollection` is the ordered folder map; `FavoritesStore` wraps it
//! with validation, the deletion undo log, and write-through persistence.
//! Every successful mutation is saved immediately; there is no batching.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::interface::{ClipfolioError, ClipfolioResult, ConfirmPrompt, FavoriteItem, DEFAULT_FOLDER};
use crate::models::{DeletionRecord, FavoriteFolder, ItemRef};
use crate::persistence;

/// Default depth of the deletion undo log
pub const DEFAULT_UNDO_LIMIT: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// COLLECTION
// ─────────────────────────────────────────────────────────────────────────────

/// Folder name → ordered items, keeping folder insertion order for menus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesCollection {
    folders: Vec<FavoriteFolder>,
}

impl Default for FavoritesCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesCollection {
    /// A collection holding only the empty default folder
    pub fn new() -> Self {
        Self {
            folders: vec![FavoriteFolder::new(DEFAULT_FOLDER)],
        }
    }

    /// Build from folders as given, adding the default folder at the end if absent.
    pub fn from_folders(folders: Vec<FavoriteFolder>) -> Self {
        let mut collection = Self { folders };
        collection.ensure_default();
        collection
    }

    /// Returns true if the default folder had to be added.
    pub fn ensure_default(&mut self) -> bool {
        if self.contains(DEFAULT_FOLDER) {
            return false;
        }
        self.folders.push(FavoriteFolder::new(DEFAULT_FOLDER));
        true
    }

    pub fn folders(&self) -> &[FavoriteFolder] {
        &self.folders
    }

    pub fn folder_names(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(|f| f.name.as_str())
    }

    pub fn folder(&self, name: &str) -> Option<&FavoriteFolder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub(crate) fn folder_mut(&mut self, name: &str) -> Option<&mut FavoriteFolder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.folder(name).is_some()
    }

    pub fn total_items(&self) -> usize {
        self.folders.iter().map(FavoriteFolder::len).sum()
    }

    pub(crate) fn push_folder(&mut self, folder: FavoriteFolder) {
        self.folders.push(folder);
    }

    pub(crate) fn remove_folder(&mut self, name: &str) -> Option<FavoriteFolder> {
        let pos = self.folders.iter().position(|f| f.name == name)?;
        Some(self.folders.remove(pos))
    }
}

/// Translate a drag-and-drop row into a target index.
///
/// `drop_row` is the row the item is inserted before, counted before the
/// dragged item is removed, so rows below the source shift up by one.
pub fn drop_row_to_index(from_index: usize, drop_row: usize) -> usize {
    if drop_row < from_index {
        drop_row
    } else {
        drop_row.saturating_sub(1)
    }
}

/// What a favorite deletion did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub item: FavoriteItem,
    /// The folder became empty and the user agreed to remove it
    pub folder_removed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// STORE
// ─────────────────────────────────────────────────────────────────────────────

pub struct FavoritesStore {
    collection: FavoritesCollection,
    undo_log: VecDeque<DeletionRecord>,
    undo_limit: usize,
    file: Option<PathBuf>,
}

impl FavoritesStore {
    /// Load favorites from `path`, re-saving at once if the file used an older format.
    pub fn open<P: AsRef<Path>>(path: P, undo_limit: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let decoded = persistence::load_favorites(&path);
        info!(
            path = %path.display(),
            folders = decoded.collection.folders().len(),
            items = decoded.collection.total_items(),
            "Loaded favorites"
        );

        let store = Self {
            collection: decoded.collection,
            undo_log: VecDeque::new(),
            undo_limit,
            file: Some(path),
        };
        if decoded.migrated {
            info!("Favorites file used a legacy format, rewriting");
            store.persist();
        }
        store
    }

    /// A store that never touches the filesystem (for testing)
    pub fn in_memory(undo_limit: usize) -> Self {
        Self::with_collection(FavoritesCollection::new(), undo_limit)
    }

    pub fn with_collection(mut collection: FavoritesCollection, undo_limit: usize) -> Self {
        collection.ensure_default();
        Self {
            collection,
            undo_log: VecDeque::new(),
            undo_limit,
            file: None,
        }
    }

    pub fn collection(&self) -> &FavoritesCollection {
        &self.collection
    }

    pub fn folder(&self, name: &str) -> ClipfolioResult<&FavoriteFolder> {
        self.collection
            .folder(name)
            .ok_or_else(|| ClipfolioError::FolderNotFound(name.to_string()))
    }

    pub fn item(&self, at: &ItemRef) -> ClipfolioResult<&FavoriteItem> {
        let folder = self.folder(&at.folder)?;
        folder.items.get(at.index).ok_or(ClipfolioError::InvalidIndex {
            index: at.index,
            len: folder.len(),
        })
    }

    /// Pending deletions, most recent last
    pub fn undo_log(&self) -> impl Iterator<Item = &DeletionRecord> {
        self.undo_log.iter()
    }

    fn folder_mut(&mut self, name: &str) -> ClipfolioResult<&mut FavoriteFolder> {
        self.collection
            .folder_mut(name)
            .ok_or_else(|| ClipfolioError::FolderNotFound(name.to_string()))
    }

    fn check_index(folder: &FavoriteFolder, index: usize) -> ClipfolioResult<()> {
        if index < folder.len() {
            Ok(())
        } else {
            Err(ClipfolioError::InvalidIndex {
                index,
                len: folder.len(),
            })
        }
    }

    fn persist(&self) {
        if let Some(path) = &self.file {
            if let Err(e) = persistence::save_favorites(path, &self.collection) {
                error!(path = %path.display(), error = %e, "Failed to save favorites");
            }
        }
    }

    fn push_undo(&mut self, record: DeletionRecord) {
        if self.undo_limit == 0 {
            return;
        }
        while self.undo_log.len() >= self.undo_limit {
            self.undo_log.pop_front();
        }
        self.undo_log.push_back(record);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Item operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert at the top of `folder`. Returns false (and changes nothing) if the
    /// folder already holds an item with the same text.
    pub fn add(&mut self, folder: &str, text: &str, description: &str) -> ClipfolioResult<bool> {
        if text.is_empty() {
            return Err(ClipfolioError::InvalidInput("Favorite text is empty".into()));
        }
        let target = self.folder_mut(folder)?;
        if target.contains_text(text) {
            debug!(folder, "Favorite already present, not adding");
            return Ok(false);
        }
        target
            .items
            .insert(0, FavoriteItem::with_description(text, description));
        self.persist();
        Ok(true)
    }

    /// Replace the text and description of an item in place.
    pub fn edit(
        &mut self,
        folder: &str,
        index: usize,
        text: &str,
        description: &str,
    ) -> ClipfolioResult<()> {
        if text.is_empty() {
            return Err(ClipfolioError::InvalidInput("Favorite text is empty".into()));
        }
        let target = self.folder_mut(folder)?;
        Self::check_index(target, index)?;
        target.items[index] = FavoriteItem::with_description(text, description);
        self.persist();
        Ok(())
    }

    /// Move an item within its folder so it ends up at `to_index`.
    pub fn move_item(&mut self, folder: &str, from_index: usize, to_index: usize) -> ClipfolioResult<()> {
        let target = self.folder_mut(folder)?;
        Self::check_index(target, from_index)?;
        Self::check_index(target, to_index)?;
        if from_index == to_index {
            return Ok(());
        }
        let item = target.items.remove(from_index);
        target.items.insert(to_index, item);
        self.persist();
        Ok(())
    }

    /// Apply a drag-and-drop reorder reported as a raw drop row.
    pub fn move_to_drop_row(&mut self, folder: &str, from_index: usize, drop_row: usize) -> ClipfolioResult<()> {
        self.move_item(folder, from_index, drop_row_to_index(from_index, drop_row))
    }

    /// Move up (`-1`) or down (`+1`). Moving past either end is a no-op that returns `None`.
    pub fn shift(&mut self, folder: &str, index: usize, delta: isize) -> ClipfolioResult<Option<usize>> {
        let len = self.folder(folder)?.len();
        let target = match index.checked_add_signed(delta) {
            Some(t) if t < len && index < len => t,
            _ => return Ok(None),
        };
        self.move_item(folder, index, target)?;
        Ok(Some(target))
    }

    /// Remove an item and remember it for [`undo`](Self::undo). If that leaves a
    /// non-default folder empty, `confirm` decides whether the folder goes too.
    pub fn delete(
        &mut self,
        folder: &str,
        index: usize,
        confirm: &dyn ConfirmPrompt,
    ) -> ClipfolioResult<DeleteOutcome> {
        let target = self.folder_mut(folder)?;
        Self::check_index(target, index)?;
        let item = target.items.remove(index);
        let now_empty = target.is_empty();

        self.push_undo(DeletionRecord::new(folder, item.clone(), index));
        self.persist();

        let folder_removed = now_empty
            && folder != DEFAULT_FOLDER
            && confirm.confirm_delete_empty_folder(folder);
        if folder_removed {
            self.collection.remove_folder(folder);
            info!(folder, "Removed empty folder");
            self.persist();
        }

        Ok(DeleteOutcome { item, folder_removed })
    }

    /// Restore the most recent deletion, recreating its folder if needed.
    /// Returns where the item was put back, or `None` if there was nothing to undo.
    pub fn undo(&mut self) -> Option<ItemRef> {
        let record = self.undo_log.pop_back()?;
        let age_secs = record.age().num_seconds();

        if !self.collection.contains(&record.folder) {
            info!(folder = %record.folder, "Recreating folder for undo");
            self.collection.push_folder(FavoriteFolder::new(record.folder.clone()));
        }
        let folder = self.collection.folder_mut(&record.folder)?;
        let position = record.position.min(folder.len());
        folder.items.insert(position, record.item);
        info!(
            folder = %record.folder,
            position,
            age_secs,
            "Restored deleted favorite"
        );

        self.persist();
        Some(ItemRef::new(record.folder, position))
    }

    /// Move an item to the end of another folder. Duplicates across folders are allowed.
    /// Returns the item's index in the target folder.
    pub fn move_to_folder(&mut self, source: &ItemRef, target_folder: &str) -> ClipfolioResult<usize> {
        if source.folder == target_folder {
            return Err(ClipfolioError::InvalidInput(format!(
                "Item is already in folder {}",
                target_folder
            )));
        }
        if !self.collection.contains(target_folder) {
            return Err(ClipfolioError::FolderNotFound(target_folder.to_string()));
        }
        let from = self.folder_mut(&source.folder)?;
        Self::check_index(from, source.index)?;
        let item = from.items.remove(source.index);

        let to = self.folder_mut(target_folder)?;
        to.items.push(item);
        let new_index = to.len() - 1;

        self.persist();
        Ok(new_index)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Folder operations
    // ─────────────────────────────────────────────────────────────────────────

    fn validate_new_name(&self, name: &str) -> ClipfolioResult<()> {
        if name.trim().is_empty() {
            return Err(ClipfolioError::InvalidInput("Folder name is empty".into()));
        }
        if self.collection.contains(name) {
            return Err(ClipfolioError::FolderExists(name.to_string()));
        }
        Ok(())
    }

    /// Create an empty folder, or one seeded with an item moved out of another folder.
    pub fn create_folder(&mut self, name: &str, seed: Option<&ItemRef>) -> ClipfolioResult<()> {
        self.validate_new_name(name)?;

        let mut folder = FavoriteFolder::new(name);
        if let Some(at) = seed {
            let source = self.folder_mut(&at.folder)?;
            Self::check_index(source, at.index)?;
            folder.items.push(source.items.remove(at.index));
        }

        self.collection.push_folder(folder);
        info!(folder = name, "Created folder");
        self.persist();
        Ok(())
    }

    pub fn rename_folder(&mut self, old: &str, new: &str) -> ClipfolioResult<()> {
        if old == DEFAULT_FOLDER {
            return Err(ClipfolioError::ReservedFolder("renamed"));
        }
        if !self.collection.contains(old) {
            return Err(ClipfolioError::FolderNotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        self.validate_new_name(new)?;

        if let Some(folder) = self.collection.folder_mut(old) {
            folder.name = new.to_string();
        }
        for record in self.undo_log.iter_mut().filter(|r| r.folder == old) {
            record.folder = new.to_string();
        }

        info!(from = old, to = new, "Renamed folder");
        self.persist();
        Ok(())
    }

    /// Remove a folder and everything in it. Not undoable.
    pub fn delete_folder(&mut self, name: &str) -> ClipfolioResult<FavoriteFolder> {
        if name == DEFAULT_FOLDER {
            return Err(ClipfolioError::ReservedFolder("deleted"));
        }
        let removed = self
            .collection
            .remove_folder(name)
            .ok_or_else(|| ClipfolioError::FolderNotFound(name.to_string()))?;
        info!(folder = name, items = removed.len(), "Deleted folder");
        self.persist();
        Ok(removed)
    }
}
