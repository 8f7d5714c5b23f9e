//! JSON persistence for history and favorites
//!
//! One pretty-printed UTF-8 JSON file per collection in the user's home
//! directory. Loads never fail: a missing file is an empty collection, and a
//! malformed one is backed up next to itself, logged, and replaced by the
//! empty default. Saves go through a temp file and a rename so a crash
//! mid-write leaves the previous snapshot intact.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::favorites::FavoritesCollection;
use crate::interface::{FavoriteItem, DEFAULT_FOLDER};
use crate::models::FavoriteFolder;

pub const HISTORY_FILE_NAME: &str = ".clipboard_history.json";
pub const FAVORITES_FILE_NAME: &str = ".clipboard_favorites.json";
pub const CONFIG_FILE_NAME: &str = ".clipboard_config.json";

/// Default-folder keys written by older revisions; folded into [`DEFAULT_FOLDER`] on load.
pub const LEGACY_DEFAULT_FOLDER_NAMES: &[&str] = &["默认收藏夹"];

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine the home directory")]
    NoHomeDir,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Locations of the three persisted files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub history: PathBuf,
    pub favorites: PathBuf,
    pub config: PathBuf,
}

impl DataPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            history: dir.join(HISTORY_FILE_NAME),
            favorites: dir.join(FAVORITES_FILE_NAME),
            config: dir.join(CONFIG_FILE_NAME),
        }
    }

    /// The files in the current user's home directory
    pub fn in_home() -> PersistenceResult<Self> {
        dirs::home_dir()
            .map(Self::in_dir)
            .ok_or(PersistenceError::NoHomeDir)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FILE HELPERS
// ─────────────────────────────────────────────────────────────────────────────

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Read a file, mapping "not found" to `None`
pub(crate) fn read_optional(path: &Path) -> PersistenceResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Serialize `value` as pretty JSON and replace `path` atomically (write temp, then rename).
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> PersistenceResult<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = sibling_with_suffix(path, ".tmp");
    fs::write(&tmp_path, json.as_bytes())?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Keep a copy of an unparseable file so the next save doesn't destroy it.
pub(crate) fn backup_unreadable(path: &Path) {
    let backup = sibling_with_suffix(path, ".bak");
    match fs::copy(path, &backup) {
        Ok(_) => info!(backup = %backup.display(), "Backed up unreadable file"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to back up unreadable file"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HISTORY
// ─────────────────────────────────────────────────────────────────────────────

pub fn decode_history(json: &str) -> PersistenceResult<Vec<String>> {
    Ok(serde_json::from_str(json)?)
}

/// Load history entries, most recent first. Never fails.
pub fn load_history(path: &Path) -> Vec<String> {
    match read_optional(path) {
        Ok(None) => {
            debug!(path = %path.display(), "No history file yet");
            Vec::new()
        }
        Ok(Some(content)) => match decode_history(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "History file is malformed, starting empty");
                backup_unreadable(path);
                Vec::new()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read history file, starting empty");
            Vec::new()
        }
    }
}

pub fn save_history(path: &Path, entries: &[String]) -> PersistenceResult<()> {
    write_json_atomic(path, entries)
}

// ─────────────────────────────────────────────────────────────────────────────
// FAVORITES
// ─────────────────────────────────────────────────────────────────────────────

/// Favorite item as it may appear on disk: a bare string (older files) or a full record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredItem {
    Plain(String),
    Full(FavoriteItem),
}

impl StoredItem {
    fn is_plain(&self) -> bool {
        matches!(self, StoredItem::Plain(_))
    }
}

impl From<StoredItem> for FavoriteItem {
    fn from(stored: StoredItem) -> Self {
        match stored {
            StoredItem::Plain(text) => FavoriteItem::new(text),
            StoredItem::Full(item) => item,
        }
    }
}

/// Top-level favorites shape: a bare list (oldest format) or folder map in file order.
enum StoredFavorites {
    Flat(Vec<StoredItem>),
    Folders(Vec<(String, Vec<StoredItem>)>),
}

struct StoredFavoritesVisitor;

impl<'de> Visitor<'de> for StoredFavoritesVisitor {
    type Value = StoredFavorites;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of favorites or a map of folder name to favorites")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<StoredItem>()? {
            items.push(item);
        }
        Ok(StoredFavorites::Flat(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut folders = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, items)) = map.next_entry::<String, Vec<StoredItem>>()? {
            folders.push((name, items));
        }
        Ok(StoredFavorites::Folders(folders))
    }
}

impl<'de> Deserialize<'de> for StoredFavorites {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StoredFavoritesVisitor)
    }
}

/// Folders are written as a JSON object in display order, items always in `{text, description}` form.
impl Serialize for FavoritesCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.folders().len()))?;
        for folder in self.folders() {
            map.serialize_entry(&folder.name, &folder.items)?;
        }
        map.end()
    }
}

/// Result of decoding a favorites file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFavorites {
    pub collection: FavoritesCollection,
    /// The on-disk shape differed from the normalized one and should be re-saved
    pub migrated: bool,
}

pub fn decode_favorites(json: &str) -> PersistenceResult<DecodedFavorites> {
    let stored: StoredFavorites = serde_json::from_str(json)?;

    let (folders, mut migrated) = match stored {
        StoredFavorites::Flat(items) => {
            let items = items.into_iter().map(FavoriteItem::from).collect();
            (vec![FavoriteFolder::with_items(DEFAULT_FOLDER, items)], true)
        }
        StoredFavorites::Folders(entries) => {
            let mut migrated = false;
            let mut folders: Vec<FavoriteFolder> = Vec::with_capacity(entries.len());
            for (name, items) in entries {
                migrated |= items.iter().any(StoredItem::is_plain);
                let name = if LEGACY_DEFAULT_FOLDER_NAMES.contains(&name.as_str()) {
                    migrated = true;
                    DEFAULT_FOLDER.to_string()
                } else {
                    name
                };
                let items = items.into_iter().map(FavoriteItem::from);
                match folders.iter_mut().find(|f| f.name == name) {
                    Some(existing) => {
                        for item in items {
                            if !existing.contains_text(&item.text) {
                                existing.items.push(item);
                            }
                        }
                    }
                    None => folders.push(FavoriteFolder::with_items(name, items.collect())),
                }
            }
            (folders, migrated)
        }
    };

    let mut collection = FavoritesCollection::from_folders(folders);
    migrated |= collection.ensure_default();
    Ok(DecodedFavorites { collection, migrated })
}

pub fn encode_favorites(collection: &FavoritesCollection) -> PersistenceResult<String> {
    Ok(serde_json::to_string_pretty(collection)?)
}

/// Load favorites. Never fails; the default folder is always present afterwards.
pub fn load_favorites(path: &Path) -> DecodedFavorites {
    let fallback = || DecodedFavorites {
        collection: FavoritesCollection::new(),
        migrated: false,
    };

    match read_optional(path) {
        Ok(None) => {
            debug!(path = %path.display(), "No favorites file yet");
            fallback()
        }
        Ok(Some(content)) => match decode_favorites(&content) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Favorites file is malformed, starting empty");
                backup_unreadable(path);
                fallback()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read favorites file, starting empty");
            fallback()
        }
    }
}

pub fn save_favorites(path: &Path, collection: &FavoritesCollection) -> PersistenceResult<()> {
    write_json_atomic(path, collection)
}
