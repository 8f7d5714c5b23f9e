//! Core data models for Clipfolio
//!
//! Value types owned by the stores. History entries are plain `String`s
//! (identity is exact string equality), so only the favorites side needs
//! dedicated records here.

use chrono::{DateTime, TimeDelta, Utc};

use crate::interface::FavoriteItem;

/// Characters shown per row in list views before truncation
pub const PREVIEW_MAX_CHARS: usize = 50;

// ─────────────────────────────────────────────────────────────────────────────
// FAVORITES
// ─────────────────────────────────────────────────────────────────────────────

/// A named, ordered folder of favorites. Item order is user-controlled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteFolder {
    pub name: String,
    pub items: Vec<FavoriteItem>,
}

impl FavoriteFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(name: impl Into<String>, items: Vec<FavoriteItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.items.iter().any(|item| item.text == text)
    }
}

/// Undo record for a favorite deletion: enough to put the item back where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRecord {
    pub folder: String,
    pub item: FavoriteItem,
    pub position: usize,
    pub deleted_at: DateTime<Utc>,
}

impl DeletionRecord {
    pub fn new(folder: impl Into<String>, item: FavoriteItem, position: usize) -> Self {
        Self {
            folder: folder.into(),
            item,
            position,
            deleted_at: Utc::now(),
        }
    }

    /// Time since the deletion
    pub fn age(&self) -> TimeDelta {
        Utc::now().signed_duration_since(self.deleted_at)
    }
}

/// Address of a favorite: folder name plus position inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub folder: String,
    pub index: usize,
}

impl ItemRef {
    pub fn new(folder: impl Into<String>, index: usize) -> Self {
        Self {
            folder: folder.into(),
            index,
        }
    }
}

/// What the user picked to copy or paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteTarget {
    History(usize),
    Favorite(ItemRef),
}

// ─────────────────────────────────────────────────────────────────────────────
// LIST DISPLAY
// ─────────────────────────────────────────────────────────────────────────────

/// Single-line preview: newlines become spaces, carriage returns are dropped,
/// and anything past `max_chars` is cut and suffixed with "...".
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();

    if flat.chars().count() > max_chars {
        let mut cut: String = flat.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    } else {
        flat
    }
}

/// 1-based numbered preview labels, as shown in the history and folder lists.
pub fn numbered_labels<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, preview_text(text, PREVIEW_MAX_CHARS)))
        .collect()
}
