//! Clipfolio Public Interface Definition
//!
//! Shared records, the crate error type, and the capabilities the core
//! consumes from its host (clipboard, keystroke injection, notifications,
//! confirmation prompts). Hosts implement the traits; the core never talks
//! to the OS directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hotkey::HotkeyError;
use crate::persistence::PersistenceError;

/// Name of the reserved folder that always exists.
pub const DEFAULT_FOLDER: &str = "default";

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Subset of the stores a search query is restricted to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// History followed by every folder
    #[default]
    All,
    HistoryOnly,
    /// The folder currently selected in the store
    CurrentFolder,
    AllFolders,
    Folder(String),
}

/// Where a search hit came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchSource {
    History,
    Folder(String),
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchSource::History => f.write_str("history"),
            SearchSource::Folder(name) => write!(f, "folder:{}", name),
        }
    }
}

/// Which field of the candidate produced the hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedField {
    Text,
    Description,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A saved favorite: the text to paste and an optional note about it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub text: String,
    #[serde(default)]
    pub description: String,
}

impl FavoriteItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: String::new(),
        }
    }

    pub fn with_description(text: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description: description.into(),
        }
    }
}

/// Flags controlling how a query is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub use_regex: bool,
    pub case_sensitive: bool,
    pub whole_word: bool,
}

/// A highlight range (start, end) in character offsets of the matched field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: u64,
    pub end: u64,
}

/// A single search result. Transient, recomputed per query.
///
/// `index` is the position of the entry inside its source at query time, so
/// callers can route mutations back through the owning store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub source: SearchSource,
    pub index: usize,
    pub text: String,
    pub description: String,
    pub matched_field: MatchedField,
    pub highlights: Vec<HighlightRange>,
}

impl SearchHit {
    /// `"history"` or `"folder:<name>"`
    pub fn source_label(&self) -> String {
        self.source.to_string()
    }
}

/// Search results plus an optional soft warning.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    /// Set when a regex query failed to compile and literal matching was used instead
    pub regex_error: Option<String>,
}

/// Error type for Clipfolio operations
#[derive(Debug, Error)]
pub enum ClipfolioError {
    #[error("No entry at index {index} (length {len})")]
    InvalidIndex { index: usize, len: usize },
    #[error("Folder not found: {0}")]
    FolderNotFound(String),
    #[error("Folder already exists: {0}")]
    FolderExists(String),
    #[error("The default folder cannot be {0}")]
    ReservedFolder(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

pub type ClipfolioResult<T> = Result<T, ClipfolioError>;

// ═══════════════════════════════════════════════════════════════════════════════
// HOST CAPABILITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Read/write access to the system clipboard's text flavor.
pub trait ClipboardAccess {
    /// Current clipboard text. Non-text content reads as an empty string.
    fn read_text(&mut self) -> ClipfolioResult<String>;

    fn write_text(&mut self, text: &str) -> ClipfolioResult<()>;
}

/// Simulates the platform paste shortcut in the previously focused application.
pub trait KeystrokeInjector {
    fn send_paste_keystroke(&mut self) -> ClipfolioResult<()>;
}

/// Passive status surface (tray balloon, toast, status line).
pub trait Notifier {
    fn notify(&self, title: &str, message: &str);
}

/// Asks the user to confirm a destructive follow-up action.
pub trait ConfirmPrompt {
    /// Called when a delete leaves a non-default folder empty.
    fn confirm_delete_empty_folder(&self, folder: &str) -> bool;
}

/// Confirmation policy that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn confirm_delete_empty_folder(&self, _folder: &str) -> bool {
        self.0
    }
}
