//! Clipfolio Core - clipboard history and favorites
//!
//! A bounded, de-duplicated clipboard history, user-organized favorite
//! folders with undoable deletes, search over both, and a supervisor that
//! keeps a global paste hotkey registered.
//!
//! The OS is reached only through the capability traits in [`interface`]
//! and [`hotkey::HotkeyBinder`]; desktop implementations live behind the
//! `platform` feature.

pub mod app;
pub mod config;
pub mod favorites;
pub mod history;
pub mod hotkey;
pub mod interface;
pub mod models;
pub mod persistence;
#[cfg(feature = "platform")]
pub mod platform;
pub mod search;
mod store;
pub mod supervisor;
pub mod watcher;

pub use app::{App, TickReport};
pub use config::Config;
pub use favorites::{FavoritesCollection, FavoritesStore};
pub use history::HistoryStore;
pub use hotkey::{HotkeyBinder, HotkeyCombo};
pub use interface::*;
pub use models::{FavoriteFolder, ItemRef, PasteTarget};
pub use persistence::DataPaths;
pub use search::SearchEngine;
pub use store::ClipboardStore;
pub use supervisor::{HotkeyState, HotkeySupervisor, SupervisorEvent};
