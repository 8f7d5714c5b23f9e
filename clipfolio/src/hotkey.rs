//! Global hotkey combos and the binder capability
//!
//! A combo is written as `+`-joined tokens, case-insensitive, in any order:
//! `"ctrl+alt+z"`, `"Shift+Win+F5"`. It needs at least one modifier and
//! exactly one key. The normalized form lists modifiers alphabetically and
//! then the key, all lowercase, so `"Ctrl+Alt+Z"` becomes `"alt+ctrl+z"`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("Invalid hotkey '{0}'")]
    Parse(String),
    #[error("Failed to bind hotkey: {0}")]
    Bind(String),
}

pub type HotkeyResult<T> = Result<T, HotkeyError>;

/// Modifier keys. Variant order is the normalized token order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    Alt,
    Ctrl,
    Shift,
    Win,
}

impl Modifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "alt" | "option" => Some(Modifier::Alt),
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "shift" => Some(Modifier::Shift),
            "win" | "super" | "meta" | "cmd" | "command" => Some(Modifier::Win),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Alt => "alt",
            Modifier::Ctrl => "ctrl",
            Modifier::Shift => "shift",
            Modifier::Win => "win",
        }
    }
}

fn normalize_key(token: &str) -> Option<String> {
    let key = match token {
        "return" => "enter",
        "escape" => "esc",
        "del" => "delete",
        "ins" => "insert",
        "pgup" => "pageup",
        "pgdn" => "pagedown",
        other => other,
    };
    let valid = match key {
        "space" | "enter" | "tab" | "esc" | "backspace" | "delete" | "insert" | "home"
        | "end" | "pageup" | "pagedown" | "up" | "down" | "left" | "right" => true,
        s if s.chars().count() == 1 => s.chars().all(|c| c.is_ascii_alphanumeric()),
        s if s.starts_with('f') => s[1..]
            .parse::<u8>()
            .map(|n| (1..=24).contains(&n))
            .unwrap_or(false),
        _ => false,
    };
    valid.then(|| key.to_string())
}

/// A parsed global key combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HotkeyCombo {
    modifiers: BTreeSet<Modifier>,
    key: String,
}

impl HotkeyCombo {
    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.modifiers.iter().copied()
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl FromStr for HotkeyCombo {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || HotkeyError::Parse(s.to_string());
        let mut modifiers = BTreeSet::new();
        let mut key = None;

        for raw in s.split('+') {
            let token = raw.trim().to_lowercase();
            if token.is_empty() {
                return Err(err());
            }
            if let Some(modifier) = Modifier::parse(&token) {
                modifiers.insert(modifier);
                continue;
            }
            let normalized = normalize_key(&token).ok_or_else(err)?;
            if key.replace(normalized).is_some() {
                return Err(err());
            }
        }

        match key {
            Some(key) if !modifiers.is_empty() => Ok(Self { modifiers, key }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for HotkeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        f.write_str(&self.key)
    }
}

impl TryFrom<String> for HotkeyCombo {
    type Error = HotkeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HotkeyCombo> for String {
    fn from(combo: HotkeyCombo) -> Self {
        combo.to_string()
    }
}

impl Default for HotkeyCombo {
    fn default() -> Self {
        Self {
            modifiers: [Modifier::Alt, Modifier::Ctrl].into_iter().collect(),
            key: "z".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BINDER CAPABILITY
// ─────────────────────────────────────────────────────────────────────────────

/// Invoked on the binder's thread each time the combo fires.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync>;

/// Opaque token for a live registration, issued by a [`HotkeyBinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyHandle(pub u64);

/// OS-level global hotkey registration.
pub trait HotkeyBinder: Send + 'static {
    fn bind(&mut self, combo: &HotkeyCombo, callback: HotkeyCallback) -> HotkeyResult<HotkeyHandle>;

    fn unbind(&mut self, handle: HotkeyHandle);

    /// Whether the registration behind `handle` still delivers events.
    fn is_alive(&self, handle: HotkeyHandle) -> bool;
}

/// A binder shared between the supervisor task and whoever recreates it.
pub type SharedBinder = Arc<Mutex<Box<dyn HotkeyBinder>>>;

pub fn shared_binder<B: HotkeyBinder>(binder: B) -> SharedBinder {
    let boxed: Box<dyn HotkeyBinder> = Box::new(binder);
    Arc::new(Mutex::new(boxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_order_and_case() {
        let combo: HotkeyCombo = "Ctrl+Alt+Z".parse().unwrap();
        assert_eq!(combo.to_string(), "alt+ctrl+z");
        assert_eq!(combo.key(), "z");
        assert!(combo.has_modifier(Modifier::Ctrl));
        assert!(!combo.has_modifier(Modifier::Shift));
    }

    #[test]
    fn test_parse_aliases() {
        let combo: HotkeyCombo = "control + option + return".parse().unwrap();
        assert_eq!(combo.to_string(), "alt+ctrl+enter");
        let combo: HotkeyCombo = "cmd+shift+F12".parse().unwrap();
        assert_eq!(combo.to_string(), "shift+win+f12");
    }

    #[test]
    fn test_parse_rejects_bad_combos() {
        for bad in ["", "z", "ctrl+alt", "ctrl+a+b", "ctrl++z", "ctrl+f25", "ctrl+hyper"] {
            assert!(
                matches!(bad.parse::<HotkeyCombo>(), Err(HotkeyError::Parse(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_repeated_modifier_collapses() {
        let combo: HotkeyCombo = "ctrl+control+v".parse().unwrap();
        assert_eq!(combo.to_string(), "ctrl+v");
    }

    #[test]
    fn test_default_combo() {
        assert_eq!(HotkeyCombo::default(), "ctrl+alt+z".parse().unwrap());
    }

    #[test]
    fn test_serde_as_string() {
        let combo: HotkeyCombo = serde_json::from_str(r#""shift+ctrl+1""#).unwrap();
        assert_eq!(serde_json::to_string(&combo).unwrap(), r#""ctrl+shift+1""#);
        assert!(serde_json::from_str::<HotkeyCombo>(r#""nope""#).is_err());
    }
}
