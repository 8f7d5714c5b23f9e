//! Clipboard change detection for the fixed-interval poll.

use tracing::{debug, warn};

use crate::interface::ClipboardAccess;

/// Remembers the last clipboard text seen so each poll reports only changes.
#[derive(Debug, Default)]
pub struct ClipboardWatcher {
    last_text: Option<String>,
}

impl ClipboardWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the clipboard and return its text if it changed since the last poll.
    ///
    /// The first poll only records a baseline: whatever was on the clipboard at
    /// launch is not treated as a copy. Empty text and read errors report nothing.
    pub fn poll(&mut self, clipboard: &mut dyn ClipboardAccess) -> Option<String> {
        let text = match clipboard.read_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Clipboard read failed");
                return None;
            }
        };

        let Some(last) = self.last_text.as_deref() else {
            debug!(chars = text.chars().count(), "Clipboard baseline recorded");
            self.last_text = Some(text);
            return None;
        };

        if text == last {
            return None;
        }
        self.last_text = Some(text.clone());
        (!text.is_empty()).then_some(text)
    }

    /// Treat `text` as already seen, e.g. after writing it to the clipboard ourselves.
    pub fn note_written(&mut self, text: &str) {
        self.last_text = Some(text.to_string());
    }
}
