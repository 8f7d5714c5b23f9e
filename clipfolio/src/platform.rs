//! Desktop implementations of the host capabilities (feature `platform`)

use std::thread;
use std::time::Duration;

use arboard::Clipboard;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use tracing::{debug, info};

use crate::interface::{ClipboardAccess, ClipfolioError, ClipfolioResult, KeystrokeInjector, Notifier};

/// System clipboard through `arboard`
pub struct ArboardClipboard {
    clipboard: Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> ClipfolioResult<Self> {
        let clipboard = Clipboard::new().map_err(|e| ClipfolioError::Clipboard(e.to_string()))?;
        Ok(Self { clipboard })
    }
}

impl ClipboardAccess for ArboardClipboard {
    fn read_text(&mut self) -> ClipfolioResult<String> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(text),
            // Images, files and an empty clipboard read as no text
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(ClipfolioError::Clipboard(e.to_string())),
        }
    }

    fn write_text(&mut self, text: &str) -> ClipfolioResult<()> {
        self.clipboard
            .set_text(text)
            .map_err(|e| ClipfolioError::Clipboard(e.to_string()))
    }
}

/// Sends Ctrl+V (Cmd+V on macOS) through `enigo` after a short settle delay.
pub struct EnigoInjector {
    delay: Duration,
}

impl EnigoInjector {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl KeystrokeInjector for EnigoInjector {
    fn send_paste_keystroke(&mut self) -> ClipfolioResult<()> {
        thread::sleep(self.delay);

        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| ClipfolioError::Clipboard(format!("Keystroke injection unavailable: {}", e)))?;

        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        let to_err = |e: enigo::InputError| ClipfolioError::Clipboard(format!("Paste keystroke failed: {}", e));
        enigo.key(modifier, Direction::Press).map_err(to_err)?;
        let click = enigo.key(Key::Unicode('v'), Direction::Click).map_err(to_err);
        enigo.key(modifier, Direction::Release).map_err(to_err)?;
        click?;

        debug!("Sent paste keystroke");
        Ok(())
    }
}

/// Notifier that writes to the log; for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title, "{}", message);
    }
}
