//! Main-loop glue
//!
//! The host calls [`App::tick`] every `poll_interval_ms`. A tick records any
//! new clipboard text and drains whatever the hotkey supervisor reported
//! since the previous tick, so every store mutation stays on the host's
//! thread.

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::config::Config;
use crate::hotkey::{HotkeyCombo, SharedBinder};
use crate::interface::{ClipboardAccess, ClipfolioResult, KeystrokeInjector, Notifier};
use crate::models::PasteTarget;
use crate::persistence::DataPaths;
use crate::store::ClipboardStore;
use crate::supervisor::{HotkeyState, HotkeySupervisor, SupervisorEvent};
use crate::watcher::ClipboardWatcher;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// New clipboard text recorded into history
    pub recorded: Option<String>,
    /// Hotkey presses since the last tick; the host shows its picker for these
    pub triggered: usize,
    /// Latest supervisor state reported during the tick
    pub hotkey_state: Option<HotkeyState>,
}

pub struct App {
    store: ClipboardStore,
    config: Config,
    config_path: Option<PathBuf>,
    watcher: ClipboardWatcher,
    clipboard: Box<dyn ClipboardAccess>,
    injector: Box<dyn KeystrokeInjector>,
    notifier: Box<dyn Notifier>,
    binder: Option<SharedBinder>,
    supervisor: Option<HotkeySupervisor>,
    events: Option<UnboundedReceiver<SupervisorEvent>>,
}

impl App {
    pub fn new(
        store: ClipboardStore,
        config: Config,
        clipboard: Box<dyn ClipboardAccess>,
        injector: Box<dyn KeystrokeInjector>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            config,
            config_path: None,
            watcher: ClipboardWatcher::new(),
            clipboard,
            injector,
            notifier,
            binder: None,
            supervisor: None,
            events: None,
        }
    }

    /// Load config and both stores from `paths`; config changes are saved back there.
    pub fn open(
        paths: &DataPaths,
        clipboard: Box<dyn ClipboardAccess>,
        injector: Box<dyn KeystrokeInjector>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let config = Config::load(&paths.config);
        let store = ClipboardStore::open(paths, &config);
        let mut app = Self::new(store, config, clipboard, injector, notifier);
        app.config_path = Some(paths.config.clone());
        app
    }

    pub fn store(&self) -> &ClipboardStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ClipboardStore {
        &mut self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hotkey_state(&self) -> Option<HotkeyState> {
        self.supervisor.as_ref().map(HotkeySupervisor::state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hotkey
    // ─────────────────────────────────────────────────────────────────────────

    /// Start supervising the configured hotkey with `binder`.
    pub fn start_hotkey(&mut self, binder: SharedBinder) {
        self.binder = Some(binder);
        self.spawn_supervisor();
    }

    fn spawn_supervisor(&mut self) {
        let Some(binder) = self.binder.clone() else {
            return;
        };
        self.stop_supervisor();
        let (supervisor, events) = HotkeySupervisor::start(
            binder,
            self.config.hotkey.clone(),
            self.config.supervisor_config(),
        );
        self.supervisor = Some(supervisor);
        self.events = Some(events);
    }

    fn stop_supervisor(&mut self) {
        if let Some(mut supervisor) = self.supervisor.take() {
            if !supervisor.stop() {
                warn!("Hotkey supervisor was force-stopped");
            }
        }
        self.events = None;
    }

    /// Full recovery: stop the supervisor and start a fresh one.
    pub fn reset_hotkey(&mut self) {
        if self.binder.is_none() {
            return;
        }
        info!(hotkey = %self.config.hotkey, "Resetting hotkey");
        self.spawn_supervisor();
        self.notifier
            .notify("Hotkey reset", &format!("Listening for {}", self.config.hotkey));
    }

    /// Switch to a new combo, save it, and restart the supervisor with it.
    /// Nothing changes unless the new config was saved.
    pub fn change_hotkey(&mut self, combo: &str) -> ClipfolioResult<HotkeyCombo> {
        let combo: HotkeyCombo = combo.parse()?;
        let updated = Config {
            hotkey: combo.clone(),
            ..self.config.clone()
        };
        if let Some(path) = &self.config_path {
            updated.save(path)?;
        }
        self.config = updated;
        info!(hotkey = %combo, "Hotkey changed");
        if self.supervisor.is_some() {
            self.spawn_supervisor();
        }
        Ok(combo)
    }

    pub fn shutdown(&mut self) {
        self.stop_supervisor();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Main loop
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if let Some(text) = self.watcher.poll(self.clipboard.as_mut()) {
            if self.store.on_clipboard_text(&text) {
                report.recorded = Some(text);
            }
        }

        let mut errors = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                match event {
                    SupervisorEvent::Triggered => report.triggered += 1,
                    SupervisorEvent::StateChanged(state) => report.hotkey_state = Some(state),
                    SupervisorEvent::Error(message) => errors.push(message),
                }
            }
        }
        for message in errors {
            warn!(error = %message, "Hotkey supervisor reported an error");
            self.notifier.notify("Hotkey error", &message);
        }

        report
    }

    pub fn paste(&mut self, target: &PasteTarget) -> ClipfolioResult<String> {
        let text = self
            .store
            .paste(target, self.clipboard.as_mut(), self.injector.as_mut())?;
        self.watcher.note_written(&text);
        Ok(text)
    }

    pub fn copy(&mut self, target: &PasteTarget) -> ClipfolioResult<String> {
        let text = self.store.copy(target, self.clipboard.as_mut())?;
        self.watcher.note_written(&text);
        Ok(text)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop_supervisor();
    }
}
