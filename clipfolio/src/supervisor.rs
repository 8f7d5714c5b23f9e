//! Hotkey Supervisor - keeps one global hotkey binding alive
//!
//! State machine:
//!
//! ```text
//! Unregistered --bind ok--> Registered --heartbeat: dead--> Degraded
//!      |                        ^                              |
//!      | bind err               | bind ok                      | bind err
//!      v                        |                              v
//!  Retrying{n} ---backoff, rebind-----------------------> Retrying{n+1}
//!      |
//!      | n > max_retries
//!      v
//!    Failed (task ends, Error event)
//! ```
//!
//! Transitions are driven only by results of [`HotkeyBinder`] calls. The
//! supervisor never touches the stores; it reports `Triggered`, state changes
//! and errors over an unbounded channel that the main loop drains.
//!
//! Stop is cooperative through a `CancellationToken`, bounded by
//! `stop_grace`. A task still running after the grace period is aborted and
//! any binding it left behind is released.

use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::hotkey::{HotkeyCallback, HotkeyCombo, HotkeyHandle, SharedBinder};

/// Runtime for supervisors started outside any tokio runtime (plain threads,
/// GUI main loops). Shared by all supervisors and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("clipfolio-hotkey")
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyState {
    Unregistered,
    Registered,
    /// Heartbeat found the binding dead; a rebind is about to be attempted
    Degraded,
    /// `attempt` failed binds so far, waiting out the backoff
    Retrying { attempt: u32 },
    /// Retry ceiling exceeded; only a full reset recovers
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Triggered,
    StateChanged(HotkeyState),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub heartbeat: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub stop_grace: Duration,
    /// Re-register on every heartbeat even when the binding looks alive
    pub refresh_on_heartbeat: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(60),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_millis(8000),
            stop_grace: Duration::from_millis(1000),
            refresh_on_heartbeat: false,
        }
    }
}

/// Delay before retry number `attempt` (1-based): doubles from `base`, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(max)
}

/// Set once by the task on exit so a synchronous caller can wait on it.
#[derive(Default)]
struct DoneSignal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl DoneSignal {
    fn set(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.done.lock()
    }

    /// Wait up to `timeout`; true when the signal was set in time.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.cond.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }
}

/// State shared between the handle and the background task
struct Shared {
    binder: SharedBinder,
    state: Mutex<HotkeyState>,
    live: Mutex<Option<HotkeyHandle>>,
    events: UnboundedSender<SupervisorEvent>,
    done: DoneSignal,
}

impl Shared {
    fn set_state(&self, next: HotkeyState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = ?*state, to = ?next, "Hotkey state change");
            *state = next;
            let _ = self.events.send(SupervisorEvent::StateChanged(next));
        }
    }

    fn bind(&self, combo: &HotkeyCombo, callback: &HotkeyCallback) -> Result<(), String> {
        let handle = self
            .binder
            .lock()
            .bind(combo, Arc::clone(callback))
            .map_err(|e| e.to_string())?;
        *self.live.lock() = Some(handle);
        Ok(())
    }

    // The task never holds `live` while locking `binder`.
    fn release(&self) {
        let handle = self.live.lock().take();
        if let Some(handle) = handle {
            self.binder.lock().unbind(handle);
        }
    }

    fn live_is_alive(&self) -> bool {
        let handle = *self.live.lock();
        match handle {
            Some(handle) => self.binder.lock().is_alive(handle),
            None => false,
        }
    }
}

/// Owner handle for one supervised binding. Dropping it stops the supervisor.
pub struct HotkeySupervisor {
    combo: HotkeyCombo,
    config: SupervisorConfig,
    shared: Arc<Shared>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HotkeySupervisor {
    /// Spawn the supervisor task and return its handle plus the event stream.
    pub fn start(
        binder: SharedBinder,
        combo: HotkeyCombo,
        config: SupervisorConfig,
    ) -> (Self, UnboundedReceiver<SupervisorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            binder,
            state: Mutex::new(HotkeyState::Unregistered),
            live: Mutex::new(None),
            events: tx,
            done: DoneSignal::default(),
        });
        let token = CancellationToken::new();

        info!(hotkey = %combo, "Starting hotkey supervisor");
        let task = runtime_handle().spawn(supervise(
            Arc::clone(&shared),
            combo.clone(),
            config.clone(),
            token.clone(),
        ));

        let supervisor = Self {
            combo,
            config,
            shared,
            token,
            task: Some(task),
        };
        (supervisor, rx)
    }

    pub fn state(&self) -> HotkeyState {
        *self.shared.state.lock()
    }

    pub fn combo(&self) -> &HotkeyCombo {
        &self.combo
    }

    /// True until the task has exited (stopped or failed).
    pub fn is_running(&self) -> bool {
        self.task.is_some() && !self.shared.done.is_set()
    }

    /// Stop the task: cancel, wait up to `stop_grace`, then abort. Returns
    /// false when the task had to be force-terminated. Calling it again is a
    /// no-op that returns true.
    ///
    /// Must not be called from inside a current-thread runtime that is also
    /// driving the task; the wait would always time out.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return true;
        };

        self.token.cancel();
        if self.shared.done.wait(self.config.stop_grace) {
            debug!(hotkey = %self.combo, "Hotkey supervisor stopped");
            return true;
        }

        warn!(
            hotkey = %self.combo,
            grace_ms = self.config.stop_grace.as_millis() as u64,
            "Hotkey supervisor did not stop in time, aborting"
        );
        task.abort();
        // The task may still hold the binder; only release if it is free.
        if let Some(mut binder) = self.shared.binder.try_lock() {
            if let Some(handle) = self.shared.live.lock().take() {
                binder.unbind(handle);
            }
        }
        self.shared.set_state(HotkeyState::Unregistered);
        false
    }
}

impl Drop for HotkeySupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep unless cancelled first; false when cancelled.
async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Bind until success or the retry ceiling. Returns false when the task should end.
async fn bind_with_retry(
    shared: &Shared,
    combo: &HotkeyCombo,
    callback: &HotkeyCallback,
    config: &SupervisorConfig,
    token: &CancellationToken,
) -> bool {
    let mut failures = 0u32;
    loop {
        if token.is_cancelled() {
            return false;
        }
        match shared.bind(combo, callback) {
            Ok(()) => {
                info!(hotkey = %combo, "Hotkey registered");
                shared.set_state(HotkeyState::Registered);
                return true;
            }
            Err(e) => {
                failures += 1;
                if failures > config.max_retries {
                    error!(hotkey = %combo, attempts = failures, error = %e, "Giving up on hotkey registration");
                    shared.set_state(HotkeyState::Failed);
                    let _ = shared.events.send(SupervisorEvent::Error(format!(
                        "Hotkey {} could not be registered after {} attempts: {}",
                        combo, failures, e
                    )));
                    return false;
                }
                let delay = backoff_delay(failures, config.retry_base_delay, config.retry_max_delay);
                warn!(
                    hotkey = %combo,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Hotkey registration failed, retrying"
                );
                shared.set_state(HotkeyState::Retrying { attempt: failures });
                if !sleep_or_cancel(token, delay).await {
                    return false;
                }
            }
        }
    }
}

async fn supervise(
    shared: Arc<Shared>,
    combo: HotkeyCombo,
    config: SupervisorConfig,
    token: CancellationToken,
) {
    let events = shared.events.clone();
    let trigger_token = token.clone();
    let callback: HotkeyCallback = Arc::new(move || {
        if !trigger_token.is_cancelled() {
            let _ = events.send(SupervisorEvent::Triggered);
        }
    });

    let mut running = bind_with_retry(&shared, &combo, &callback, &config, &token).await;
    while running {
        if !sleep_or_cancel(&token, config.heartbeat).await {
            break;
        }

        if !shared.live_is_alive() {
            warn!(hotkey = %combo, "Hotkey binding lost");
            shared.set_state(HotkeyState::Degraded);
            shared.release();
            running = bind_with_retry(&shared, &combo, &callback, &config, &token).await;
        } else if config.refresh_on_heartbeat {
            debug!(hotkey = %combo, "Refreshing hotkey binding");
            shared.release();
            if let Err(e) = shared.bind(&combo, &callback) {
                warn!(hotkey = %combo, error = %e, "Hotkey refresh failed");
                shared.set_state(HotkeyState::Degraded);
                running = bind_with_retry(&shared, &combo, &callback, &config, &token).await;
            }
        }
    }

    shared.release();
    if *shared.state.lock() != HotkeyState::Failed {
        shared.set_state(HotkeyState::Unregistered);
    }
    shared.done.set();
}
