//! Announcement sequencer: chime, pause, then speech
//!
//! Each dispatch runs `Idle → ChimePlaying → (delay) → SpeechAnnouncing → Idle`
//! on a background task. The chime is fire-and-forget; the delay is measured
//! from chime start and can be cancelled per announcement or for the whole
//! sequencer. Audio failures are logged and never reach the dispatch caller.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use queue_types::{CounterNumber, Department, Token, TokenId, TokenNumber};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::AnnouncementConfig;
use crate::notification::panic_message;

/// Audio side-effect failures. Logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnouncementError {
    #[error("chime playback failed: {0}")]
    Chime(String),

    #[error("speech synthesis failed: {0}")]
    Speech(String),
}

/// Plays the named dispatch sound on the host platform.
#[async_trait::async_trait]
pub trait ChimePlayer: Send + Sync {
    async fn play(&self, asset: &str) -> Result<(), AnnouncementError>;
}

/// Speaks a plain string. Any text-to-speech engine will do.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), AnnouncementError>;
}

// ── Announcement ─────────────────────────────────────────────────────

/// What gets announced for one dispatched token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub token_id: TokenId,
    pub token_number: TokenNumber,
    pub patient_name: String,
    pub department_name: String,
    pub counter: Option<CounterNumber>,
}

impl Announcement {
    pub fn for_token(token: &Token, department: &Department) -> Self {
        Self {
            token_id: token.id,
            token_number: token.token_number,
            patient_name: token.patient_name.clone(),
            department_name: department.name.clone(),
            counter: token.counter,
        }
    }

    /// Spoken text, e.g.
    /// "Token number 103, Jane Doe, please proceed to Laboratory, to counter 10"
    pub fn message(&self) -> String {
        let mut text = format!(
            "Token number {}, {}, please proceed to {}",
            self.token_number, self.patient_name, self.department_name
        );
        if let Some(counter) = self.counter {
            text.push_str(&format!(", to counter {counter}"));
        }
        text
    }
}

/// Where an announcement currently is in its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementPhase {
    Idle,
    ChimePlaying,
    SpeechAnnouncing,
}

/// How an announcement ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementOutcome {
    /// Speech was delivered
    Spoken,
    /// Cancelled before speech (handle cancel, shutdown or teardown)
    Cancelled,
    /// Audio was switched off during the delay
    Suppressed,
    /// The speech engine reported an error
    SpeechFailed(String),
}

// ── Handle ───────────────────────────────────────────────────────────

/// Handle to a scheduled announcement.
///
/// Dropping the handle leaves the announcement running.
pub struct AnnouncementHandle {
    token_id: TokenId,
    phase: Arc<Mutex<AnnouncementPhase>>,
    cancel_tx: mpsc::Sender<()>,
    handle: JoinHandle<AnnouncementOutcome>,
}

impl AnnouncementHandle {
    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    pub fn phase(&self) -> AnnouncementPhase {
        *self.phase.lock()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the pending speech; a no-op once speech has started.
    pub async fn cancel(self) -> AnnouncementOutcome {
        let _ = self.cancel_tx.send(()).await;
        joined(self.token_id, self.handle.await)
    }

    /// Wait for the announcement to finish
    pub async fn wait(self) -> AnnouncementOutcome {
        joined(self.token_id, self.handle.await)
    }
}

/// A panicking task counts as a speech failure; an aborted one as cancelled.
fn joined(token_id: TokenId, result: Result<AnnouncementOutcome, JoinError>) -> AnnouncementOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let message = panic_message(&*e.into_panic());
            warn!(token = %token_id.short(), error = %message, "Announcement task panicked");
            AnnouncementOutcome::SpeechFailed(format!("announcement panicked: {message}"))
        }
        Err(_) => AnnouncementOutcome::Cancelled,
    }
}

/// Owned by the announcement task; resets the phase and releases the
/// in-flight slot however the task ends (finish, panic or abort).
struct TaskGuard {
    phase: Arc<Mutex<AnnouncementPhase>>,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        *self.phase.lock() = AnnouncementPhase::Idle;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Sequencer ────────────────────────────────────────────────────────

/// Drives chime-then-speech announcements for dispatched tokens
pub struct AnnouncementSequencer {
    chime: Arc<dyn ChimePlayer>,
    speech: Arc<dyn SpeechSynthesizer>,
    clock: Arc<dyn Clock>,
    chime_asset: String,
    speech_delay: Duration,
    enabled: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
}

impl AnnouncementSequencer {
    pub fn new(
        config: &AnnouncementConfig,
        chime: Arc<dyn ChimePlayer>,
        speech: Arc<dyn SpeechSynthesizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            chime,
            speech,
            clock,
            chime_asset: config.chime_asset.clone(),
            speech_delay: config.speech_delay(),
            enabled: Arc::new(AtomicBool::new(config.enabled)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            shutdown,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Audio toggle. Switching off also silences announcements still in their delay.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "Audio announcements toggled");
    }

    /// Announcements scheduled and not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Schedule an announcement.
    ///
    /// Returns `None` with no side effects when audio is disabled, the
    /// sequencer is shut down, or there is no tokio runtime to run on.
    pub fn announce(&self, announcement: Announcement) -> Option<AnnouncementHandle> {
        if !self.is_enabled() {
            debug!(token_number = announcement.token_number, "Audio disabled, skipping announcement");
            return None;
        }
        if self.is_shut_down() {
            debug!(token_number = announcement.token_number, "Sequencer shut down, skipping announcement");
            return None;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    token_number = announcement.token_number,
                    "No async runtime available, announcement skipped"
                );
                return None;
            }
        };

        let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
        let mut shutdown_rx = self.shutdown.subscribe();
        let phase = Arc::new(Mutex::new(AnnouncementPhase::Idle));
        let token_id = announcement.token_id;

        let chime = self.chime.clone();
        let speech = self.speech.clone();
        let clock = self.clock.clone();
        let asset = self.chime_asset.clone();
        let delay = self.speech_delay;
        let enabled = self.enabled.clone();
        let task_phase = phase.clone();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = TaskGuard {
            phase: phase.clone(),
            in_flight: self.in_flight.clone(),
        };
        let chime_runtime = runtime.clone();

        let handle = runtime.spawn(async move {
            let _guard = guard;
            let token_number = announcement.token_number;

            *task_phase.lock() = AnnouncementPhase::ChimePlaying;
            chime_runtime.spawn(async move {
                if let Err(e) = chime.play(&asset).await {
                    warn!(token_number, error = %e, "Chime failed");
                }
            });

            let outcome = tokio::select! {
                _ = clock.sleep(delay) => None,
                Some(()) = cancel_rx.recv() => {
                    info!(token_number, "Announcement cancelled");
                    Some(AnnouncementOutcome::Cancelled)
                }
                _ = shutdown_signalled(&mut shutdown_rx) => {
                    info!(token_number, "Announcement cancelled by shutdown");
                    Some(AnnouncementOutcome::Cancelled)
                }
            };

            let outcome = match outcome {
                Some(cancelled) => cancelled,
                None if !enabled.load(Ordering::SeqCst) => {
                    debug!(token_number, "Audio disabled during delay, speech suppressed");
                    AnnouncementOutcome::Suppressed
                }
                None => {
                    *task_phase.lock() = AnnouncementPhase::SpeechAnnouncing;
                    let text = announcement.message();
                    match speech.speak(&text).await {
                        Ok(()) => {
                            debug!(token_number, "Announcement spoken");
                            AnnouncementOutcome::Spoken
                        }
                        Err(e) => {
                            warn!(token_number, error = %e, "Speech failed");
                            AnnouncementOutcome::SpeechFailed(e.to_string())
                        }
                    }
                }
            };

            outcome
        });

        Some(AnnouncementHandle {
            token_id,
            phase,
            cancel_tx,
            handle,
        })
    }

    /// Cancel every pending delay and refuse new announcements
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        info!(pending = self.in_flight(), "Announcement sequencer shut down");
    }
}

/// Resolves once shutdown is requested or the sequencer is dropped
async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

// ── Host defaults ────────────────────────────────────────────────────

/// Chime player for hosts without audio output
#[derive(Debug, Default)]
pub struct SilentChime;

#[async_trait::async_trait]
impl ChimePlayer for SilentChime {
    async fn play(&self, asset: &str) -> Result<(), AnnouncementError> {
        debug!(asset, "Chime (silent)");
        Ok(())
    }
}

/// Speech output that writes the announcement to the log
#[derive(Debug, Default)]
pub struct TracingSpeech;

#[async_trait::async_trait]
impl SpeechSynthesizer for TracingSpeech {
    async fn speak(&self, text: &str) -> Result<(), AnnouncementError> {
        info!(announcement = text, "Announcement");
        Ok(())
    }
}

// ── Test doubles ─────────────────────────────────────────────────────

/// Mock chime player that records each play.
pub struct MockChimePlayer {
    plays: Mutex<Vec<(String, tokio::time::Instant)>>,
    simulate_error: bool,
}

impl MockChimePlayer {
    pub fn new() -> Self {
        Self {
            plays: Mutex::new(Vec::new()),
            simulate_error: false,
        }
    }

    /// A player whose every play fails (after being recorded)
    pub fn failing() -> Self {
        Self {
            plays: Mutex::new(Vec::new()),
            simulate_error: true,
        }
    }

    pub fn plays(&self) -> Vec<String> {
        self.plays.lock().iter().map(|(a, _)| a.clone()).collect()
    }

    pub fn played_at(&self) -> Vec<tokio::time::Instant> {
        self.plays.lock().iter().map(|(_, at)| *at).collect()
    }
}

impl Default for MockChimePlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChimePlayer for MockChimePlayer {
    async fn play(&self, asset: &str) -> Result<(), AnnouncementError> {
        self.plays
            .lock()
            .push((asset.to_string(), tokio::time::Instant::now()));
        if self.simulate_error {
            return Err(AnnouncementError::Chime("simulated error".to_string()));
        }
        Ok(())
    }
}

/// Mock speech synthesizer that records each utterance.
pub struct MockSpeechSynthesizer {
    spoken: Mutex<Vec<(String, tokio::time::Instant)>>,
    simulate_error: bool,
}

impl MockSpeechSynthesizer {
    pub fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            simulate_error: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            simulate_error: true,
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn spoken_at(&self) -> Vec<tokio::time::Instant> {
        self.spoken.lock().iter().map(|(_, at)| *at).collect()
    }
}

impl Default for MockSpeechSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), AnnouncementError> {
        self.spoken
            .lock()
            .push((text.to_string(), tokio::time::Instant::now()));
        if self.simulate_error {
            return Err(AnnouncementError::Speech("simulated error".to_string()));
        }
        Ok(())
    }
}
