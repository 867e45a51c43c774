//! Session status and shared session state.
//!
//! [`SessionState`] is the one explicitly owned home for everything the
//! frame callback, the auto-commit ticker and the UI share.  Field ownership:
//!
//! | Field            | Writer                          |
//! |------------------|---------------------------------|
//! | `status`         | session manager                 |
//! | `hands`, `chip`  | frame callback                  |
//! | `commit` snapshots / counters | frame callback     |
//! | `commit` text / deadline      | ticker, manual edits |
//!
//! [`SharedState`] is `Arc<Mutex<SessionState>>`.  Lock it for a short
//! critical section; never hold it across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::commit::{Command, CommitMachine};
use crate::config::{AppConfig, CommitMode, PipelineKind};

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a session.
///
/// ```text
/// Idle ──start──▶ Starting ──acquired──▶ Running ──stop──▶ Stopping ──▶ Idle
///                    │
///                    └──failure──▶ Error ──start──▶ Starting
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    /// Resource acquisition failed; the message is user-visible.
    Error(String),
}

impl SessionStatus {
    /// `true` while a transition is in flight.
    ///
    /// ```
    /// use sign_to_text::session::SessionStatus;
    ///
    /// assert!(!SessionStatus::Idle.is_busy());
    /// assert!(SessionStatus::Starting.is_busy());
    /// assert!(!SessionStatus::Running.is_busy());
    /// assert!(SessionStatus::Stopping.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Starting | SessionStatus::Stopping)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Starting => "starting…",
            SessionStatus::Running => "camera started",
            SessionStatus::Stopping => "stopping…",
            SessionStatus::Error(_) => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Chip
// ---------------------------------------------------------------------------

/// Prediction shown over the preview.  Only present when the prediction
/// passes the pipeline's confidence gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Chip {
    pub label: String,
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(SessionStatus),
    Hands(usize),
    Prediction { label: String, confidence: f32 },
    Command(Command),
    Committed(String),
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

pub struct SessionState {
    pub status: SessionStatus,
    pub pipeline: PipelineKind,
    pub mirror: bool,
    /// Hand count reported by the most recent frame.
    pub hands: usize,
    pub chip: Option<Chip>,
    pub commit: CommitMachine,
}

impl SessionState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            status: SessionStatus::Idle,
            pipeline: config.default_pipeline,
            mirror: config.mirror,
            hands: 0,
            chip: None,
            commit: CommitMachine::new(config.commit.clone(), config.default_mode),
        }
    }

    pub fn mode(&self) -> CommitMode {
        self.commit.mode()
    }

    /// Drop per-run data.  Text, pipeline, mode and mirror survive.
    pub fn reset_run(&mut self) {
        self.hands = 0;
        self.chip = None;
        self.commit.reset();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

pub type SharedState = Arc<Mutex<SessionState>>;

pub fn new_shared_state(config: &AppConfig) -> SharedState {
    Arc::new(Mutex::new(SessionState::new(config)))
}

/// Lock `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
