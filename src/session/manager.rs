//! Session lifecycle manager: start, stop, pipeline switch, mode and mirror.
//!
//! # Start
//!
//! ```text
//! start(pipeline)
//!   ├─ capabilities present?        else CapabilityUnavailable
//!   ├─ status Running / busy?       else AlreadyRunning / Busy
//!   ├─ epoch += 1, status = Starting
//!   ├─ camera.acquire().await       ─┐
//!   ├─ models.load().await           │ after every await: epoch moved on?
//!   ├─ FrameProcessor::new           │   stop what we hold, Cancelled
//!   ├─ detector.start(observer)     ─┘
//!   ├─ AutoCommit? spawn ticker
//!   └─ status = Running
//! ```
//!
//! Any failure releases everything acquired so far and leaves the session in
//! `Error(message)`.
//!
//! # Stop
//!
//! `stop` is synchronous and idempotent.  It bumps the epoch first, so frame
//! callbacks and in-flight starts that observe the new epoch become no-ops,
//! then aborts the ticker, stops the detector, and sweeps every remembered
//! track.
//!
//! Lock order is `resources` then `state`; neither guard is held across an
//! `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::classifier::AssetError;
use crate::config::{AppConfig, CommitMode, PipelineKind};

use super::capabilities::{
    CameraConstraints, CameraSource, Capabilities, Capability, CaptureError, DetectorFactory,
    DetectorOptions, HandDetector, MediaStream, ModelProvider,
};
use super::clock::{Clock, TokioClock};
use super::frame::{FramePipeline, FrameProcessor};
use super::registry::{stop_stream, TrackRegistry};
use super::state::{lock, new_shared_state, Chip, SessionEvent, SessionStatus, SharedState};
use super::ticker::spawn_ticker;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} is not available")]
    CapabilityUnavailable(Capability),

    #[error("a session is already running")]
    AlreadyRunning,

    /// A start or stop is still in flight.
    #[error("session is busy ({0})")]
    Busy(&'static str),

    /// A `stop` (or newer `start`) superseded this start while it was
    /// awaiting a resource.
    #[error("start cancelled")]
    Cancelled,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Assets(#[from] AssetError),
}

impl From<Capability> for SessionError {
    fn from(c: Capability) -> Self {
        SessionError::CapabilityUnavailable(c)
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Resources owned by the running session.
#[derive(Default)]
struct Resources {
    detector: Option<Box<dyn HandDetector>>,
    registry: TrackRegistry,
    ticker: Option<JoinHandle<()>>,
    runtime: Option<Handle>,
}

pub struct SessionManager {
    config: AppConfig,
    capabilities: Capabilities,
    state: SharedState,
    clock: Arc<dyn Clock>,
    epoch: Arc<AtomicU64>,
    resources: Mutex<Resources>,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl SessionManager {
    pub fn new(config: AppConfig, capabilities: Capabilities) -> Self {
        let state = new_shared_state(&config);
        Self {
            config,
            capabilities,
            state,
            clock: Arc::new(TokioClock::new()),
            epoch: Arc::new(AtomicU64::new(0)),
            resources: Mutex::new(Resources::default()),
            events: None,
        }
    }

    /// Publish [`SessionEvent`]s on `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn shared_state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    /// Acquire the camera, load `pipeline`'s assets and start detecting.
    pub async fn start(&self, pipeline: PipelineKind) -> Result<(), SessionError> {
        let camera = self.capabilities.camera()?;
        let detectors = self.capabilities.detectors()?;
        let models = self.capabilities.models()?;

        let epoch = {
            let mut st = lock(&self.state);
            if st.status.is_running() {
                return Err(SessionError::AlreadyRunning);
            }
            if st.status.is_busy() {
                return Err(SessionError::Busy(st.status.label()));
            }
            st.pipeline = pipeline;
            st.status = SessionStatus::Starting;
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };
        self.emit(SessionEvent::Status(SessionStatus::Starting));
        log::info!("session: starting {} pipeline", pipeline.label());

        let result = self
            .try_start(epoch, pipeline, camera, detectors, models)
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(SessionError::Cancelled) => {
                log::info!("session: start of {} pipeline cancelled", pipeline.label());
                Err(SessionError::Cancelled)
            }
            Err(e) => {
                // Only the start that still owns the epoch may tear down.
                if self
                    .epoch
                    .compare_exchange(epoch, epoch + 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    log::info!("session: superseded start failed: {e}");
                    return Err(SessionError::Cancelled);
                }
                log::error!("session: start failed: {e}");
                self.release();
                let status = SessionStatus::Error(e.to_string());
                {
                    let mut st = lock(&self.state);
                    st.reset_run();
                    st.status = status.clone();
                }
                self.emit(SessionEvent::Status(status));
                Err(e)
            }
        }
    }

    async fn try_start(
        &self,
        epoch: u64,
        pipeline: PipelineKind,
        camera: Arc<dyn CameraSource>,
        detectors: Arc<dyn DetectorFactory>,
        models: Arc<dyn ModelProvider>,
    ) -> Result<(), SessionError> {
        // ── 1. Camera ────────────────────────────────────────────────────
        let constraints = CameraConstraints::from(&self.config.camera);
        let stream = camera.acquire(&constraints).await?;
        self.adopt_stream(epoch, &stream)?;
        log::debug!("session: camera stream {} acquired", stream.id());

        // ── 2. Assets ────────────────────────────────────────────────────
        let assets = models.load(pipeline).await?;
        self.ensure_current(epoch)?;

        let pipeline_config = self.config.pipeline(pipeline);
        let processor = FrameProcessor::new(pipeline, pipeline_config, &assets)?;

        // ── 3. Detector ──────────────────────────────────────────────────
        let mirror = lock(&self.state).mirror;
        let observer = Arc::new(FramePipeline::new(
            epoch,
            Arc::clone(&self.epoch),
            processor,
            Arc::clone(&self.state),
            Arc::clone(&self.clock),
            self.capabilities.overlay(),
            self.events.clone(),
        ));
        let options = DetectorOptions::for_pipeline(pipeline_config, mirror);
        let mut detector = detectors.create(pipeline)?;
        detector.set_mirror(mirror);
        let runtime = Handle::try_current().ok();

        {
            let mut guard = lock(&self.resources);
            self.ensure_current(epoch)?;
            let res = &mut *guard;
            let detector = res.detector.insert(detector);
            let started = detector.start(Arc::clone(&stream), &options, observer);
            let held = detector.streams();
            for s in &held {
                res.registry.remember(s);
            }
            started?;

            // ── 4. Ticker ────────────────────────────────────────────────
            // Mode is read under the resources lock so a concurrent
            // `set_mode` either sees the detector or is seen here.
            if lock(&self.state).mode() == CommitMode::AutoCommit {
                match &runtime {
                    Some(rt) => res.ticker = Some(self.spawn_ticker(rt)),
                    None => log::warn!("session: no tokio runtime, auto-commit disabled"),
                }
            }
            res.runtime = runtime;
        }

        // ── 5. Running ───────────────────────────────────────────────────
        {
            let mut st = lock(&self.state);
            self.ensure_current(epoch)?;
            st.status = SessionStatus::Running;
        }
        self.emit(SessionEvent::Status(SessionStatus::Running));
        log::info!("session: {} pipeline running", pipeline.label());
        Ok(())
    }

    /// Register a freshly acquired stream, or stop it if the start was
    /// superseded while acquiring.
    fn adopt_stream(&self, epoch: u64, stream: &Arc<dyn MediaStream>) -> Result<(), SessionError> {
        let mut res = lock(&self.resources);
        if !self.is_current(epoch) {
            drop(res);
            log::debug!("session: stream {} arrived after stop, releasing", stream.id());
            stop_stream(stream);
            return Err(SessionError::Cancelled);
        }
        res.registry.remember(stream);
        Ok(())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), SessionError> {
        if self.is_current(epoch) {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }

    fn spawn_ticker(&self, runtime: &Handle) -> JoinHandle<()> {
        spawn_ticker(
            runtime,
            Arc::clone(&self.state),
            Arc::clone(&self.clock),
            Duration::from_millis(self.config.commit.auto_interval_ms),
            self.events.clone(),
        )
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Stop the session and release every resource.  Safe to call when
    /// nothing is running, and safe to call twice.
    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let was = {
            let mut st = lock(&self.state);
            std::mem::replace(&mut st.status, SessionStatus::Stopping)
        };
        if was != SessionStatus::Idle {
            self.emit(SessionEvent::Status(SessionStatus::Stopping));
        }

        let stopped = self.release();

        {
            let mut st = lock(&self.state);
            st.reset_run();
            st.status = SessionStatus::Idle;
        }
        self.emit(SessionEvent::Status(SessionStatus::Idle));
        log::info!("session: stopped ({stopped} track(s) released)");
    }

    /// Abort the ticker, stop the detector and sweep every track.  Returns
    /// the number of tracks stopped.
    fn release(&self) -> usize {
        let stopped = {
            let mut res = lock(&self.resources);
            if let Some(ticker) = res.ticker.take() {
                ticker.abort();
            }
            if let Some(mut detector) = res.detector.take() {
                for s in detector.streams() {
                    res.registry.remember(&s);
                }
                detector.stop();
            }
            res.registry.stop_all()
        };
        if let Some(overlay) = self.capabilities.overlay() {
            overlay.clear();
        }
        stopped
    }

    /// Stop, then start `pipeline`.
    pub async fn switch_pipeline(&self, pipeline: PipelineKind) -> Result<(), SessionError> {
        {
            let st = lock(&self.state);
            if st.status == SessionStatus::Stopping {
                return Err(SessionError::Busy(st.status.label()));
            }
        }
        log::info!("session: switching to {} pipeline", pipeline.label());
        self.stop();
        self.start(pipeline).await
    }

    // -----------------------------------------------------------------------
    // Mode / mirror
    // -----------------------------------------------------------------------

    /// Switch commit mode.  Entering auto-commit while a detector is bound
    /// (running, or a start past its last await) starts the ticker; leaving
    /// it cancels the ticker.
    pub fn set_mode(&self, mode: CommitMode) {
        let now_ms = self.clock.now_ms();
        {
            let mut st = lock(&self.state);
            if st.mode() == mode {
                return;
            }
            st.commit.set_mode(mode, now_ms);
        }
        log::info!("session: commit mode {mode:?}");

        let mut res = lock(&self.resources);
        if let Some(ticker) = res.ticker.take() {
            ticker.abort();
        }
        let auto = lock(&self.state).mode() == CommitMode::AutoCommit;
        if auto && res.detector.is_some() {
            if let Some(rt) = res.runtime.clone() {
                res.ticker = Some(self.spawn_ticker(&rt));
            }
        }
    }

    pub fn set_mirror(&self, mirror: bool) {
        lock(&self.state).mirror = mirror;
        if let Some(detector) = lock(&self.resources).detector.as_mut() {
            detector.set_mirror(mirror);
        }
        if let Some(overlay) = self.capabilities.overlay() {
            overlay.set_mirror(mirror);
        }
    }

    // -----------------------------------------------------------------------
    // Manual text edits
    // -----------------------------------------------------------------------

    pub fn type_space(&self) {
        lock(&self.state).commit.type_space();
    }

    pub fn backspace(&self) {
        lock(&self.state).commit.backspace();
    }

    pub fn clear_text(&self) {
        lock(&self.state).commit.clear_text();
    }

    pub fn set_text(&self, text: impl Into<String>) {
        lock(&self.state).commit.set_text(text);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        lock(&self.state).status.clone()
    }

    pub fn pipeline(&self) -> PipelineKind {
        lock(&self.state).pipeline
    }

    pub fn mode(&self) -> CommitMode {
        lock(&self.state).mode()
    }

    pub fn mirror(&self) -> bool {
        lock(&self.state).mirror
    }

    pub fn hands(&self) -> usize {
        lock(&self.state).hands
    }

    pub fn chip(&self) -> Option<Chip> {
        lock(&self.state).chip.clone()
    }

    pub fn text(&self) -> String {
        lock(&self.state).commit.text().to_string()
    }

    /// Whole seconds until the next auto-commit.
    pub fn countdown_secs(&self) -> u64 {
        let now_ms = self.clock.now_ms();
        lock(&self.state).commit.countdown_secs(now_ms)
    }

    /// Number of tracks currently held.
    pub fn live_tracks(&self) -> usize {
        lock(&self.resources).registry.track_count()
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
