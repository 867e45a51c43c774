//! Per-frame chain: detector frame → text edits.
//!
//! ```text
//! on_frame(LandmarkFrame)
//!   ├─ stale epoch? ──▶ drop
//!   ├─ FrameProcessor: Normalizer → ClassifierAdapter → TemporalStabilizer
//!   ├─ overlay: clear, draw hand
//!   └─ SessionState: hands, chip, CommitMachine::observe
//! ```
//!
//! [`FrameProcessor`] is the synchronous, state-owning part and can be driven
//! directly.  [`FramePipeline`] adapts it to the detector's
//! [`FrameObserver`] contract.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::classifier::{ClassifierAdapter, LabelSet, PipelineAssets};
use crate::commit::BLANK_LABEL;
use crate::config::{PipelineConfig, PipelineKind};
use crate::landmarks::{LandmarkFrame, Normalizer};
use crate::stabilizer::TemporalStabilizer;

use super::capabilities::{FrameObserver, Overlay};
use super::clock::Clock;
use super::manager::SessionError;
use super::state::{lock, Chip, SessionEvent, SharedState};

// ---------------------------------------------------------------------------
// FrameProcessor
// ---------------------------------------------------------------------------

/// Stabilized result for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub hands: usize,
    /// `(label, confidence)`; `None` when there was no hand, the frame was
    /// rejected, or the classifier produced a blank prediction.
    pub prediction: Option<(String, f32)>,
}

/// The Normalizer + Adapter + Stabilizer bound to one pipeline.
pub struct FrameProcessor {
    pipeline: PipelineKind,
    gate: f32,
    normalizer: Normalizer,
    adapter: ClassifierAdapter,
    stabilizer: TemporalStabilizer,
    labels: LabelSet,
}

impl FrameProcessor {
    /// Bind `assets` for `pipeline`, negotiating the model's input contract.
    ///
    /// A model that accepts no input convention does not fail the bind: the
    /// processor still tracks hands but every prediction is blank.
    pub fn new(
        pipeline: PipelineKind,
        config: &PipelineConfig,
        assets: &PipelineAssets,
    ) -> Result<Self, SessionError> {
        let normalizer = assets.normalizer(config)?;
        let feature_len = normalizer.feature_len();
        let model = Arc::clone(&assets.model);
        let adapter = match ClassifierAdapter::negotiate(
            Arc::clone(&model),
            feature_len,
            &config.sequence_lengths,
            config.ema_alpha,
        ) {
            Ok(adapter) => adapter,
            Err(e) => {
                log::warn!("classifier: {e}; predictions will be blank");
                ClassifierAdapter::unbound(model, feature_len, config.ema_alpha)
            }
        };
        if let Some(contract) = adapter.contract() {
            if contract.output_len() != assets.labels.len() {
                log::warn!(
                    "classifier: model has {} classes but {} labels",
                    contract.output_len(),
                    assets.labels.len()
                );
            }
        }
        log::info!(
            "session: bound {} pipeline ({} features, {} labels, input {:?})",
            pipeline.label(),
            feature_len,
            assets.labels.len(),
            adapter.contract().map(|c| c.dims())
        );
        Ok(Self {
            pipeline,
            gate: config.confidence_gate,
            normalizer,
            adapter,
            stabilizer: TemporalStabilizer::new(config.smoothing_window),
            labels: assets.labels.clone(),
        })
    }

    pub fn pipeline(&self) -> PipelineKind {
        self.pipeline
    }

    pub fn gate(&self) -> f32 {
        self.gate
    }

    pub fn process(&mut self, frame: &LandmarkFrame) -> FrameOutcome {
        let hands = frame.hand_count();
        self.stabilizer.set_hands(hands);

        let Some(features) = self.normalizer.normalize_frame(frame) else {
            return FrameOutcome {
                hands,
                prediction: None,
            };
        };

        let classification = match self.adapter.classify(&features) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("session: frame rejected: {e}");
                return FrameOutcome {
                    hands,
                    prediction: None,
                };
            }
        };

        let prediction = self
            .stabilizer
            .observe(&classification)
            .map(|p| (self.labels.name(p.index), p.confidence));
        FrameOutcome { hands, prediction }
    }

    pub fn reset(&mut self) {
        self.adapter.reset();
        self.stabilizer.reset();
    }
}

// ---------------------------------------------------------------------------
// FramePipeline
// ---------------------------------------------------------------------------

/// [`FrameObserver`] for one running session.
///
/// Frames delivered after the session's epoch has moved on (stop, or a newer
/// start) are dropped without touching shared state.
pub struct FramePipeline {
    epoch: u64,
    current_epoch: Arc<AtomicU64>,
    processor: Mutex<FrameProcessor>,
    state: SharedState,
    clock: Arc<dyn Clock>,
    overlay: Option<Arc<dyn Overlay>>,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl FramePipeline {
    pub fn new(
        epoch: u64,
        current_epoch: Arc<AtomicU64>,
        processor: FrameProcessor,
        state: SharedState,
        clock: Arc<dyn Clock>,
        overlay: Option<Arc<dyn Overlay>>,
        events: Option<UnboundedSender<SessionEvent>>,
    ) -> Self {
        Self {
            epoch,
            current_epoch,
            processor: Mutex::new(processor),
            state,
            clock,
            overlay,
            events,
        }
    }

    fn is_current(&self) -> bool {
        self.current_epoch.load(Ordering::SeqCst) == self.epoch
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

impl FrameObserver for FramePipeline {
    fn on_frame(&self, frame: LandmarkFrame) {
        if !self.is_current() {
            return;
        }

        let (outcome, pipeline, gate) = {
            let mut processor = lock(&self.processor);
            (
                processor.process(&frame),
                processor.pipeline(),
                processor.gate(),
            )
        };
        let now_ms = self.clock.now_ms();

        let (label, confidence) = outcome
            .prediction
            .clone()
            .unwrap_or_else(|| (BLANK_LABEL.to_string(), 0.0));
        let chip = (outcome.prediction.is_some() && confidence >= gate).then(|| Chip {
            label: label.clone(),
            confidence,
        });

        if let Some(overlay) = &self.overlay {
            overlay.clear();
            if let Some(hand) = frame.primary() {
                overlay.draw_hand(hand, chip.as_ref());
            }
        }

        let fired = {
            let mut st = lock(&self.state);
            // Re-check under the lock: stop() bumps the epoch before it
            // resets state.
            if !self.is_current() || !st.status.is_running() {
                return;
            }
            st.hands = outcome.hands;
            st.chip = chip;
            st.commit.observe(pipeline, gate, &label, confidence, now_ms)
        };

        log::debug!(
            "session: frame t={} hands={} {label} {confidence:.3}",
            frame.timestamp_ms,
            outcome.hands
        );
        self.emit(SessionEvent::Hands(outcome.hands));
        self.emit(SessionEvent::Prediction { label, confidence });
        if let Some(cmd) = fired {
            self.emit(SessionEvent::Command(cmd));
        }
    }
}
