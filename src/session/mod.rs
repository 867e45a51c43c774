//! Session lifecycle: camera, detector, per-frame chain and auto-commit.
//!
//! # Architecture
//!
//! ```text
//!            Capabilities (camera, detectors, models, overlay)
//!                 │
//!                 ▼
//! SessionManager::start ──▶ HandDetector ──on_frame──▶ FramePipeline
//!        │                                               │
//!        │                     Normalizer → Adapter → Stabilizer
//!        │                                               │
//!        ├─ ticker (AutoCommit) ──tick──┐                 ▼
//!        │                             SharedState (Arc<Mutex<SessionState>>)
//!        └─ stop: epoch += 1, abort ticker, stop detector, sweep tracks
//! ```
//!
//! The UI reads [`SharedState`] (or subscribes to [`SessionEvent`]s) and
//! calls back into [`SessionManager`] for start/stop, mode, mirror and manual
//! text edits.

pub mod capabilities;
pub mod clock;
pub mod frame;
pub mod manager;
pub mod registry;
pub mod state;
pub mod ticker;

#[cfg(test)]
pub mod fakes;

pub use capabilities::{
    CameraConstraints, CameraSource, Capabilities, Capability, CaptureError, DetectorFactory,
    DetectorOptions, FrameObserver, HandDetector, MediaStream, MediaTrack, ModelProvider, Overlay,
};
pub use clock::{Clock, TokioClock};
pub use frame::{FrameOutcome, FramePipeline, FrameProcessor};
pub use manager::{SessionError, SessionManager};
pub use registry::TrackRegistry;
pub use state::{new_shared_state, Chip, SessionEvent, SessionState, SessionStatus, SharedState};
pub use ticker::spawn_ticker;
