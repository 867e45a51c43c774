//! Injected collaborators the session depends on.
//!
//! Nothing here is reached through globals: the host builds a
//! [`Capabilities`] value and hands it to the
//! [`SessionManager`](super::SessionManager).  A missing capability surfaces
//! as [`SessionError::CapabilityUnavailable`](super::SessionError) the first
//! time a session needs it.
//!
//! | Capability         | Role                                        |
//! |--------------------|---------------------------------------------|
//! | [`CameraSource`]   | acquires a media stream (async)             |
//! | [`DetectorFactory`]| builds a [`HandDetector`] per pipeline      |
//! | [`ModelProvider`]  | loads labels, norm stats and model (async)  |
//! | [`Overlay`]        | optional drawing surface                    |

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::classifier::{AssetError, PipelineAssets};
use crate::config::{CameraConfig, FacingMode, PipelineConfig, PipelineKind};
use crate::landmarks::{Hand, LandmarkFrame};

use super::state::Chip;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Camera and detector failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera matches the requested constraints: {0}")]
    NotFound(String),

    #[error("camera acquisition failed: {0}")]
    Acquisition(String),

    #[error("hand detector failed: {0}")]
    Detector(String),

    #[error("failed to stop track {id}: {reason}")]
    TrackStop { id: String, reason: String },
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Camera acquisition constraints (`getUserMedia`-style "ideal" values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl From<&CameraConfig> for CameraConstraints {
    fn from(c: &CameraConfig) -> Self {
        Self {
            ideal_width: c.ideal_width,
            ideal_height: c.ideal_height,
            facing: c.facing,
        }
    }
}

/// One live media track.  `stop` must be idempotent.
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> String;
    fn stop(&self) -> Result<(), CaptureError>;
    fn is_live(&self) -> bool;
}

/// A media stream and the tracks it currently carries.
pub trait MediaStream: Send + Sync {
    fn id(&self) -> String;
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;
}

#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn acquire(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<Arc<dyn MediaStream>, CaptureError>;
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Per-frame sink the detector drives.
///
/// # Contract
///
/// - Called at most once per input frame.
/// - Never reentrant: the next call waits until this one has returned.
/// - Runs synchronously to completion and must not block.
pub trait FrameObserver: Send + Sync {
    fn on_frame(&self, frame: LandmarkFrame);
}

/// Detector configuration for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    pub max_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub mirror: bool,
}

impl DetectorOptions {
    pub fn for_pipeline(config: &PipelineConfig, mirror: bool) -> Self {
        Self {
            max_hands: 1,
            min_detection_confidence: config.min_detection_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
            mirror,
        }
    }
}

/// External hand-landmark detector bound to one video source.
pub trait HandDetector: Send {
    /// Begin the detector's own scheduling loop against `stream`.
    fn start(
        &mut self,
        stream: Arc<dyn MediaStream>,
        options: &DetectorOptions,
        observer: Arc<dyn FrameObserver>,
    ) -> Result<(), CaptureError>;

    /// Cancel the next scheduled frame and release detector resources.
    /// Safe to call more than once.
    fn stop(&mut self);

    /// Every stream the detector holds, including any it opened itself.
    fn streams(&self) -> Vec<Arc<dyn MediaStream>> {
        Vec::new()
    }

    fn set_mirror(&mut self, _mirror: bool) {}
}

pub trait DetectorFactory: Send + Sync {
    fn create(&self, pipeline: PipelineKind) -> Result<Box<dyn HandDetector>, CaptureError>;
}

// ---------------------------------------------------------------------------
// Models / overlay
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn load(&self, pipeline: PipelineKind) -> Result<PipelineAssets, AssetError>;
}

/// Optional drawing surface over the preview.
pub trait Overlay: Send + Sync {
    fn clear(&self);
    /// Draw the hand's bounding box and, when present, the chip tag.
    fn draw_hand(&self, hand: &Hand, tag: Option<&Chip>);
    fn set_mirror(&self, _mirror: bool) {}
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Camera,
    Detector,
    Models,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Camera => "camera source",
            Capability::Detector => "hand detector",
            Capability::Models => "model provider",
        })
    }
}

/// The set of collaborators handed to a session manager.
#[derive(Clone, Default)]
pub struct Capabilities {
    camera: Option<Arc<dyn CameraSource>>,
    detectors: Option<Arc<dyn DetectorFactory>>,
    models: Option<Arc<dyn ModelProvider>>,
    overlay: Option<Arc<dyn Overlay>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(mut self, camera: Arc<dyn CameraSource>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_detectors(mut self, detectors: Arc<dyn DetectorFactory>) -> Self {
        self.detectors = Some(detectors);
        self
    }

    pub fn with_models(mut self, models: Arc<dyn ModelProvider>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn with_overlay(mut self, overlay: Arc<dyn Overlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn camera(&self) -> Result<Arc<dyn CameraSource>, Capability> {
        self.camera.clone().ok_or(Capability::Camera)
    }

    pub fn detectors(&self) -> Result<Arc<dyn DetectorFactory>, Capability> {
        self.detectors.clone().ok_or(Capability::Detector)
    }

    pub fn models(&self) -> Result<Arc<dyn ModelProvider>, Capability> {
        self.models.clone().ok_or(Capability::Models)
    }

    pub fn overlay(&self) -> Option<Arc<dyn Overlay>> {
        self.overlay.clone()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("camera", &self.camera.is_some())
            .field("detectors", &self.detectors.is_some())
            .field("models", &self.models.is_some())
            .field("overlay", &self.overlay.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_capabilities_report_what_is_missing() {
        let caps = Capabilities::new();
        assert_eq!(caps.camera().err(), Some(Capability::Camera));
        assert_eq!(caps.detectors().err(), Some(Capability::Detector));
        assert_eq!(caps.models().err(), Some(Capability::Models));
        assert!(caps.overlay().is_none());
    }

    #[test]
    fn detector_options_follow_pipeline() {
        let spelling = DetectorOptions::for_pipeline(&PipelineConfig::spelling(), true);
        assert_eq!(spelling.max_hands, 1);
        assert_eq!(spelling.min_tracking_confidence, 0.35);
        let phrase = DetectorOptions::for_pipeline(&PipelineConfig::phrase(), false);
        assert_eq!(phrase.min_tracking_confidence, 0.45);
        assert!(!phrase.mirror);
    }

    #[test]
    fn constraints_from_camera_config() {
        let c = CameraConstraints::from(&CameraConfig::default());
        assert_eq!((c.ideal_width, c.ideal_height), (1280, 720));
        assert_eq!(c.facing, FacingMode::User);
    }
}
