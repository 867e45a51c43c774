//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::landmarks::{Dims, FeatureLayout, FlattenOrder};

// ---------------------------------------------------------------------------
// PipelineKind
// ---------------------------------------------------------------------------

/// The two interchangeable recognition pipelines.
///
/// | Variant  | Labels                       | Default features       |
/// |----------|------------------------------|------------------------|
/// | Spelling | letters, digits, SPACE, DEL  | 42 (x,y) interleaved   |
/// | Phrase   | whole words / phrases        | 63 (x,y,z) interleaved |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Per-letter fingerspelling.
    Spelling,
    /// Per-phrase signs.
    Phrase,
}

impl PipelineKind {
    /// Directory name under the models dir holding this pipeline's assets.
    pub fn asset_dir(&self) -> &'static str {
        match self {
            PipelineKind::Spelling => "spelling",
            PipelineKind::Phrase => "phrases",
        }
    }

    /// Short label for logs and the status line.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineKind::Spelling => "spelling",
            PipelineKind::Phrase => "phrase",
        }
    }
}

impl Default for PipelineKind {
    fn default() -> Self {
        Self::Spelling
    }
}

// ---------------------------------------------------------------------------
// CommitMode
// ---------------------------------------------------------------------------

/// How stabilized predictions turn into text.
///
/// | Variant    | Behaviour                                              |
/// |------------|--------------------------------------------------------|
/// | FreeForm   | only debounced SPACE / DELETE commands are applied     |
/// | AutoCommit | one append per fixed-interval tick from the snapshot   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Commands only; regular content is typed manually.
    FreeForm,
    /// Timed auto-commit of the latest fresh snapshot.
    AutoCommit,
}

impl Default for CommitMode {
    fn default() -> Self {
        Self::FreeForm
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Tunables for one recognition pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum stabilized confidence for a prediction to count (0.0 – 1.0).
    pub confidence_gate: f32,
    /// Majority-vote window length in frames.
    pub smoothing_window: usize,
    /// Weight of the previous logit average in the EMA (0.0 disables it).
    pub ema_alpha: f32,
    /// Point dimensionality fed to the classifier.
    pub dims: Dims,
    /// Flattening order matching the model's training layout.
    pub order: FlattenOrder,
    /// Constant pixel pad around the landmark bounding box.
    pub crop_pad_px: f32,
    /// Sequence lengths probed at model load when flat input is rejected.
    pub sequence_lengths: Vec<usize>,
    /// Detector minimum detection confidence.
    pub min_detection_confidence: f32,
    /// Detector minimum tracking confidence.
    pub min_tracking_confidence: f32,
}

impl PipelineConfig {
    /// Default tunables for the fingerspelling pipeline.
    pub fn spelling() -> Self {
        Self {
            confidence_gate: 0.50,
            smoothing_window: 7,
            ema_alpha: 0.65,
            dims: Dims::Xy,
            order: FlattenOrder::Interleaved,
            crop_pad_px: 10.0,
            sequence_lengths: vec![32, 64],
            min_detection_confidence: 0.35,
            min_tracking_confidence: 0.35,
        }
    }

    /// Default tunables for the phrase pipeline.
    pub fn phrase() -> Self {
        Self {
            confidence_gate: 0.20,
            smoothing_window: 11,
            ema_alpha: 0.65,
            dims: Dims::Xyz,
            order: FlattenOrder::Interleaved,
            crop_pad_px: 4.0,
            sequence_lengths: vec![32, 64],
            min_detection_confidence: 0.35,
            min_tracking_confidence: 0.45,
        }
    }

    /// Feature layout described by `dims` and `order`.
    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout::new(self.dims, self.order)
    }
}

// ---------------------------------------------------------------------------
// CommitConfig
// ---------------------------------------------------------------------------

/// Timing and debounce settings for the commit state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Auto-commit tick period in milliseconds.
    pub auto_interval_ms: u64,
    /// Maximum snapshot age (relative to the tick) still eligible for commit.
    pub freshness_grace_ms: u64,
    /// Consecutive qualifying frames needed before a command fires.
    pub command_stable_frames: u32,
    /// Frames during which a repeated command is suppressed after firing.
    pub command_cooldown_frames: u32,
    /// Capacity of the rolling confident-letter buffer.
    pub letter_buffer_capacity: usize,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            auto_interval_ms: 3_000,
            freshness_grace_ms: 120,
            command_stable_frames: 6,
            command_cooldown_frames: 12,
            letter_buffer_capacity: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Which physical camera to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front ("selfie") camera.
    User,
    /// Rear camera.
    Environment,
}

/// Camera acquisition constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Ideal capture width in pixels.
    pub ideal_width: u32,
    /// Ideal capture height in pixels.
    pub ideal_height: u32,
    /// Requested camera.
    pub facing: FacingMode,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing: FacingMode::User,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use sign_to_text::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert!(config.commit.auto_interval_ms > 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline selected when the app starts.
    pub default_pipeline: PipelineKind,
    /// Commit mode selected when the app starts.
    pub default_mode: CommitMode,
    /// Mirror the camera preview.
    pub mirror: bool,
    /// Fingerspelling pipeline tunables.
    pub spelling: PipelineConfig,
    /// Phrase pipeline tunables.
    pub phrase: PipelineConfig,
    /// Commit state machine settings.
    pub commit: CommitConfig,
    /// Camera acquisition settings.
    pub camera: CameraConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_pipeline: PipelineKind::default(),
            default_mode: CommitMode::default(),
            mirror: true,
            spelling: PipelineConfig::spelling(),
            phrase: PipelineConfig::phrase(),
            commit: CommitConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl AppConfig {
    /// Tunables for `pipeline`.
    pub fn pipeline(&self, pipeline: PipelineKind) -> &PipelineConfig {
        match pipeline {
            PipelineKind::Spelling => &self.spelling,
            PipelineKind::Phrase => &self.phrase,
        }
    }

    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
