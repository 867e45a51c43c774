//! Per-pipeline static assets read from `<models_dir>/<pipeline>/`.
//!
//! ```text
//! labels.json       class names (see `labels`)
//! norm_stats.json   {"mean": [...], "scale": [...]}   optional
//! model.json        dense layer weights (see `linear`)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{PipelineConfig, PipelineKind};
use crate::landmarks::{Dims, FeatureLayout, LayoutError, Normalizer, Standardization};
use crate::session::ModelProvider;

use super::labels::LabelSet;
use super::linear::LinearModel;
use super::model::ClassifierModel;

pub const LABELS_FILE: &str = "labels.json";
pub const NORM_STATS_FILE: &str = "norm_stats.json";
pub const MODEL_FILE: &str = "model.json";

// ---------------------------------------------------------------------------
// AssetError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid label set: {0}")]
    Labels(String),

    #[error("invalid normalization stats: {0}")]
    NormStats(String),

    #[error("invalid model: {0}")]
    Model(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

// ---------------------------------------------------------------------------
// NormStats
// ---------------------------------------------------------------------------

/// Precomputed per-feature mean and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl NormStats {
    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        serde_json::from_str(json).map_err(|e| AssetError::NormStats(e.to_string()))
    }

    /// Dimensionality implied by the stats length (42 → xy, 63 → xyz).
    pub fn dims(&self) -> Option<Dims> {
        Dims::from_feature_len(self.mean.len())
    }

    pub fn standardization(&self) -> Result<Standardization, LayoutError> {
        Standardization::new(self.mean.clone(), self.scale.clone())
    }
}

// ---------------------------------------------------------------------------
// PipelineAssets
// ---------------------------------------------------------------------------

/// Everything needed to bind a Normalizer and Adapter for one pipeline.
#[derive(Clone)]
pub struct PipelineAssets {
    pub model: Arc<dyn ClassifierModel>,
    pub labels: LabelSet,
    pub norm: Option<NormStats>,
}

impl std::fmt::Debug for PipelineAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAssets")
            .field("labels", &self.labels.len())
            .field("norm", &self.norm.as_ref().map(|n| n.mean.len()))
            .finish_non_exhaustive()
    }
}

impl PipelineAssets {
    pub fn new(model: Arc<dyn ClassifierModel>, labels: LabelSet, norm: Option<NormStats>) -> Self {
        Self {
            model,
            labels,
            norm,
        }
    }

    /// Parse assets from their JSON texts.
    pub fn from_json(labels: &str, norm: Option<&str>, model: &str) -> Result<Self, AssetError> {
        let labels = LabelSet::from_json_str(labels)?;
        let norm = norm.map(NormStats::from_json_str).transpose()?;
        let model = LinearModel::from_json_str(model)?;
        if model.classes() != labels.len() {
            log::warn!(
                "classifier: model has {} classes but {} labels",
                model.classes(),
                labels.len()
            );
        }
        Ok(Self::new(Arc::new(model), labels, norm))
    }

    /// Blocking load from a pipeline asset directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self, AssetError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| AssetError::Io { path, source })
        };
        let labels = read(LABELS_FILE)?;
        let norm = if dir.join(NORM_STATS_FILE).exists() {
            Some(read(NORM_STATS_FILE)?)
        } else {
            None
        };
        let model = read(MODEL_FILE)?;
        Self::from_json(&labels, norm.as_deref(), &model)
    }

    /// Feature layout for this model: dimensionality comes from the stats
    /// length when present, otherwise from `config`.
    pub fn layout(&self, config: &PipelineConfig) -> FeatureLayout {
        let dims = self
            .norm
            .as_ref()
            .and_then(NormStats::dims)
            .unwrap_or(config.dims);
        FeatureLayout::new(dims, config.order)
    }

    /// Build the pipeline's Normalizer.
    pub fn normalizer(&self, config: &PipelineConfig) -> Result<Normalizer, AssetError> {
        let standardization = self
            .norm
            .as_ref()
            .map(NormStats::standardization)
            .transpose()?;
        Ok(Normalizer::new(
            self.layout(config),
            standardization,
            config.crop_pad_px,
        )?)
    }
}

// ---------------------------------------------------------------------------
// FileModelProvider
// ---------------------------------------------------------------------------

/// Loads pipeline assets from `<root>/<pipeline>/`.
#[derive(Debug, Clone)]
pub struct FileModelProvider {
    root: PathBuf,
}

impl FileModelProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn pipeline_dir(&self, pipeline: PipelineKind) -> PathBuf {
        self.root.join(pipeline.asset_dir())
    }
}

#[async_trait]
impl ModelProvider for FileModelProvider {
    async fn load(&self, pipeline: PipelineKind) -> Result<PipelineAssets, AssetError> {
        let dir = self.pipeline_dir(pipeline);
        log::info!("classifier: loading {} assets from {}", pipeline.label(), dir.display());

        let read = |name: &'static str| {
            let path = dir.join(name);
            async move {
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| AssetError::Io { path, source })
            }
        };
        let labels = read(LABELS_FILE).await?;
        let norm = match tokio::fs::try_exists(dir.join(NORM_STATS_FILE)).await {
            Ok(true) => Some(read(NORM_STATS_FILE).await?),
            _ => None,
        };
        let model = read(MODEL_FILE).await?;
        PipelineAssets::from_json(&labels, norm.as_deref(), &model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::FlattenOrder;
    use tempfile::TempDir;

    const LABELS: &str = r#"["A", "B"]"#;
    const PIPELINE_DIR: &str = "spelling";

    fn model_json(inputs: usize, classes: usize) -> String {
        let row = vec!["0.0"; inputs].join(",");
        let rows = vec![format!("[{row}]"); classes].join(",");
        let bias = vec!["0.0"; classes].join(",");
        format!(r#"{{"weights":[{rows}],"bias":[{bias}]}}"#)
    }

    fn stats_json(len: usize) -> String {
        let zeros = vec!["0.0"; len].join(",");
        let ones = vec!["1.0"; len].join(",");
        format!(r#"{{"mean":[{zeros}],"scale":[{ones}]}}"#)
    }

    fn write_dir(dir: &Path, norm: Option<String>) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(LABELS_FILE), LABELS).unwrap();
        std::fs::write(dir.join(MODEL_FILE), model_json(42, 2)).unwrap();
        if let Some(norm) = norm {
            std::fs::write(dir.join(NORM_STATS_FILE), norm).unwrap();
        }
    }

    #[test]
    fn loads_directory_without_stats() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(PIPELINE_DIR);
        write_dir(&dir, None);

        let assets = PipelineAssets::load_from_dir(&dir).unwrap();
        assert_eq!(assets.labels.len(), 2);
        assert!(assets.norm.is_none());

        let normalizer = assets.normalizer(&PipelineConfig::spelling()).unwrap();
        assert_eq!(normalizer.feature_len(), 42);
    }

    #[test]
    fn stats_length_decides_dimensionality() {
        let assets = PipelineAssets::from_json(LABELS, Some(&stats_json(63)), &model_json(63, 2))
            .unwrap();
        let layout = assets.layout(&PipelineConfig::spelling());
        assert_eq!(layout.dims, Dims::Xyz);
        assert_eq!(layout.order, FlattenOrder::Interleaved);
        assert_eq!(assets.normalizer(&PipelineConfig::spelling()).unwrap().feature_len(), 63);
    }

    #[test]
    fn missing_model_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(LABELS_FILE), LABELS).unwrap();
        let err = PipelineAssets::load_from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn mismatched_stats_are_rejected() {
        let bad = r#"{"mean":[0.0, 0.0],"scale":[1.0]}"#;
        let assets = PipelineAssets::from_json(LABELS, Some(bad), &model_json(42, 2)).unwrap();
        assert!(matches!(
            assets.normalizer(&PipelineConfig::spelling()),
            Err(AssetError::Layout(LayoutError::StatsMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn file_provider_reads_pipeline_subdirectory() {
        let tmp = TempDir::new().unwrap();
        write_dir(&tmp.path().join("phrases"), Some(stats_json(42)));

        let provider = FileModelProvider::new(tmp.path());
        let assets = provider.load(PipelineKind::Phrase).await.unwrap();
        assert_eq!(assets.norm.as_ref().map(|n| n.mean.len()), Some(42));

        let err = provider.load(PipelineKind::Spelling).await.unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }
}
