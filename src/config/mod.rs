//! Configuration module for sign-to-text.
//!
//! Provides `AppConfig` (top-level settings), per-pipeline and commit
//! sub-configs, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CameraConfig, CommitConfig, CommitMode, FacingMode, PipelineConfig, PipelineKind,
};
