//! Classifier subsystem: model seam, shape negotiation and output adaptation.
//!
//! # Load time
//!
//! ```text
//! ModelProvider::load ─► PipelineAssets { model, labels, norm }
//!                            │
//!                            ▼
//!        InputContract::negotiate  ([1,N] → [1,32,N] → [1,64,N])
//! ```
//!
//! # Per frame
//!
//! ```text
//! FeatureVector ─► ClassifierAdapter::classify ─► Classification
//! ```

pub mod adapter;
pub mod assets;
pub mod labels;
pub mod linear;
pub mod model;

pub use adapter::{softmax, Classification, ClassifierAdapter};
pub use assets::{AssetError, FileModelProvider, NormStats, PipelineAssets};
pub use labels::LabelSet;
pub use linear::LinearModel;
pub use model::{ClassifierError, ClassifierModel, InputContract, InputShape, InputTensor};
