//! Hand geometry: detector frames → canonical classifier features.
//!
//! # Pipeline
//!
//! ```text
//! LandmarkFrame (21 points, handedness, frame size)
//!   → clamp → crop-space projection → left→right canonicalization
//!   → center/scale → flatten (grouped | interleaved) → standardize
//!   → FeatureVector (42 | 63 f32)
//! ```

pub mod frame;
pub mod normalize;

pub use frame::{Hand, Handedness, LandmarkFrame, Point3, LANDMARK_COUNT};
pub use normalize::{
    Dims, FeatureLayout, FeatureVector, FlattenOrder, LayoutError, Normalizer, Standardization,
};
