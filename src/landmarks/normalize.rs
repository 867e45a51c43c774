//! Landmark Normalizer: raw hand points → canonical feature vector.
//!
//! ## Algorithm
//!
//! 1. Clamp every point to `[0, 1]` and scale to frame pixels.
//! 2. Build a tight min/max bounding box padded by a constant number of
//!    pixels and clamped to the frame, then project the points into that
//!    box's local `[0, 1]` "crop space".
//! 3. Mirror `x` for left hands so the classifier only sees right hands.
//! 4. Subtract the `(x, y)` centroid and divide by the largest
//!    point-to-centroid distance (scale 1 when every point coincides).
//! 5. Flatten in the model's training layout (grouped or interleaved).
//! 6. Standardize each feature with the model's precomputed mean/scale.
//!
//! The transform is a pure function of the hand, the frame size and the
//! constants held by [`Normalizer`]; repeated calls are bit-identical.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frame::{Hand, Handedness, LandmarkFrame, Point3, LANDMARK_COUNT};

/// Added to every scale entry before dividing.
const SCALE_EPSILON: f32 = 1e-6;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Coordinates kept per landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dims {
    /// `(x, y)`, 42 features.
    Xy,
    /// `(x, y, z)`, 63 features.
    Xyz,
}

impl Dims {
    pub fn per_point(&self) -> usize {
        match self {
            Dims::Xy => 2,
            Dims::Xyz => 3,
        }
    }

    /// Infer dimensionality from a feature count (42 or 63).
    pub fn from_feature_len(len: usize) -> Option<Self> {
        match len {
            l if l == LANDMARK_COUNT * 2 => Some(Dims::Xy),
            l if l == LANDMARK_COUNT * 3 => Some(Dims::Xyz),
            _ => None,
        }
    }
}

/// Order in which coordinates are flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlattenOrder {
    /// All x, then all y, then all z.
    Grouped,
    /// x, y, z per point.
    Interleaved,
}

/// Shape of the feature vector expected by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLayout {
    pub dims: Dims,
    pub order: FlattenOrder,
}

impl FeatureLayout {
    pub fn new(dims: Dims, order: FlattenOrder) -> Self {
        Self { dims, order }
    }

    /// Number of features produced (42 or 63).
    pub fn len(&self) -> usize {
        LANDMARK_COUNT * self.dims.per_point()
    }

    fn flatten(&self, points: &[Point3; LANDMARK_COUNT]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        match (self.order, self.dims) {
            (FlattenOrder::Interleaved, Dims::Xy) => {
                for p in points {
                    out.push(p.x);
                    out.push(p.y);
                }
            }
            (FlattenOrder::Interleaved, Dims::Xyz) => {
                for p in points {
                    out.push(p.x);
                    out.push(p.y);
                    out.push(p.z);
                }
            }
            (FlattenOrder::Grouped, dims) => {
                out.extend(points.iter().map(|p| p.x));
                out.extend(points.iter().map(|p| p.y));
                if dims == Dims::Xyz {
                    out.extend(points.iter().map(|p| p.z));
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Standardization
// ---------------------------------------------------------------------------

/// Errors raised when normalization constants do not fit the layout.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    #[error("mean has {mean} entries but scale has {scale}")]
    StatsMismatch { mean: usize, scale: usize },

    #[error("normalization stats have {got} entries but the layout produces {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Per-feature `(v - mean) / (scale + 1e-6)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardization {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl Standardization {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self, LayoutError> {
        if mean.len() != scale.len() {
            return Err(LayoutError::StatsMismatch {
                mean: mean.len(),
                scale: scale.len(),
            });
        }
        Ok(Self { mean, scale })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    fn apply(&self, features: &mut [f32]) {
        for ((v, m), s) in features.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / (s + SCALE_EPSILON);
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureVector
// ---------------------------------------------------------------------------

/// Fixed-length classifier input derived from one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(v: Vec<f32>) -> Self {
        Self(v)
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Converts a [`Hand`] into the [`FeatureVector`] a particular model expects.
///
/// ```
/// use sign_to_text::landmarks::{
///     Dims, FeatureLayout, FlattenOrder, Hand, Handedness, Normalizer, Point3,
/// };
///
/// let layout = FeatureLayout::new(Dims::Xy, FlattenOrder::Interleaved);
/// let normalizer = Normalizer::new(layout, None, 4.0).unwrap();
///
/// let hand = Hand::new([Point3::new(0.5, 0.5, 0.0); 21], Handedness::Right);
/// let features = normalizer.normalize(&hand, 640, 480);
/// assert_eq!(features.len(), 42);
/// assert!(features.as_slice().iter().all(|v| v.is_finite()));
/// ```
#[derive(Debug, Clone)]
pub struct Normalizer {
    layout: FeatureLayout,
    standardization: Option<Standardization>,
    pad_px: f64,
}

impl Normalizer {
    /// Build a normalizer.  `standardization`, when present, must have one
    /// entry per feature of `layout`.
    pub fn new(
        layout: FeatureLayout,
        standardization: Option<Standardization>,
        pad_px: f32,
    ) -> Result<Self, LayoutError> {
        if let Some(stats) = &standardization {
            if stats.len() != layout.len() {
                return Err(LayoutError::LengthMismatch {
                    expected: layout.len(),
                    got: stats.len(),
                });
            }
        }
        Ok(Self {
            layout,
            standardization,
            pad_px: f64::from(pad_px.max(0.0)),
        })
    }

    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Output length of [`normalize`](Self::normalize).
    pub fn feature_len(&self) -> usize {
        self.layout.len()
    }

    /// Normalize the frame's first hand.  Returns `None` when no hand is
    /// present.
    pub fn normalize_frame(&self, frame: &LandmarkFrame) -> Option<FeatureVector> {
        frame
            .primary()
            .map(|hand| self.normalize(hand, frame.frame_width, frame.frame_height))
    }

    /// Normalize one hand observed in a `frame_width` × `frame_height` frame.
    pub fn normalize(&self, hand: &Hand, frame_width: u32, frame_height: u32) -> FeatureVector {
        let crop = self.project_to_crop(hand, frame_width, frame_height);
        let canonical = canonicalize(crop, hand.handedness);
        let centered = center_and_scale(&canonical);

        let mut features = self.layout.flatten(&centered);
        if let Some(stats) = &self.standardization {
            stats.apply(&mut features);
        }
        FeatureVector(features)
    }

    /// Steps 1–2: full-frame coordinates → local `[0, 1]` box coordinates.
    fn project_to_crop(&self, hand: &Hand, frame_width: u32, frame_height: u32) -> [[f64; 3]; LANDMARK_COUNT] {
        let w = f64::from(frame_width.max(1));
        let h = f64::from(frame_height.max(1));

        let mut px = [[0.0_f64; 3]; LANDMARK_COUNT];
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

        for (out, p) in px.iter_mut().zip(hand.landmarks.iter()) {
            let x = clamp01(f64::from(p.x)) * w;
            let y = clamp01(f64::from(p.y)) * h;
            let z = if p.z.is_finite() { f64::from(p.z) } else { 0.0 };
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            *out = [x, y, z];
        }

        let x1 = (min_x.floor() - self.pad_px).clamp(0.0, w - 1.0);
        let y1 = (min_y.floor() - self.pad_px).clamp(0.0, h - 1.0);
        let x2 = (max_x.ceil() + self.pad_px).clamp(0.0, w - 1.0);
        let y2 = (max_y.ceil() + self.pad_px).clamp(0.0, h - 1.0);
        let bw = (x2 - x1).max(1.0);
        let bh = (y2 - y1).max(1.0);

        for p in px.iter_mut() {
            p[0] = clamp01((p[0] - x1) / bw);
            p[1] = clamp01((p[1] - y1) / bh);
        }
        px
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Step 3: present every hand as a right hand.
fn canonicalize(mut crop: [[f64; 3]; LANDMARK_COUNT], handedness: Handedness) -> [[f64; 3]; LANDMARK_COUNT] {
    if handedness == Handedness::Left {
        for p in crop.iter_mut() {
            p[0] = 1.0 - p[0];
        }
    }
    crop
}

/// Step 4: centroid at the origin, furthest point at distance 1.
fn center_and_scale(points: &[[f64; 3]; LANDMARK_COUNT]) -> [Point3; LANDMARK_COUNT] {
    let n = LANDMARK_COUNT as f64;
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;

    let span = points
        .iter()
        .map(|p| (p[0] - cx).hypot(p[1] - cy))
        .fold(0.0_f64, f64::max);
    let s = if span > 0.0 && span.is_finite() { span } else { 1.0 };

    let mut out = [Point3::default(); LANDMARK_COUNT];
    for (o, p) in out.iter_mut().zip(points.iter()) {
        *o = Point3::new(((p[0] - cx) / s) as f32, ((p[1] - cy) / s) as f32, p[2] as f32);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
