//! Per-frame hand geometry as delivered by the external landmark detector.

use serde::{Deserialize, Serialize};

/// Number of landmarks per hand (MediaPipe hand model convention).
pub const LANDMARK_COUNT: usize = 21;

// ---------------------------------------------------------------------------
// Point3
// ---------------------------------------------------------------------------

/// A single landmark.  `x`/`y` are normalized image coordinates in `[0, 1]`;
/// `z` is detector-relative depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Handedness
// ---------------------------------------------------------------------------

/// Detector handedness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    #[serde(alias = "left", alias = "LEFT")]
    Left,
    #[serde(alias = "right", alias = "RIGHT")]
    Right,
}

impl Handedness {
    /// Parse a detector label.  Anything other than "left" (any case) is
    /// treated as a right hand.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("left") {
            Handedness::Left
        } else {
            Handedness::Right
        }
    }
}

impl Default for Handedness {
    fn default() -> Self {
        Handedness::Right
    }
}

// ---------------------------------------------------------------------------
// Hand / LandmarkFrame
// ---------------------------------------------------------------------------

/// One detected hand: 21 ordered points plus its handedness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub landmarks: [Point3; LANDMARK_COUNT],
    #[serde(default)]
    pub handedness: Handedness,
}

impl Hand {
    pub fn new(landmarks: [Point3; LANDMARK_COUNT], handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
        }
    }
}

/// Everything the detector reports for a single video frame.
///
/// Only the first hand is ever classified; the rest only contribute to the
/// hand-presence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    #[serde(default)]
    pub hands: Vec<Hand>,
    /// Source frame width in pixels.
    pub frame_width: u32,
    /// Source frame height in pixels.
    pub frame_height: u32,
    /// Monotonic detector timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl LandmarkFrame {
    /// A frame with no detected hands.
    pub fn empty(frame_width: u32, frame_height: u32, timestamp_ms: u64) -> Self {
        Self {
            hands: Vec::new(),
            frame_width,
            frame_height,
            timestamp_ms,
        }
    }

    /// A frame carrying exactly one hand.
    pub fn single(hand: Hand, frame_width: u32, frame_height: u32, timestamp_ms: u64) -> Self {
        Self {
            hands: vec![hand],
            frame_width,
            frame_height,
            timestamp_ms,
        }
    }

    pub fn hand_count(&self) -> usize {
        self.hands.len()
    }

    /// The hand that gets classified, if any.
    pub fn primary(&self) -> Option<&Hand> {
        self.hands.first()
    }
}
