//! Temporal Stabilizer: per-frame classifications → one stable prediction.
//!
//! The adapter already smooths magnitudes with an EMA; this stage smooths
//! the discrete argmax with a majority vote over the last few frames.
//!
//! ```text
//! Classification ─► argmax ─► RingBuffer<usize> ─► majority ─► StablePrediction
//!                                                              (index, current-frame p)
//! ```

pub mod window;

pub use window::RingBuffer;

use crate::classifier::Classification;

/// Majority-vote result paired with the current frame's probability for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StablePrediction {
    pub index: usize,
    pub confidence: f32,
}

/// Sliding-window vote over class indices plus the current hand count.
#[derive(Debug, Clone)]
pub struct TemporalStabilizer {
    votes: RingBuffer<usize>,
    hands: usize,
}

impl TemporalStabilizer {
    /// `window` is clamped to at least one frame.
    pub fn new(window: usize) -> Self {
        Self {
            votes: RingBuffer::new(window.max(1)),
            hands: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.votes.capacity()
    }

    /// Record the hand count for the current frame.
    pub fn set_hands(&mut self, hands: usize) {
        self.hands = hands;
    }

    pub fn hands(&self) -> usize {
        self.hands
    }

    /// Vote with this frame's argmax and return the stabilized prediction.
    ///
    /// Blank classifications do not vote and yield `None`.
    pub fn observe(&mut self, classification: &Classification) -> Option<StablePrediction> {
        let (index, _) = classification.argmax()?;
        self.votes.push(index);
        let winner = self.votes.majority()?;
        Some(StablePrediction {
            index: winner,
            confidence: classification.probability(winner),
        })
    }

    pub fn reset(&mut self) {
        self.votes.clear();
        self.hands = 0;
    }
}
