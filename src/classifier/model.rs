//! Classifier model seam and one-time input-shape negotiation.
//!
//! # Overview
//!
//! [`ClassifierModel`] is the interface every model backend implements.  It
//! is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn ClassifierModel>`.
//!
//! Models disagree about input rank: some take a flat `[1, N]` vector, others
//! a short `[1, T, N]` sequence.  [`InputContract::negotiate`] probes the
//! model once at load time and records the first convention it accepts, so
//! per-frame inference never has to branch on failures.
//!
//! [`MockModel`] (available under `#[cfg(test)]`) returns pre-configured
//! outputs and only accepts the shapes it is told to.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ClassifierError
// ---------------------------------------------------------------------------

/// All errors that can arise from the classifier subsystem.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifierError {
    /// The feature vector does not match the model's declared input length.
    #[error("feature vector has {got} values but the model expects {expected}")]
    FeatureLength { expected: usize, got: usize },

    /// The model rejected the input or failed while running.
    #[error("inference failed: {0}")]
    Inference(String),

    /// None of the probed input conventions were accepted.
    #[error("model accepts none of the probed input shapes ({0})")]
    NoCompatibleShape(String),
}

// ---------------------------------------------------------------------------
// InputTensor
// ---------------------------------------------------------------------------

/// Dense `f32` tensor handed to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

// ---------------------------------------------------------------------------
// ClassifierModel trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for a loaded classification model.
///
/// # Contract
///
/// - `predict` returns one value per class: either a probability
///   distribution or raw scores.
/// - Rejecting an input shape is reported as an `Err`, never a panic.
pub trait ClassifierModel: Send + Sync {
    /// Run one inference pass.
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ClassifierModel>) {}
};

// ---------------------------------------------------------------------------
// InputContract
// ---------------------------------------------------------------------------

/// Input convention accepted by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// `[1, N]`
    Flat,
    /// `[1, steps, N]`: the frame's features repeated `steps` times.
    Sequence { steps: usize },
}

/// The negotiated input convention, fixed for the lifetime of a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputContract {
    shape: InputShape,
    feature_len: usize,
    output_len: usize,
}

impl InputContract {
    /// Build a contract without probing (for models whose shape is known).
    pub fn new(shape: InputShape, feature_len: usize, output_len: usize) -> Self {
        Self {
            shape,
            feature_len,
            output_len,
        }
    }

    /// Probe `model` with a zero input, trying flat first and then each
    /// sequence length in order.  The first accepted convention wins.
    pub fn negotiate(
        model: &dyn ClassifierModel,
        feature_len: usize,
        sequence_lengths: &[usize],
    ) -> Result<Self, ClassifierError> {
        let candidates = std::iter::once(InputShape::Flat).chain(
            sequence_lengths
                .iter()
                .filter(|&&steps| steps > 0)
                .map(|&steps| InputShape::Sequence { steps }),
        );

        let mut failures = Vec::new();
        for shape in candidates {
            let probe = Self::new(shape, feature_len, 0);
            let zeros = vec![0.0_f32; feature_len];
            match model.predict(&probe.tensor(&zeros)) {
                Ok(out) if !out.is_empty() => {
                    log::info!(
                        "classifier: negotiated input {:?} (rank {}, {} classes)",
                        probe.dims(),
                        probe.rank(),
                        out.len()
                    );
                    return Ok(Self::new(shape, feature_len, out.len()));
                }
                Ok(_) => failures.push(format!("{:?}: empty output", probe.dims())),
                Err(e) => {
                    log::debug!("classifier: {:?} rejected: {e}", probe.dims());
                    failures.push(format!("{:?}: {e}", probe.dims()));
                }
            }
        }

        Err(ClassifierError::NoCompatibleShape(failures.join("; ")))
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    /// Tensor rank: 2 for flat, 3 for sequence.
    pub fn rank(&self) -> usize {
        self.dims().len()
    }

    /// Full tensor dimensions including the batch axis.
    pub fn dims(&self) -> Vec<usize> {
        match self.shape {
            InputShape::Flat => vec![1, self.feature_len],
            InputShape::Sequence { steps } => vec![1, steps, self.feature_len],
        }
    }

    /// Number of features per frame the model expects.
    pub fn feature_len(&self) -> usize {
        self.feature_len
    }

    /// Number of classes the model produced while probing.
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Lay out one frame's features according to the contract.
    pub fn tensor(&self, features: &[f32]) -> InputTensor {
        let data = match self.shape {
            InputShape::Flat => features.to_vec(),
            InputShape::Sequence { steps } => {
                let mut seq = Vec::with_capacity(steps * features.len());
                for _ in 0..steps {
                    seq.extend_from_slice(features);
                }
                seq
            }
        };
        InputTensor {
            shape: self.dims(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// MockModel (test only)
// ---------------------------------------------------------------------------

/// Test double: accepts a fixed set of ranks and replays scripted outputs.
///
/// When the script runs dry the last output is repeated.
#[cfg(test)]
pub struct MockModel {
    accepted_ranks: Vec<usize>,
    outputs: std::sync::Mutex<std::collections::VecDeque<Result<Vec<f32>, ClassifierError>>>,
    last: std::sync::Mutex<Vec<f32>>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockModel {
    pub fn flat(outputs: Vec<Vec<f32>>) -> Self {
        Self::with_ranks(vec![2], outputs)
    }

    pub fn with_ranks(accepted_ranks: Vec<usize>, outputs: Vec<Vec<f32>>) -> Self {
        let last = outputs.first().cloned().unwrap_or_default();
        Self {
            accepted_ranks,
            outputs: std::sync::Mutex::new(outputs.into_iter().map(Ok).collect()),
            last: std::sync::Mutex::new(last),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Queue a failure for the next non-probe call.
    pub fn push_error(&self, message: &str) {
        self.outputs
            .lock()
            .unwrap()
            .push_front(Err(ClassifierError::Inference(message.into())));
    }

    pub fn push_output(&self, out: Vec<f32>) {
        self.outputs.lock().unwrap().push_back(Ok(out));
    }
}

#[cfg(test)]
impl ClassifierModel for MockModel {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        if !self.accepted_ranks.contains(&input.shape.len()) {
            return Err(ClassifierError::Inference(format!(
                "unsupported rank {}",
                input.shape.len()
            )));
        }
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let next = self.outputs.lock().unwrap().pop_front();
        match next {
            Some(Ok(out)) => {
                *self.last.lock().unwrap() = out.clone();
                Ok(out)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
