//! Classifier Adapter: feature vector → probability distribution.
//!
//! ```text
//! FeatureVector ─► InputContract::tensor ─► model.predict
//!                                              │
//!                          blank on error ◄────┤
//!                                              ▼
//!                    ema = α·ema + (1-α)·output
//!                                              │
//!             sum≈1 and non-negative? ─yes─► pass through
//!                                    └─no──► stable softmax
//! ```

use std::sync::Arc;

use crate::landmarks::FeatureVector;

use super::model::{ClassifierError, ClassifierModel, InputContract};

/// Tolerance used to decide whether a model output is already a distribution.
const DISTRIBUTION_TOLERANCE: f32 = 0.02;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Per-frame classifier output.  An empty distribution is the blank
/// prediction ("none", confidence 0).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub probabilities: Vec<f32>,
}

impl Classification {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Most likely class and its probability.  First index wins on ties.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &p) in self.probabilities.iter().enumerate() {
            match best {
                Some((_, bp)) if p <= bp => {}
                _ => best = Some((i, p)),
            }
        }
        best
    }

    /// Probability of `index`, or 0 when out of range.
    pub fn probability(&self, index: usize) -> f32 {
        self.probabilities.get(index).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Distribution helpers
// ---------------------------------------------------------------------------

/// `true` when `values` is non-negative and sums to 1 within tolerance.
pub fn is_distribution(values: &[f32]) -> bool {
    if values.is_empty() || values.iter().any(|&v| v < 0.0) {
        return false;
    }
    let sum: f32 = values.iter().sum();
    (sum - 1.0).abs() < DISTRIBUTION_TOLERANCE
}

/// Numerically stable softmax (max is subtracted before exponentiating).
pub fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / values.len() as f32; values.len()]
    }
}

// ---------------------------------------------------------------------------
// ClassifierAdapter
// ---------------------------------------------------------------------------

/// Binds a loaded model to its negotiated input contract and smooths its
/// output across frames.
///
/// An adapter without a contract still validates frame lengths but every
/// classification is blank.
pub struct ClassifierAdapter {
    model: Arc<dyn ClassifierModel>,
    contract: Option<InputContract>,
    feature_len: usize,
    ema_alpha: f32,
    ema: Option<Vec<f32>>,
}

impl ClassifierAdapter {
    /// `ema_alpha` is the weight kept by the previous average (0.65 by default).
    pub fn new(model: Arc<dyn ClassifierModel>, contract: InputContract, ema_alpha: f32) -> Self {
        Self {
            model,
            feature_len: contract.feature_len(),
            contract: Some(contract),
            ema_alpha: ema_alpha.clamp(0.0, 1.0),
            ema: None,
        }
    }

    /// Adapter for a model no input convention could be agreed with.
    pub fn unbound(model: Arc<dyn ClassifierModel>, feature_len: usize, ema_alpha: f32) -> Self {
        Self {
            model,
            contract: None,
            feature_len,
            ema_alpha: ema_alpha.clamp(0.0, 1.0),
            ema: None,
        }
    }

    /// Negotiate the input contract once and build the adapter.
    pub fn negotiate(
        model: Arc<dyn ClassifierModel>,
        feature_len: usize,
        sequence_lengths: &[usize],
        ema_alpha: f32,
    ) -> Result<Self, ClassifierError> {
        let contract = InputContract::negotiate(model.as_ref(), feature_len, sequence_lengths)?;
        Ok(Self::new(model, contract, ema_alpha))
    }

    pub fn contract(&self) -> Option<&InputContract> {
        self.contract.as_ref()
    }

    /// Declared input length; frames of any other length are rejected.
    pub fn input_len(&self) -> usize {
        self.feature_len
    }

    /// Forget the running average (called when a session stops).
    pub fn reset(&mut self) {
        self.ema = None;
    }

    /// Classify one frame.
    ///
    /// A length mismatch is the only error.  A missing contract, inference
    /// failures and non-finite outputs degrade to [`Classification::blank`].
    pub fn classify(&mut self, features: &FeatureVector) -> Result<Classification, ClassifierError> {
        if features.len() != self.input_len() {
            return Err(ClassifierError::FeatureLength {
                expected: self.input_len(),
                got: features.len(),
            });
        }

        let Some(contract) = &self.contract else {
            return Ok(Classification::blank());
        };
        let output = match self.model.predict(&contract.tensor(features.as_slice())) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("classifier: inference failed, blank prediction: {e}");
                return Ok(Classification::blank());
            }
        };
        if output.is_empty() || output.iter().any(|v| !v.is_finite()) {
            log::warn!("classifier: model returned an unusable output, blank prediction");
            return Ok(Classification::blank());
        }

        let smoothed = self.smooth(output);
        let probabilities = if is_distribution(&smoothed) {
            smoothed
        } else {
            softmax(&smoothed)
        };
        Ok(Classification { probabilities })
    }

    fn smooth(&mut self, output: Vec<f32>) -> Vec<f32> {
        let alpha = self.ema_alpha;
        let next = match self.ema.take() {
            Some(prev) if prev.len() == output.len() => prev
                .iter()
                .zip(&output)
                .map(|(&p, &o)| alpha * p + (1.0 - alpha) * o)
                .collect(),
            _ => output,
        };
        self.ema = Some(next.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::model::{InputShape, MockModel};

    fn features(n: usize) -> FeatureVector {
        FeatureVector::from(vec![0.1; n])
    }

    #[test]
    fn softmax_is_stable_for_large_scores() {
        let p = softmax(&[1000.0, 1001.0, 1002.0]);
        assert!(p.iter().all(|v| v.is_finite()));
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn distribution_passes_through_unchanged() {
        let model = Arc::new(MockModel::flat(vec![vec![0.2, 0.8]]));
        let mut adapter =
            ClassifierAdapter::new(model, InputContract::new(InputShape::Flat, 4, 2), 0.65);
        let c = adapter.classify(&features(4)).unwrap();
        assert_eq!(c.probabilities, vec![0.2, 0.8]);
        assert_eq!(c.argmax(), Some((1, 0.8)));
    }

    #[test]
    fn raw_scores_are_softmaxed() {
        let model = Arc::new(MockModel::flat(vec![vec![2.0, 0.0, -1.0]]));
        let mut adapter =
            ClassifierAdapter::new(model, InputContract::new(InputShape::Flat, 4, 3), 0.65);
        let c = adapter.classify(&features(4)).unwrap();
        assert!((c.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(c.argmax().map(|(i, _)| i), Some(0));
    }

    #[test]
    fn ema_damps_a_single_frame_flip() {
        let model = Arc::new(MockModel::flat(vec![vec![1.0, 0.0], vec![0.0, 1.0]]));
        let mut adapter =
            ClassifierAdapter::new(model, InputContract::new(InputShape::Flat, 4, 2), 0.65);
        adapter.classify(&features(4)).unwrap();
        let second = adapter.classify(&features(4)).unwrap();
        assert!((second.probability(0) - 0.65).abs() < 1e-6);
        assert!((second.probability(1) - 0.35).abs() < 1e-6);
        assert_eq!(second.argmax().map(|(i, _)| i), Some(0));

        adapter.reset();
        let model_out = adapter.classify(&features(4)).unwrap();
        assert_eq!(model_out.probabilities, vec![0.0, 1.0]);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let model = Arc::new(MockModel::flat(vec![vec![0.5, 0.5]]));
        let mut adapter =
            ClassifierAdapter::new(model, InputContract::new(InputShape::Flat, 63, 2), 0.65);
        let err = adapter.classify(&features(42)).unwrap_err();
        assert_eq!(
            err,
            ClassifierError::FeatureLength {
                expected: 63,
                got: 42
            }
        );
    }

    #[test]
    fn inference_failure_degrades_to_blank() {
        let model = Arc::new(MockModel::flat(vec![vec![0.5, 0.5]]));
        model.push_error("boom");
        let mut adapter = ClassifierAdapter::new(
            model.clone(),
            InputContract::new(InputShape::Flat, 4, 2),
            0.65,
        );
        let c = adapter.classify(&features(4)).unwrap();
        assert!(c.is_blank());
        assert_eq!(c.argmax(), None);

        let next = adapter.classify(&features(4)).unwrap();
        assert!(!next.is_blank());
    }

    #[test]
    fn nan_output_degrades_to_blank() {
        let model = Arc::new(MockModel::flat(vec![vec![f32::NAN, 1.0]]));
        let mut adapter =
            ClassifierAdapter::new(model, InputContract::new(InputShape::Flat, 4, 2), 0.65);
        assert!(adapter.classify(&features(4)).unwrap().is_blank());
    }

    #[test]
    fn negotiated_sequence_model_is_fed_sequences() {
        let model = Arc::new(MockModel::with_ranks(vec![3], vec![vec![0.1, 0.9]]));
        let mut adapter = ClassifierAdapter::negotiate(model, 63, &[32, 64], 0.65).unwrap();
        assert_eq!(adapter.contract().map(|c| c.dims()), Some(vec![1, 32, 63]));
        let c = adapter.classify(&features(63)).unwrap();
        assert_eq!(c.argmax().map(|(i, _)| i), Some(1));
    }

    #[test]
    fn unbound_adapter_is_always_blank() {
        let model = Arc::new(MockModel::with_ranks(vec![3], vec![vec![0.1, 0.9]]));
        let err = ClassifierAdapter::negotiate(model.clone(), 63, &[], 0.65).err();
        assert!(matches!(err, Some(ClassifierError::NoCompatibleShape(_))));

        let mut adapter = ClassifierAdapter::unbound(model, 63, 0.65);
        assert!(adapter.contract().is_none());
        assert_eq!(adapter.input_len(), 63);
        assert!(adapter.classify(&features(63)).unwrap().is_blank());
        assert!(matches!(
            adapter.classify(&features(42)),
            Err(ClassifierError::FeatureLength {
                expected: 63,
                got: 42
            })
        ));
    }
}
