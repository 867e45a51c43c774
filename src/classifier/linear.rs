//! Dense single-layer reference backend.
//!
//! `model.json` holds one weight row per class plus a bias:
//!
//! ```json
//! { "weights": [[0.1, -0.2, ...], ...], "bias": [0.0, ...] }
//! ```
//!
//! Output is raw scores (`W·x + b`); the adapter softmaxes them.  Sequence
//! inputs `[1, T, N]` are averaged over `T` before the layer is applied.

use serde::{Deserialize, Serialize};

use super::assets::AssetError;
use super::model::{ClassifierError, ClassifierModel, InputTensor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearModel {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self, AssetError> {
        let model = Self { weights, bias };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| AssetError::Model(format!("model.json: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), AssetError> {
        if self.weights.is_empty() {
            return Err(AssetError::Model("model has no classes".into()));
        }
        if self.bias.len() != self.weights.len() {
            return Err(AssetError::Model(format!(
                "{} weight rows but {} bias values",
                self.weights.len(),
                self.bias.len()
            )));
        }
        let width = self.input_len();
        if width == 0 || self.weights.iter().any(|row| row.len() != width) {
            return Err(AssetError::Model("weight rows have uneven length".into()));
        }
        Ok(())
    }

    pub fn input_len(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn classes(&self) -> usize {
        self.weights.len()
    }
}

impl ClassifierModel for LinearModel {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ClassifierError> {
        let n = self.input_len();
        let x: Vec<f32> = match input.shape.as_slice() {
            [1, len] if *len == n => input.data.clone(),
            [1, steps, len] if *len == n && *steps > 0 => {
                let mut mean = vec![0.0_f32; n];
                for frame in input.data.chunks_exact(n) {
                    for (m, v) in mean.iter_mut().zip(frame) {
                        *m += v;
                    }
                }
                mean.iter_mut().for_each(|m| *m /= *steps as f32);
                mean
            }
            other => {
                return Err(ClassifierError::Inference(format!(
                    "linear model expects [1, {n}] or [1, T, {n}], got {other:?}"
                )))
            }
        };
        if x.len() != n {
            return Err(ClassifierError::Inference(format!(
                "tensor data has {} values for a row of {n}",
                x.len()
            )));
        }

        Ok(self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(&x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect())
    }
}
