mod ort;

use ndarray::Array4;

use crate::{error::InferenceError, types::ProbabilityVector};

pub use self::ort::OrtEngine;

/// The classifier as seen by the pipeline: a (1, H, W, 3) tensor in, one
/// score per class out. Called synchronously from the analysis worker.
pub trait InferenceEngine: Send + 'static {
    fn infer(&mut self, input: &Array4<f32>) -> Result<ProbabilityVector, InferenceError>;
}
