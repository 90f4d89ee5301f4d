use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use memmap2::Mmap;
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::InferenceEngine;
use crate::{error::InferenceError, types::ProbabilityVector};

pub struct OrtEngine {
    session: Session,
}

impl OrtEngine {
    /// Maps the model read-only and builds a session from it. Any failure
    /// here means no inference is possible for the whole session.
    pub fn load(model_path: &Path) -> Result<Self> {
        let file = File::open(model_path)
            .with_context(|| format!("failed to open model {}", model_path.display()))?;
        // SAFETY: the mapping is read-only and only lives while the session
        // is built; the model file is not written while the app runs.
        let model = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to memory-map model {}", model_path.display()))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_memory(&model)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        log::info!(
            "classifier ready ({} bytes) from {}",
            model.len(),
            model_path.display()
        );
        Ok(Self { session })
    }
}

impl InferenceEngine for OrtEngine {
    fn infer(&mut self, input: &Array4<f32>) -> Result<ProbabilityVector, InferenceError> {
        let tensor = Tensor::from_array(input.clone())
            .map_err(|err| InferenceError::Backend(err.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|err| InferenceError::Backend(format!("failed to run ORT session: {err}")))?;

        if outputs.len() < 1 {
            return Err(InferenceError::Backend("model returned no outputs".into()));
        }

        let scores = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|err| InferenceError::Backend(err.to_string()))?;
        let flattened: Vec<f32> = scores.iter().copied().collect();
        ProbabilityVector::from_model_output(&flattened)
    }
}
