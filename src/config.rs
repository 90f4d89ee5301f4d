use std::{env, path::PathBuf, time::Duration};

use crate::pipeline::{preview::PREVIEW_SIZE, rate_gate::INFERENCE_INTERVAL, tensor::INPUT_SIZE};

pub const MODEL_PATH_ENV: &str = "PUG_OR_BULLDOG_MODEL";
const MODEL_FILENAME: &str = "pug_or_bulldog.onnx";

pub const CLASS_LABELS: [&str; 3] = ["Pug", "Bulldog", "Other"];

pub fn default_model_path() -> PathBuf {
    PathBuf::from("models").join(MODEL_FILENAME)
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub input_size: u32,
    pub inference_interval: Duration,
    pub preview_size: (u32, u32),
    pub model_path: PathBuf,
    pub class_labels: [&'static str; 3],
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_size: INPUT_SIZE,
            inference_interval: INFERENCE_INTERVAL,
            preview_size: PREVIEW_SIZE,
            model_path: default_model_path(),
            class_labels: CLASS_LABELS,
        }
    }
}

impl PipelineConfig {
    /// Defaults, with the model path taken from `PUG_OR_BULLDOG_MODEL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env::var_os(MODEL_PATH_ENV).filter(|p| !p.is_empty()) {
            config.model_path = PathBuf::from(path);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_model() {
        let config = PipelineConfig::default();
        assert_eq!(config.input_size, 224);
        assert_eq!(config.inference_interval, Duration::from_millis(3_000));
        assert_eq!(config.preview_size, (1000, 1400));
        assert_eq!(config.model_path, PathBuf::from("models/pug_or_bulldog.onnx"));
    }
}
