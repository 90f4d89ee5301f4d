#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod decoder;
pub mod engine;
pub mod preview;
pub mod rate_gate;
pub mod readings;
pub mod sink;
pub mod tensor;
pub mod worker;

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraDevice, CameraStream, available_cameras, start_camera_stream};
pub use decoder::decode_frame;
pub use engine::{InferenceEngine, OrtEngine};
pub use rate_gate::{GateDecision, RateGate};
pub use sink::{ChannelSink, RenderSink, channel_sink};
pub use tensor::prepare_input;
pub use worker::{AnalysisWorker, FrameOutcome, FramePipeline, start_analysis_worker};
