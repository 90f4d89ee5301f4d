//! Camera frame classification: decode a YUV 4:2:0 frame, shape it into
//! the classifier's input tensor every few seconds, and hand the readings
//! and a preview image to the display.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use config::PipelineConfig;
pub use error::{DecodeError, FrameError, InferenceError, PrepareError};
pub use types::{
    CapturedFrame, ChannelOrder, InterleavedImage, Overlay, Plane, PlaneLayout, PreviewImage,
    ProbabilityVector, RawFrame, Readings,
};
