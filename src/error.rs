use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneKind {
    Luma,
    ChromaU,
    ChromaV,
}

impl fmt::Display for PlaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaneKind::Luma => "Y",
            PlaneKind::ChromaU => "U",
            PlaneKind::ChromaV => "V",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame has an empty dimension: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error(
        "{plane} plane has invalid strides: row stride {row_stride}, pixel stride {pixel_stride}, a row spans {row_span} bytes"
    )]
    InvalidStride {
        plane: PlaneKind,
        row_stride: usize,
        pixel_stride: usize,
        row_span: usize,
    },

    #[error("{plane} plane too small: got {actual} bytes, expected at least {required}")]
    PlaneTooSmall {
        plane: PlaneKind,
        actual: usize,
        required: usize,
    },

    #[error("NV12 to RGB conversion failed: {0}")]
    Conversion(String),
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("image buffer size mismatch: got {actual}, expected {expected}")]
    BufferMismatch { actual: usize, expected: usize },

    #[error("bilinear resize failed: {0}")]
    Resize(String),

    #[error("failed to build input tensor: {0}")]
    Shape(String),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference backend failed: {0}")]
    Backend(String),

    #[error("model returned {actual} scores, expected 3")]
    OutputArity { actual: usize },
}

/// Reasons a single frame is dropped. None of them touch the rate gate.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Decode(#[from] DecodeError),

    #[error("tensor preparation failed: {0}")]
    Prepare(#[from] PrepareError),

    #[error("preview rendering failed: {0}")]
    Preview(#[source] PrepareError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}
