use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::error::{InferenceError, PrepareError};

/// One plane of a camera buffer, borrowed for the duration of a single
/// frame callback.
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub row_stride: usize,
    /// Distance in bytes between two samples of the same row. 1 for planar
    /// chroma, 2 for chroma interleaved with its sibling plane.
    pub pixel_stride: usize,
}

impl<'a> Plane<'a> {
    pub fn packed(data: &'a [u8], row_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride: 1,
        }
    }
}

/// A YUV 4:2:0 sensor frame. Borrowed so it cannot outlive the callback
/// that received it.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    pub y: Plane<'a>,
    pub u: Plane<'a>,
    pub v: Plane<'a>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl<'a> RawFrame<'a> {
    /// Builds a frame from tightly packed planar Y, U and V planes.
    pub fn from_planes(
        y: &'a [u8],
        u: &'a [u8],
        v: &'a [u8],
        width: u32,
        height: u32,
        timestamp: Instant,
    ) -> Self {
        let chroma_stride = width.div_ceil(2) as usize;
        Self {
            y: Plane::packed(y, width as usize),
            u: Plane::packed(u, chroma_stride),
            v: Plane::packed(v, chroma_stride),
            width,
            height,
            timestamp,
        }
    }
}

/// Where one plane lives inside a [`CapturedFrame`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    pub offset: usize,
    pub len: usize,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl PlaneLayout {
    /// Y, U, V layouts for a contiguous I420 buffer.
    pub fn i420(width: u32, height: u32) -> [PlaneLayout; 3] {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        let luma = w * h;
        let chroma = cw * ch;
        [
            PlaneLayout {
                offset: 0,
                len: luma,
                row_stride: w,
                pixel_stride: 1,
            },
            PlaneLayout {
                offset: luma,
                len: chroma,
                row_stride: cw,
                pixel_stride: 1,
            },
            PlaneLayout {
                offset: luma + chroma,
                len: chroma,
                row_stride: cw,
                pixel_stride: 1,
            },
        ]
    }

    /// Y, U, V layouts for a contiguous NV12 buffer. U and V alias the same
    /// interleaved region, offset by one byte.
    pub fn nv12(width: u32, height: u32) -> [PlaneLayout; 3] {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        let luma = w * h;
        let uv = cw * 2 * ch;
        [
            PlaneLayout {
                offset: 0,
                len: luma,
                row_stride: w,
                pixel_stride: 1,
            },
            PlaneLayout {
                offset: luma,
                len: uv,
                row_stride: cw * 2,
                pixel_stride: 2,
            },
            PlaneLayout {
                offset: luma + 1,
                len: uv.saturating_sub(1),
                row_stride: cw * 2,
                pixel_stride: 2,
            },
        ]
    }

    fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        // Out-of-range layouts yield short planes; the decoder rejects them.
        let tail = buffer.get(self.offset..).unwrap_or(&[]);
        &tail[..self.len.min(tail.len())]
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// An owned frame handed from the frame source to the analysis worker.
/// The release hook runs exactly once, when the frame is dropped, so every
/// exit path of the consumer returns the buffer to the source.
pub struct CapturedFrame {
    buffer: Vec<u8>,
    layout: [PlaneLayout; 3],
    width: u32,
    height: u32,
    timestamp: Instant,
    release: Option<ReleaseHook>,
}

impl CapturedFrame {
    pub fn new(
        buffer: Vec<u8>,
        layout: [PlaneLayout; 3],
        width: u32,
        height: u32,
        timestamp: Instant,
    ) -> Self {
        Self {
            buffer,
            layout,
            width,
            height,
            timestamp,
            release: None,
        }
    }

    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub fn raw(&self) -> RawFrame<'_> {
        let plane = |layout: &PlaneLayout| Plane {
            data: layout.slice(&self.buffer),
            row_stride: layout.row_stride,
            pixel_stride: layout.pixel_stride,
        };
        RawFrame {
            y: plane(&self.layout[0]),
            u: plane(&self.layout[1]),
            v: plane(&self.layout[2]),
            width: self.width,
            height: self.height,
            timestamp: self.timestamp,
        }
    }
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("len", &self.buffer.len())
            .field("layout", &self.layout)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl Drop for CapturedFrame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    pub fn reversed(self) -> Self {
        match self {
            ChannelOrder::Rgb => ChannelOrder::Bgr,
            ChannelOrder::Bgr => ChannelOrder::Rgb,
        }
    }
}

/// Dense 8-bit, 3-channel, row-major image with an explicit channel order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterleavedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
}

impl InterleavedImage {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        order: ChannelOrder,
    ) -> Result<Self, PrepareError> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(3);
        if data.len() != expected {
            return Err(PrepareError::BufferMismatch {
                actual: data.len(),
                expected,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            order,
        })
    }

    pub fn filled(width: u32, height: u32, order: ChannelOrder, pixel: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 3);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
            order,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data
            .get(idx..idx + 3)
            .map(|px| [px[0], px[1], px[2]])
    }
}

/// Raw class scores as produced by the model, one per class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbabilityVector(pub [f32; 3]);

impl ProbabilityVector {
    pub fn from_model_output(scores: &[f32]) -> Result<Self, InferenceError> {
        match scores {
            [a, b, c] => Ok(Self([*a, *b, *c])),
            _ => Err(InferenceError::OutputArity {
                actual: scores.len(),
            }),
        }
    }
}

/// Scores as displayed. Only the first two model scores are used; the
/// third is the remainder `1 - p0 - p1`, which is not clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Readings {
    pub scores: [f32; 3],
    pub latency: Duration,
}

impl Readings {
    pub fn new(probabilities: ProbabilityVector, latency: Duration) -> Self {
        let [first, second, _] = probabilities.0;
        Self {
            scores: [first, second, 1.0 - (first + second)],
            latency,
        }
    }

    /// What the overlay shows before the first inference has run.
    pub fn idle() -> Self {
        Self::new(ProbabilityVector([0.0; 3]), Duration::ZERO)
    }
}

#[derive(Clone, Debug)]
pub struct PreviewImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Everything the display needs for one frame. Between inferences it carries
/// the retained readings and the preview of the last classified frame;
/// before the first inference it carries idle readings and no preview.
#[derive(Clone, Debug)]
pub struct Overlay {
    pub readings: Readings,
    pub labels: [&'static str; 3],
    pub preview: Option<Arc<PreviewImage>>,
    pub timestamp: Instant,
}
