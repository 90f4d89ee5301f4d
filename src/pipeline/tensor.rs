use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::{
    error::PrepareError,
    types::{ChannelOrder, InterleavedImage},
};

pub const INPUT_SIZE: u32 = 224;

/// Channel order the classifier was trained with. It is the reverse of
/// [`crate::pipeline::decoder::DECODER_CHANNEL_ORDER`]; the model expects
/// BGR even though the decoder emits RGB.
pub const TENSOR_CHANNEL_ORDER: ChannelOrder = ChannelOrder::Bgr;

/// Interpolation used for every resize in the pipeline. Must match the
/// filter the training images were resized with.
pub const RESIZE_FILTER: fir::FilterType = fir::FilterType::Bilinear;

#[derive(Clone, Debug)]
pub struct PreparedInput {
    /// Shape (1, H, W, 3), values in [0.0, 1.0].
    pub tensor: Array4<f32>,
    /// The image at model resolution, still in decoder channel order.
    pub resized: InterleavedImage,
}

/// For each output channel, the index of the source channel it is read from.
pub fn channel_map(from: ChannelOrder, to: ChannelOrder) -> [usize; 3] {
    if from == to { [0, 1, 2] } else { [2, 1, 0] }
}

pub fn prepare_input(
    image: &InterleavedImage,
    target_size: u32,
) -> Result<PreparedInput, PrepareError> {
    let resized = resize_image(image, target_size, target_size)?;
    let tensor = tensor_from_image(&resized, TENSOR_CHANNEL_ORDER)?;
    Ok(PreparedInput { tensor, resized })
}

pub fn resize_image(
    image: &InterleavedImage,
    width: u32,
    height: u32,
) -> Result<InterleavedImage, PrepareError> {
    if image.width == 0 || image.height == 0 {
        return Err(PrepareError::InvalidDimensions {
            width: image.width,
            height: image.height,
        });
    }
    if width == 0 || height == 0 {
        return Err(PrepareError::InvalidDimensions { width, height });
    }
    let expected_len = (image.width as usize)
        .saturating_mul(image.height as usize)
        .saturating_mul(3);
    if image.data.len() != expected_len {
        return Err(PrepareError::BufferMismatch {
            actual: image.data.len(),
            expected: expected_len,
        });
    }
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let src_image = fir::images::Image::from_vec_u8(
        image.width,
        image.height,
        image.data.clone(),
        fir::PixelType::U8x3,
    )
    .map_err(|err| PrepareError::Resize(format!("{err:?}")))?;
    let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Interpolation(RESIZE_FILTER));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .map_err(|err| PrepareError::Resize(format!("{err:?}")))?;

    Ok(InterleavedImage {
        data: dst_image.into_vec(),
        width,
        height,
        order: image.order,
    })
}

/// Reorders channels into `order`, scales samples to [0.0, 1.0] and packs
/// them as (1, H, W, 3) in row-major order. No resizing happens here.
pub fn tensor_from_image(
    image: &InterleavedImage,
    order: ChannelOrder,
) -> Result<Array4<f32>, PrepareError> {
    let [first, second, third] = channel_map(image.order, order);
    let normalized: Vec<f32> = image
        .data
        .par_chunks_exact(3)
        .flat_map_iter(|px| {
            [
                px[first] as f32 / 255.0,
                px[second] as f32 / 255.0,
                px[third] as f32 / 255.0,
            ]
        })
        .collect();

    Array4::<f32>::from_shape_vec(
        (1, image.height as usize, image.width as usize, 3),
        normalized,
    )
    .map_err(|err| PrepareError::Shape(err.to_string()))
}
