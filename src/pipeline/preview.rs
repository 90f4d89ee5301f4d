use image::{RgbImage, imageops};
use rayon::prelude::*;

use super::tensor::resize_image;
use crate::{
    error::PrepareError,
    types::{ChannelOrder, InterleavedImage, PreviewImage},
};

/// Portrait overlay size, width x height.
pub const PREVIEW_SIZE: (u32, u32) = (1000, 1400);

/// Turns the model-resolution frame back into something a display can show:
/// rotated a quarter turn clockwise from sensor to portrait orientation,
/// scaled to `size` and expanded to opaque RGBA.
pub fn render_preview(
    image: &InterleavedImage,
    size: (u32, u32),
) -> Result<PreviewImage, PrepareError> {
    let rgb = to_rgb_image(image)?;
    let rotated = imageops::rotate90(&rgb);
    let upright = InterleavedImage {
        width: rotated.width(),
        height: rotated.height(),
        data: rotated.into_raw(),
        order: ChannelOrder::Rgb,
    };

    let (width, height) = size;
    let scaled = resize_image(&upright, width, height)?;

    let mut rgba = vec![0u8; scaled.data.len() / 3 * 4];
    rgba.par_chunks_mut(4)
        .zip(scaled.data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            dst[..3].copy_from_slice(src);
            dst[3] = 255;
        });

    Ok(PreviewImage {
        rgba,
        width,
        height,
    })
}

fn to_rgb_image(image: &InterleavedImage) -> Result<RgbImage, PrepareError> {
    let mut data = image.data.clone();
    if image.order == ChannelOrder::Bgr {
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
    }
    let expected = (image.width as usize)
        .saturating_mul(image.height as usize)
        .saturating_mul(3);
    let actual = data.len();
    RgbImage::from_raw(image.width, image.height, data)
        .ok_or(PrepareError::BufferMismatch { actual, expected })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: [u8; 3] = [250, 10, 10];
    const B: [u8; 3] = [10, 250, 10];

    fn two_by_one(order: ChannelOrder) -> InterleavedImage {
        let mut data = A.to_vec();
        data.extend_from_slice(&B);
        InterleavedImage::new(data, 2, 1, order).unwrap()
    }

    #[test]
    fn rotates_clockwise() {
        let preview = render_preview(&two_by_one(ChannelOrder::Rgb), (1, 2)).unwrap();

        assert_eq!((preview.width, preview.height), (1, 2));
        assert_eq!(&preview.rgba[..4], &[A[0], A[1], A[2], 255]);
        assert_eq!(&preview.rgba[4..], &[B[0], B[1], B[2], 255]);
    }

    #[test]
    fn bgr_input_is_shown_as_rgb() {
        let preview = render_preview(&two_by_one(ChannelOrder::Bgr), (1, 2)).unwrap();
        assert_eq!(&preview.rgba[..4], &[A[2], A[1], A[0], 255]);
    }

    #[test]
    fn scales_to_portrait_overlay() {
        let image = InterleavedImage::filled(224, 224, ChannelOrder::Rgb, [40, 80, 120]);
        let preview = render_preview(&image, PREVIEW_SIZE).unwrap();

        assert_eq!((preview.width, preview.height), (1000, 1400));
        assert_eq!(preview.rgba.len(), 1000 * 1400 * 4);
        assert_eq!(&preview.rgba[4 * 777..4 * 778], &[40, 80, 120, 255]);
    }
}
