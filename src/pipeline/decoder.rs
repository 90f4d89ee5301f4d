//! YUV 4:2:0 camera frames to interleaved RGB.
//!
//! Every frame is assembled into one NV12 buffer before conversion: the
//! luma plane first, then the chroma samples interleaved U before V. The
//! conversion uses the NV12 convention with the BT.601 matrix over the
//! full 0..=255 range, which is what phone camera pipelines emit. Feeding
//! the V plane where U is expected produces a plausible but wrongly tinted
//! image, so the plane roles are fixed by the [`RawFrame`] field names and
//! never guessed.

use yuv::{YuvBiPlanarImage, YuvConversionMode, YuvRange, YuvStandardMatrix, yuv_nv12_to_rgb};

use crate::{
    error::{DecodeError, PlaneKind},
    types::{ChannelOrder, InterleavedImage, Plane, RawFrame},
};

/// Channel order of every image the decoder produces.
pub const DECODER_CHANNEL_ORDER: ChannelOrder = ChannelOrder::Rgb;

const COLOR_RANGE: YuvRange = YuvRange::Full;
const COLOR_MATRIX: YuvStandardMatrix = YuvStandardMatrix::Bt601;

/// Chroma plane dimensions for a 2x2 subsampled frame. Odd sizes round up.
pub fn chroma_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// Exact NV12 byte count for a frame: `luma + 2 * chroma`.
pub fn nv12_len(width: u32, height: u32) -> usize {
    let (cw, ch) = chroma_dimensions(width, height);
    width as usize * height as usize + 2 * cw as usize * ch as usize
}

pub fn decode_frame(frame: &RawFrame<'_>) -> Result<InterleavedImage, DecodeError> {
    let width = frame.width;
    let height = frame.height;
    let nv12 = assemble_nv12(frame)?;
    let luma_len = width as usize * height as usize;
    let (y_plane, uv_plane) = nv12.split_at(luma_len);
    let (cw, _) = chroma_dimensions(width, height);

    let image = YuvBiPlanarImage {
        y_plane,
        y_stride: width,
        uv_plane,
        uv_stride: cw * 2,
        width,
        height,
    };

    let mut rgb = vec![0u8; luma_len * 3];
    yuv_nv12_to_rgb(
        &image,
        &mut rgb,
        width * 3,
        COLOR_RANGE,
        COLOR_MATRIX,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| DecodeError::Conversion(format!("{err:?}")))?;

    Ok(InterleavedImage {
        data: rgb,
        width,
        height,
        order: DECODER_CHANNEL_ORDER,
    })
}

/// Copies the three planes into a single NV12 buffer of exactly
/// [`nv12_len`] bytes. Trailing bytes beyond what the strides address are
/// ignored; any plane shorter than that is a malformed frame.
pub fn assemble_nv12(frame: &RawFrame<'_>) -> Result<Vec<u8>, DecodeError> {
    let (width, height) = (frame.width, frame.height);
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyFrame { width, height });
    }
    let (cw, ch) = chroma_dimensions(width, height);

    let mut out = Vec::with_capacity(nv12_len(width, height));
    gather_plane(&mut out, PlaneKind::Luma, &frame.y, width, height)?;

    let chroma_len = cw as usize * ch as usize;
    let mut u = Vec::with_capacity(chroma_len);
    let mut v = Vec::with_capacity(chroma_len);
    gather_plane(&mut u, PlaneKind::ChromaU, &frame.u, cw, ch)?;
    gather_plane(&mut v, PlaneKind::ChromaV, &frame.v, cw, ch)?;
    out.extend(u.iter().zip(v.iter()).flat_map(|(&u, &v)| [u, v]));

    Ok(out)
}

fn gather_plane(
    out: &mut Vec<u8>,
    kind: PlaneKind,
    plane: &Plane<'_>,
    width: u32,
    height: u32,
) -> Result<(), DecodeError> {
    let (w, h) = (width as usize, height as usize);
    let invalid_stride = |row_span| DecodeError::InvalidStride {
        plane: kind,
        row_stride: plane.row_stride,
        pixel_stride: plane.pixel_stride,
        row_span,
    };

    // Strides come straight from the frame source; any overflow is malformed.
    let row_span = (w - 1)
        .checked_mul(plane.pixel_stride)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(|| invalid_stride(usize::MAX))?;
    if plane.pixel_stride == 0 || plane.row_stride < row_span {
        return Err(invalid_stride(row_span));
    }

    let required = (h - 1)
        .checked_mul(plane.row_stride)
        .and_then(|rows| rows.checked_add(row_span))
        .ok_or_else(|| invalid_stride(row_span))?;
    if plane.data.len() < required {
        return Err(DecodeError::PlaneTooSmall {
            plane: kind,
            actual: plane.data.len(),
            required,
        });
    }

    for row in plane.data.chunks(plane.row_stride).take(h) {
        let row = &row[..row_span];
        if plane.pixel_stride == 1 {
            out.extend_from_slice(row);
        } else {
            out.extend(row.iter().step_by(plane.pixel_stride));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::types::{CapturedFrame, PlaneLayout};

    fn solid_i420(width: u32, height: u32, y: u8, u: u8, v: u8) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let (cw, ch) = chroma_dimensions(width, height);
        let chroma = cw as usize * ch as usize;
        (
            vec![y; width as usize * height as usize],
            vec![u; chroma],
            vec![v; chroma],
        )
    }

    #[test]
    fn mid_gray_decodes_to_gray() {
        let (y, u, v) = solid_i420(8, 6, 128, 128, 128);
        let frame = RawFrame::from_planes(&y, &u, &v, 8, 6, Instant::now());
        let image = decode_frame(&frame).unwrap();

        assert_eq!(image.order, ChannelOrder::Rgb);
        assert_eq!(image.data.len(), 8 * 6 * 3);
        for sample in &image.data {
            assert!((*sample as i32 - 128).abs() <= 2, "sample {sample}");
        }
    }

    #[test]
    fn u_then_v_plane_order_gives_red() {
        // BT.601 full range: Y=76, Cb=85, Cr=255 is saturated red.
        let (y, u, v) = solid_i420(4, 4, 76, 85, 255);
        let frame = RawFrame::from_planes(&y, &u, &v, 4, 4, Instant::now());
        let [r, g, b] = decode_frame(&frame).unwrap().pixel(1, 1).unwrap();
        assert!(r > 200 && g < 40 && b < 40, "got {r},{g},{b}");

        // The same bytes with the chroma roles swapped must not look red.
        let swapped = RawFrame::from_planes(&y, &v, &u, 4, 4, Instant::now());
        let [r, _, b] = decode_frame(&swapped).unwrap().pixel(1, 1).unwrap();
        assert!(b > 200 && r < 40, "got {r},_,{b}");
    }

    #[test]
    fn interleaved_chroma_matches_planar() {
        let (width, height) = (6, 4);
        let (cw, ch) = chroma_dimensions(width, height);
        let y: Vec<u8> = (0..width * height).map(|i| (i * 7 % 256) as u8).collect();
        let u: Vec<u8> = (0..cw * ch).map(|i| (90 + i * 3) as u8).collect();
        let v: Vec<u8> = (0..cw * ch).map(|i| (160 - i * 2) as u8).collect();

        let planar = RawFrame::from_planes(&y, &u, &v, width, height, Instant::now());
        let planar_rgb = decode_frame(&planar).unwrap();

        let mut nv12 = y.clone();
        nv12.extend(u.iter().zip(&v).flat_map(|(&u, &v)| [u, v]));
        let captured = CapturedFrame::new(
            nv12,
            PlaneLayout::nv12(width, height),
            width,
            height,
            Instant::now(),
        );
        let interleaved_rgb = decode_frame(&captured.raw()).unwrap();

        assert_eq!(planar_rgb, interleaved_rgb);
    }

    #[test]
    fn padded_interleaved_rows_match_planar() {
        let (width, height) = (6u32, 4u32);
        let (cw, ch) = chroma_dimensions(width, height);
        let y: Vec<u8> = (0..width * height).map(|i| (i * 11 % 256) as u8).collect();
        let u: Vec<u8> = (0..cw * ch).map(|i| (70 + i * 5) as u8).collect();
        let v: Vec<u8> = (0..cw * ch).map(|i| (180 - i * 4) as u8).collect();
        let planar = RawFrame::from_planes(&y, &u, &v, width, height, Instant::now());

        // Rows padded to 8 bytes, chroma as UVUVUV plus two bytes of padding.
        let stride = 8;
        let mut y_padded = Vec::new();
        for row in y.chunks(width as usize) {
            y_padded.extend_from_slice(row);
            y_padded.extend_from_slice(&[0xEE, 0xEE]);
        }
        let mut uv_padded = Vec::new();
        for (u_row, v_row) in u.chunks(cw as usize).zip(v.chunks(cw as usize)) {
            uv_padded.extend(u_row.iter().zip(v_row).flat_map(|(&u, &v)| [u, v]));
            uv_padded.extend_from_slice(&[0xEE, 0xEE]);
        }
        let padded = RawFrame {
            y: Plane::packed(&y_padded, stride),
            u: Plane {
                data: &uv_padded,
                row_stride: stride,
                pixel_stride: 2,
            },
            v: Plane {
                data: &uv_padded[1..],
                row_stride: stride,
                pixel_stride: 2,
            },
            width,
            height,
            timestamp: Instant::now(),
        };

        assert_eq!(assemble_nv12(&padded).unwrap(), assemble_nv12(&planar).unwrap());
        let image = decode_frame(&padded).unwrap();
        assert_eq!(image.data.len(), 72);
        assert_eq!(image, decode_frame(&planar).unwrap());
    }

    #[test]
    fn overflowing_pixel_stride_is_rejected() {
        let (y, u, v) = solid_i420(8, 8, 128, 128, 128);
        let mut frame = RawFrame::from_planes(&y, &u, &v, 8, 8, Instant::now());
        frame.u.pixel_stride = usize::MAX;

        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::InvalidStride {
                plane: PlaneKind::ChromaU,
                ..
            })
        ));
    }

    #[test]
    fn overflowing_row_stride_is_rejected() {
        let (y, u, v) = solid_i420(8, 8, 128, 128, 128);
        let mut frame = RawFrame::from_planes(&y, &u, &v, 8, 8, Instant::now());
        frame.y.row_stride = usize::MAX / 2;

        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::InvalidStride {
                plane: PlaneKind::Luma,
                ..
            })
        ));
    }

    #[test]
    fn decoding_is_deterministic() {
        let y: Vec<u8> = (0..64u32).map(|i| (i * 4) as u8).collect();
        let u: Vec<u8> = (0..16u32).map(|i| (100 + i) as u8).collect();
        let v: Vec<u8> = (0..16u32).map(|i| (200 - i) as u8).collect();
        let frame = RawFrame::from_planes(&y, &u, &v, 8, 8, Instant::now());

        assert_eq!(decode_frame(&frame).unwrap(), decode_frame(&frame).unwrap());
    }

    #[test]
    fn assembled_buffer_has_exact_length() {
        let (y, mut u, mut v) = solid_i420(5, 3, 10, 20, 30);
        // Extra trailing bytes are ignored.
        u.push(0);
        v.extend_from_slice(&[0, 0]);
        let frame = RawFrame::from_planes(&y, &u, &v, 5, 3, Instant::now());
        let nv12 = assemble_nv12(&frame).unwrap();

        assert_eq!(nv12.len(), nv12_len(5, 3));
        assert_eq!(nv12.len(), 15 + 2 * 3 * 2);
        assert_eq!(&nv12[15..19], &[20, 30, 20, 30]);
    }

    #[test]
    fn short_chroma_plane_is_rejected() {
        let (y, u, v) = solid_i420(8, 8, 128, 128, 128);
        let frame = RawFrame::from_planes(&y, &u, &v[..v.len() - 1], 8, 8, Instant::now());

        match decode_frame(&frame) {
            Err(DecodeError::PlaneTooSmall {
                plane: PlaneKind::ChromaV,
                actual: 15,
                required: 16,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn short_luma_plane_is_rejected() {
        let (y, u, v) = solid_i420(8, 8, 128, 128, 128);
        let frame = RawFrame::from_planes(&y[..40], &u, &v, 8, 8, Instant::now());

        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::PlaneTooSmall {
                plane: PlaneKind::Luma,
                ..
            })
        ));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = RawFrame::from_planes(&[], &[], &[], 0, 4, Instant::now());
        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::EmptyFrame { width: 0, height: 4 })
        ));
    }

    #[test]
    fn overlapping_rows_are_rejected() {
        let data = vec![0u8; 64];
        let frame = RawFrame {
            y: Plane::packed(&data, 4),
            u: Plane::packed(&data, 4),
            v: Plane::packed(&data, 4),
            width: 8,
            height: 8,
            timestamp: Instant::now(),
        };
        assert!(matches!(
            decode_frame(&frame),
            Err(DecodeError::InvalidStride {
                plane: PlaneKind::Luma,
                ..
            })
        ));
    }
}
