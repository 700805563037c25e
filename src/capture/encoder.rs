//! Frame encoder
//!
//! Converts a raw 4:2:0 planar frame into a JPEG byte stream.
//!
//! The three planes are first repacked into one contiguous buffer in the
//! order luma, chroma-V, chroma-U (V before U, the NV21 convention). Colour is
//! then read back out of that packed buffer, so a wrong plane order shows up
//! as wrong colours rather than a wrong size.

use super::traits::{Plane, RawFrame};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

/// JPEG quality used for every frame and single shot
pub const JPEG_QUALITY: u8 = 90;

/// Frame encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Frame has zero dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("Chroma planes differ: U={u} bytes, V={v} bytes")]
    MismatchedChroma { u: usize, v: usize },

    #[error("{plane} plane too small: need {needed} bytes, got {actual}")]
    PlaneTooSmall {
        plane: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("{plane} plane strides overflow: row {row_stride}, pixel {pixel_stride}")]
    InvalidStride {
        plane: &'static str,
        row_stride: usize,
        pixel_stride: usize,
    },

    #[error("JPEG compression failed: {0}")]
    Compression(#[from] image::ImageError),
}

/// Repack planes into one buffer ordered Y, V, U
pub fn pack_planes(y: &[u8], u: &[u8], v: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(y.len() + u.len() + v.len());
    packed.extend_from_slice(y);
    packed.extend_from_slice(v);
    packed.extend_from_slice(u);
    packed
}

/// Bytes a plane needs to cover `width` x `height` samples
///
/// `None` when the strides overflow `usize`.
fn required_len(plane: &Plane, width: usize, height: usize) -> Option<usize> {
    let rows = (height - 1).checked_mul(plane.row_stride)?;
    let cols = (width - 1).checked_mul(plane.pixel_stride)?;
    rows.checked_add(cols)?.checked_add(1)
}

/// Check plane sizes against the frame dimensions
pub fn validate(frame: &RawFrame) -> Result<(), EncodeError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(EncodeError::ZeroDimensions {
            width: frame.width,
            height: frame.height,
        });
    }

    if frame.u.len() != frame.v.len() {
        return Err(EncodeError::MismatchedChroma {
            u: frame.u.len(),
            v: frame.v.len(),
        });
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let chroma_width = width.div_ceil(2);
    let chroma_height = height.div_ceil(2);

    let checks = [
        ("Y", &frame.y, width, height),
        ("U", &frame.u, chroma_width, chroma_height),
        ("V", &frame.v, chroma_width, chroma_height),
    ];
    for (name, plane, w, h) in checks {
        let needed = required_len(plane, w, h).ok_or(EncodeError::InvalidStride {
            plane: name,
            row_stride: plane.row_stride,
            pixel_stride: plane.pixel_stride,
        })?;
        if plane.len() < needed {
            return Err(EncodeError::PlaneTooSmall {
                plane: name,
                needed,
                actual: plane.len(),
            });
        }
    }

    Ok(())
}

#[inline]
fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convert a Y/V/U packed buffer to interleaved RGB (full-range BT.601)
fn packed_to_rgb(packed: &[u8], frame: &RawFrame) -> Vec<u8> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let v_offset = frame.y.len();
    let u_offset = v_offset + frame.v.len();

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let luma = packed[row * frame.y.row_stride + col * frame.y.pixel_stride] as f32;
            let v_index = (row / 2) * frame.v.row_stride + (col / 2) * frame.v.pixel_stride;
            let u_index = (row / 2) * frame.u.row_stride + (col / 2) * frame.u.pixel_stride;
            let cr = packed[v_offset + v_index] as f32 - 128.0;
            let cb = packed[u_offset + u_index] as f32 - 128.0;

            rgb.push(clamp_u8(luma + 1.402 * cr));
            rgb.push(clamp_u8(luma - 0.344_136 * cb - 0.714_136 * cr));
            rgb.push(clamp_u8(luma + 1.772 * cb));
        }
    }
    rgb
}

/// Encode a raw frame to JPEG at [`JPEG_QUALITY`]
pub fn encode_frame(frame: &RawFrame) -> Result<Vec<u8>, EncodeError> {
    validate(frame)?;

    let packed = pack_planes(&frame.y.data, &frame.u.data, &frame.v.data);
    let rgb = packed_to_rgb(&packed, frame);

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode(&rgb, frame.width, frame.height, ExtendedColorType::Rgb8)?;

    tracing::trace!(
        "Encoded {}x{} frame to {} JPEG bytes",
        frame.width,
        frame.height,
        out.len()
    );
    Ok(out)
}
