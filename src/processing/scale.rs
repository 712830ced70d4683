//! # Prescale and Payload Encoding
//!
//! Turns a raw captured frame into the payload the description client sends:
//! an aspect-preserving downscale so the longest side fits a configurable
//! bound, followed by JPEG encoding and base64 data-URL wrapping.
//!
//! ## Why prescale
//!
//! VLM token usage scales with image pixel count, while description quality
//! depends mostly on the longest dimension. Clamping the longest side (640 px
//! by default) cuts upload size and token cost without hurting the returned
//! description.
//!
//! ## Design
//!
//! 1. **ScalePlan**: computed output dimensions for a given input and bound
//! 2. **scale_rgb**: SIMD-accelerated resize via `fast_image_resize`
//! 3. **encode_for_vlm**: JPEG encode + base64 wrap into an [`EncodedImage`]
//!
//! No upscaling: frames already within the bound are encoded as-is.

use base64::{Engine as _, engine::general_purpose};
use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeOptions, Resizer};
use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;

use crate::error::{DescribeError, DescribeResult};

/// Prefix of the data-URL form of an encoded capture.
pub const JPEG_DATA_URL_HEADER: &str = "data:image/jpeg;base64,";

/// A 2D size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn pixels(&self) -> usize {
        self.w as usize * self.h as usize
    }
}

/// One raw still frame as tightly-packed RGB8 rows.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub pixels: Vec<u8>,
    pub size: Size,
}

impl RawFrame {
    /// Wrap an RGB8 buffer, validating that its length matches the size.
    pub fn new(pixels: Vec<u8>, size: Size) -> DescribeResult<Self> {
        let expected = size.pixels() * 3;
        if pixels.len() != expected {
            return Err(DescribeError::encode(
                "frame",
                format!(
                    "RGB buffer is {} bytes, expected {} for {}x{}",
                    pixels.len(),
                    expected,
                    size.w,
                    size.h
                ),
            ));
        }
        Ok(Self { pixels, size })
    }
}

/// Computed scaling plan: input size, target bound, resulting output size.
#[derive(Clone, Copy, Debug)]
pub struct ScalePlan {
    pub input: Size,
    pub max_long_side: u32,
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the frame untouched.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Compute an aspect-preserving plan clamping the longest side to `max_long_side`.
///
/// Frames already within the bound keep their original dimensions. Both output
/// sides are clamped to a minimum of 1 px.
pub fn plan_max_long_side(input: Size, max_long_side: u32) -> ScalePlan {
    let long = input.w.max(input.h);
    if long <= max_long_side || long == 0 {
        return ScalePlan {
            input,
            max_long_side,
            out: input,
        };
    }
    let ratio = max_long_side as f64 / long as f64;
    let out = Size {
        w: ((input.w as f64 * ratio).round() as u32).max(1),
        h: ((input.h as f64 * ratio).round() as u32).max(1),
    };
    ScalePlan {
        input,
        max_long_side,
        out,
    }
}

/// Resize a tightly-packed RGB8 frame according to `plan`.
///
/// Returns the input buffer unchanged for identity plans, so the common
/// already-small case costs nothing.
pub fn scale_rgb(frame: RawFrame, plan: &ScalePlan) -> DescribeResult<RawFrame> {
    if plan.is_identity() {
        return Ok(frame);
    }

    let src_view = TypedImageRef::<U8x3>::from_buffer(frame.size.w, frame.size.h, &frame.pixels)
        .map_err(|e| DescribeError::encode("scale", e.to_string()))?;

    let mut dst = vec![0u8; plan.out.pixels() * 3];
    let mut dst_image = TypedImage::<U8x3>::from_buffer(plan.out.w, plan.out.h, &mut dst)
        .map_err(|e| DescribeError::encode("scale", e.to_string()))?;

    let mut resizer = Resizer::new();
    resizer
        .resize_typed::<U8x3>(&src_view, &mut dst_image, &ResizeOptions::new())
        .map_err(|e| DescribeError::encode("scale", e.to_string()))?;

    RawFrame::new(dst, plan.out)
}

/// An encoded still image ready for the description client.
///
/// Immutable after creation; the session owns exactly one per capture. Stores
/// the data-URL form; the raw base64 wire payload is derived by stripping the
/// header.
#[derive(Clone, Debug)]
pub struct EncodedImage {
    data_url: String,
    size: Size,
}

impl EncodedImage {
    /// Final dimensions of the encoded frame.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The `data:image/jpeg;base64,...` form, suitable for display surfaces.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// The raw base64 payload with the data-URL header stripped.
    /// This is what goes over the wire to the model.
    pub fn base64_payload(&self) -> &str {
        self.data_url
            .strip_prefix(JPEG_DATA_URL_HEADER)
            .unwrap_or(&self.data_url)
    }

    /// Build directly from an existing data URL. Used by tests and by callers
    /// that already hold an encoded payload.
    pub fn from_data_url(data_url: impl Into<String>, size: Size) -> Self {
        Self {
            data_url: data_url.into(),
            size,
        }
    }
}

/// Prescale and encode a raw frame into the VLM payload.
///
/// `max_long_side` bounds the longest output side; `jpeg_quality` is the
/// 1-100 quality knob passed to the JPEG encoder.
pub fn encode_for_vlm(
    frame: RawFrame,
    max_long_side: u32,
    jpeg_quality: u8,
) -> DescribeResult<EncodedImage> {
    let plan = plan_max_long_side(frame.size, max_long_side);
    let scaled = scale_rgb(frame, &plan)?;

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality);
    encoder
        .write_image(
            &scaled.pixels,
            scaled.size.w,
            scaled.size.h,
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| DescribeError::encode("jpeg", e.to_string()))?;

    let b64 = general_purpose::STANDARD.encode(&jpeg);
    Ok(EncodedImage {
        data_url: format!("{}{}", JPEG_DATA_URL_HEADER, b64),
        size: scaled.size,
    })
}
