//! Frame processing: aspect-preserving prescale and VLM payload encoding.

pub mod scale;

pub use scale::{EncodedImage, RawFrame, ScalePlan, Size, encode_for_vlm, plan_max_long_side};
