//! Camera capture backends.
//!
//! The concrete backend shells out to ffmpeg for a one-shot still frame,
//! which keeps the hardware handle held only for the duration of the grab.

pub mod ffmpeg;

pub use ffmpeg::FfmpegCamera;
