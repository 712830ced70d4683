//! # Camera Description Library
//!
//! Captures a still frame from the device camera, sends it to a remote
//! vision-language model, and returns a natural-language description in
//! Spanish (or whatever the configured prompt asks for).
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `capture`: FFmpeg-subprocess camera backend
//! - `processing`: Aspect-preserving prescale and JPEG/base64 encoding
//! - `client`: One-shot HTTP client for the model endpoint
//! - `session`: Linear state machine owning the camera lifecycle
//! - `speech`: Optional spoken playback of the description
//! - `config`: Configuration management and validation
//!
//! ## Session model
//!
//! The session is strictly linear: idle → camera-active → captured →
//! describing → described/error, with reset and retry edges back to the
//! start. At most one capture and one in-flight description request exist at
//! a time, and the camera is released on every exit path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cam_describe::{DescribeOptions, describe_camera};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = DescribeOptions {
//!     device: "/dev/video0".to_string(),
//!     endpoint: "http://127.0.0.1:8001/v1/responses".to_string(),
//!     model: "qwen3-vl".to_string(),
//!     prompt: "Describe en una frase breve lo que aparece en la imagen.".to_string(),
//!     max_long_side: 640,
//!     jpeg_quality: 80,
//!     speak: false,
//!     anonymous: true,
//!     save_path: None,
//! };
//!
//! let description = describe_camera(options).await?;
//! println!("{description}");
//! # Ok(())
//! # }
//! ```

// External crate imports
use anyhow::{Result, anyhow};

// Internal module imports
pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod processing;
pub mod session;
#[cfg(feature = "speech")]
pub mod speech;

/// Re-export error types for convenience
pub use error::{
    DescribeError, DescribeResult, HasRecoverySuggestion, HasSeverity, Recoverable, Retryable,
};

use capture::FfmpegCamera;
use client::VlmClient;
use session::{SessionController, SessionState};

/// Configuration options for one capture-and-describe run.
///
/// # Examples
///
/// ```rust
/// use cam_describe::DescribeOptions;
///
/// let options = DescribeOptions {
///     device: "/dev/video0".to_string(),
///     endpoint: "http://127.0.0.1:8001/v1/responses".to_string(),
///     model: "qwen3-vl".to_string(),
///     prompt: "Describe la imagen.".to_string(),
///     max_long_side: 640,
///     jpeg_quality: 80,
///     speak: false,
///     anonymous: true,
///     save_path: None,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct DescribeOptions {
    /// Camera device string.
    ///
    /// `/dev/video0` on Linux (v4l2), a device index on macOS
    /// (avfoundation), a `video=Name` string on Windows (dshow).
    pub device: String,

    /// URL of the vision-language model endpoint.
    pub endpoint: String,

    /// Model name sent to the endpoint.
    pub model: String,

    /// Fixed instruction prompt sent with every capture.
    pub prompt: String,

    /// Longest-side clamp applied before upload.
    ///
    /// Captured frames larger than this are downscaled, preserving aspect
    /// ratio, to keep upload size and model token usage small.
    pub max_long_side: u32,

    /// JPEG encoder quality, 1-100.
    pub jpeg_quality: u8,

    /// Whether to speak the description aloud after printing it.
    ///
    /// Requires the `speech` feature; prefers a Spanish voice.
    pub speak: bool,

    /// Skip the `DESCRIBE_API_KEY` requirement for endpoints that need no
    /// authentication (typically local model servers).
    pub anonymous: bool,

    /// Optional path where the captured frame's data URL is written.
    pub save_path: Option<String>,
}

/// Main entry point: one full capture-and-describe session.
///
/// Drives the session through acquire → capture → describe, speaks the
/// result when asked to, and returns the description text.
///
/// # Errors
///
/// Returns an error if:
/// - Credentials are required but `DESCRIBE_API_KEY` is not set (checked
///   before the camera is touched)
/// - The camera cannot be acquired or the grab fails
/// - The remote model call fails
///
/// All camera failures leave the hardware released.
pub async fn describe_camera(options: DescribeOptions) -> Result<String> {
    // Credentials are fatal at startup, before any camera work.
    let client = if options.anonymous {
        VlmClient::new(&options.endpoint, &options.model, &options.prompt, None)
    } else {
        VlmClient::from_env(&options.endpoint, &options.model, &options.prompt)?
    };

    let camera = FfmpegCamera::new(&options.device);
    let mut session = SessionController::new(camera, options.max_long_side, options.jpeg_quality);

    println!("Camera: {}", options.device);
    session.start_camera().await?;
    session.take_photo().await?;

    if let Some(image) = session.capture() {
        let size = image.size();
        println!("Captured still frame: {}x{}", size.w, size.h);
        if let Some(path) = &options.save_path {
            tokio::fs::write(path, image.data_url()).await?;
            println!("Snapshot data URL written to {path}");
        }
    }

    println!("Requesting description from {} …", options.endpoint);
    session.describe(&client).await?;

    let outcome = match session.state() {
        SessionState::Described => Ok(session
            .description()
            .unwrap_or_default()
            .to_string()),
        _ => Err(anyhow!(
            "{}",
            session
                .error_message()
                .unwrap_or("description failed with no recorded message")
        )),
    };
    session.shutdown().await?;

    let description = outcome?;

    if options.speak {
        #[cfg(feature = "speech")]
        speech::speak_best_effort(&description).await;
        #[cfg(not(feature = "speech"))]
        eprintln!("Warning: built without the 'speech' feature; not speaking");
    }

    Ok(description)
}
