//! # FFmpeg Camera Backend
//!
//! Captures one still frame from the device camera by running ffmpeg as a
//! subprocess with the platform's camera demuxer:
//!
//! | Platform | Demuxer | Default device |
//! |----------|---------------|----------------|
//! | Linux | `v4l2` | `/dev/video0` |
//! | macOS | `avfoundation` | `0` |
//! | Windows | `dshow` | `video=Integrated Camera` |
//!
//! The snapshot lands in a temp file, is decoded to RGB8, and the subprocess
//! exits, so the hardware handle is held only during the grab. The session
//! controller still drives explicit acquire/release so that the held/free
//! state is observable and single-owner.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{DescribeError, DescribeResult};
use crate::processing::{RawFrame, Size};
use crate::session::CameraSource;

/// Default camera device string for the current platform.
pub fn default_device() -> &'static str {
    #[cfg(target_os = "macos")]
    return "0";
    #[cfg(target_os = "windows")]
    return "video=Integrated Camera";

    #[allow(unreachable_code)]
    "/dev/video0"
}

/// The ffmpeg input demuxer for the current platform.
fn demuxer() -> &'static str {
    #[cfg(target_os = "macos")]
    return "avfoundation";
    #[cfg(target_os = "windows")]
    return "dshow";

    #[allow(unreachable_code)]
    "v4l2"
}

/// FFmpeg-subprocess camera source.
pub struct FfmpegCamera {
    device: String,
    active: bool,
}

impl FfmpegCamera {
    /// Create a camera source for the given device string.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            active: false,
        }
    }

    /// Create a camera source for the platform default device.
    pub fn with_default_device() -> Self {
        Self::new(default_device())
    }

    /// The configured device string.
    pub fn device(&self) -> &str {
        &self.device
    }

    async fn probe_ffmpeg(&self) -> DescribeResult<()> {
        let status = Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                DescribeError::camera_init(&self.device, format!("ffmpeg not found: {e}"))
                    .with_recovery_suggestion("Install ffmpeg and ensure it is on PATH")
            })?;
        if !status.success() {
            return Err(DescribeError::camera_init(
                &self.device,
                format!("ffmpeg -version exited with {status}"),
            ));
        }
        Ok(())
    }

    async fn snapshot_to(&self, output: &Path) -> DescribeResult<()> {
        let out = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                demuxer(),
                "-i",
                &self.device,
                "-frames:v",
                "1",
                "-y",
            ])
            .arg(output.as_os_str())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DescribeError::frame_capture(format!("failed to run ffmpeg: {e}")))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(DescribeError::frame_capture(format!(
                "ffmpeg snapshot exited with {}: {}",
                out.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CameraSource for FfmpegCamera {
    async fn acquire(&mut self) -> DescribeResult<()> {
        if self.active {
            return Err(DescribeError::camera_init(
                &self.device,
                "camera is already acquired",
            ));
        }

        self.probe_ffmpeg().await?;

        // On Linux the device node tells us up front whether the camera exists.
        #[cfg(target_os = "linux")]
        if !Path::new(&self.device).exists() {
            return Err(DescribeError::camera_init(
                &self.device,
                "device node does not exist",
            )
            .with_recovery_suggestion("Pass --device with an existing /dev/video* node"));
        }

        self.active = true;
        Ok(())
    }

    async fn capture_still(&mut self) -> DescribeResult<RawFrame> {
        if !self.active {
            return Err(DescribeError::frame_capture("camera is not acquired"));
        }

        let tmp = tempfile::Builder::new()
            .prefix("camdesc-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| DescribeError::io("create snapshot temp file", e))?;

        self.snapshot_to(tmp.path()).await?;

        let bytes = tokio::fs::read(tmp.path())
            .await
            .map_err(|e| DescribeError::io("read snapshot", e))?;
        let decoded = image::load_from_memory(&bytes)?.to_rgb8();
        let size = Size {
            w: decoded.width(),
            h: decoded.height(),
        };
        RawFrame::new(decoded.into_raw(), size)
    }

    async fn release(&mut self) -> DescribeResult<()> {
        // Idempotent by contract of the session controller; the subprocess
        // model means there is no persistent handle to close here.
        self.active = false;
        Ok(())
    }
}
