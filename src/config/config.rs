//! # Configuration Module
//!
//! Configuration structures and validation for camera description runs. This
//! is the common interface between the CLI and the core library.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `device` | `String` | platform device string | Camera device to open |
//! | `endpoint` | `String` | http(s) URL | VLM endpoint |
//! | `model` | `String` | non-empty | Model name sent to the endpoint |
//! | `prompt` | `String` | non-empty | Fixed instruction prompt |
//! | `max_long_side` | `u32` | 64-4096 | Longest-side clamp before upload |
//! | `jpeg_quality` | `u8` | 1-100 | JPEG encoder quality |
//! | `speak` | `bool` | true/false | Speak the description aloud |
//! | `anonymous` | `bool` | true/false | Skip the API-key requirement |
//!
//! ## Examples
//!
//! ```rust
//! use cam_describe::config::DescribeConfig;
//!
//! let config = DescribeConfig::default();
//! assert!(config.validate().is_ok());
//! let options = config.to_describe_options();
//! ```

use crate::client::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_PROMPT};

/// Configuration for one capture-and-describe run.
#[derive(Debug, Clone)]
pub struct DescribeConfig {
    /// Camera device string (e.g. `/dev/video0`, avfoundation index, dshow name).
    pub device: String,

    /// VLM endpoint URL receiving the description request.
    pub endpoint: String,

    /// Model name sent to the endpoint.
    pub model: String,

    /// Fixed instruction prompt sent with the image.
    pub prompt: String,

    /// Longest-side clamp applied before upload (token efficiency).
    pub max_long_side: u32,

    /// JPEG encoder quality, 1-100.
    pub jpeg_quality: u8,

    /// Whether to speak the description aloud after printing it.
    pub speak: bool,

    /// Skip the API-key requirement (local endpoints).
    pub anonymous: bool,

    /// Optional path where the captured snapshot data URL is written.
    pub save_path: Option<String>,
}

impl Default for DescribeConfig {
    /// Defaults target a local OpenAI-compatible VLM server and the platform
    /// default camera.
    fn default() -> Self {
        Self {
            device: crate::capture::ffmpeg::default_device().to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_long_side: 640,
            jpeg_quality: 80,
            speak: false,
            anonymous: false,
            save_path: None,
        }
    }
}

impl DescribeConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.device.is_empty() {
            return Err("Camera device must not be empty".to_string());
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.model.is_empty() {
            return Err("Model name must not be empty".to_string());
        }
        if self.prompt.trim().is_empty() {
            return Err("Prompt must not be empty".to_string());
        }
        if !(64..=4096).contains(&self.max_long_side) {
            return Err("max_long_side must be between 64 and 4096".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        Ok(())
    }

    /// Convert to DescribeOptions for use with the library entry point.
    pub fn to_describe_options(&self) -> crate::DescribeOptions {
        crate::DescribeOptions {
            device: self.device.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            max_long_side: self.max_long_side,
            jpeg_quality: self.jpeg_quality,
            speak: self.speak,
            anonymous: self.anonymous,
            save_path: self.save_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DescribeConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_long_side, 640);
        assert_eq!(config.jpeg_quality, 80);
        assert!(!config.speak);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DescribeConfig::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Invalid endpoint
        config.endpoint = "ftp://somewhere".to_string();
        assert!(config.validate().is_err());
        config.endpoint = DEFAULT_ENDPOINT.to_string();

        // Invalid JPEG quality
        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 80;

        // Invalid clamp
        config.max_long_side = 16;
        assert!(config.validate().is_err());
        config.max_long_side = 640;

        // Empty prompt
        config.prompt = "   ".to_string();
        assert!(config.validate().is_err());
        config.prompt = DEFAULT_PROMPT.to_string();

        // Valid again
        assert!(config.validate().is_ok());
    }
}
