//! # Error Handling
//!
//! Error types for the camera description pipeline, featuring hierarchical
//! error variants, classification traits, and rich error context.
//!
//! ## Error Classification
//!
//! Errors are classified using traits:
//!
//! - `Retryable`: Errors that may succeed on a manual retry
//! - `Recoverable`: Errors the session can recover from via reset/retry
//! - `HasSeverity` / `HasRecoverySuggestion`: metadata accessors
//!
//! ## Usage
//!
//! ```rust
//! use cam_describe::error::{DescribeError, Retryable};
//!
//! let error = DescribeError::remote_call("model endpoint returned 503")
//!     .with_operation("describe")
//!     .with_recovery_suggestion("Check that the model server is running");
//!
//! if error.is_retryable() {
//!     // prompt the user to retry
//! }
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that affect operation but can be recovered from
    Error,
    /// Critical errors that require immediate attention
    Critical,
    /// Fatal errors that cannot be recovered from
    Fatal,
}

/// Core error context containing metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Whether this error is retryable
    pub retryable: bool,
    /// Whether this error is recoverable
    pub recoverable: bool,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            retryable: false,
            recoverable: false,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }
}

/// Base error type for the camera description library
#[derive(Debug)]
pub enum DescribeError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Camera acquisition failures (missing device, permission, no backend)
    CameraInit {
        device: String,
        reason: String,
        context: ErrorContext,
    },
    /// Still-frame capture failures
    FrameCapture {
        reason: String,
        context: ErrorContext,
    },
    /// Frame scaling or JPEG/base64 encoding errors
    Encode {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Remote model call failures (network or model error)
    RemoteCall {
        message: String,
        context: ErrorContext,
    },
    /// Missing or rejected credentials for the remote endpoint
    Auth {
        reason: String,
        context: ErrorContext,
    },
    /// Text-to-speech playback errors
    Speech {
        reason: String,
        context: ErrorContext,
    },
    /// Invalid session state transitions
    State {
        current_state: String,
        attempted_operation: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl DescribeError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a camera acquisition error
    pub fn camera_init(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CameraInit {
            device: device.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a frame capture error
    pub fn frame_capture(reason: impl Into<String>) -> Self {
        Self::FrameCapture {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an encoding error
    pub fn encode(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a remote call error
    pub fn remote_call(message: impl Into<String>) -> Self {
        Self::RemoteCall {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an authentication error
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a speech playback error
    pub fn speech(reason: impl Into<String>) -> Self {
        Self::Speech {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an invalid state transition error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.context_mut().retryable = true;
        self
    }

    /// Mark as recoverable
    pub fn recoverable(mut self) -> Self {
        self.context_mut().recoverable = true;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::CameraInit { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::RemoteCall { context, .. } => context,
            Self::Auth { context, .. } => context,
            Self::Speech { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::CameraInit { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::Encode { context, .. } => context,
            Self::RemoteCall { context, .. } => context,
            Self::Auth { context, .. } => context,
            Self::Speech { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Io { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::CameraInit { .. } => "camera_init",
            Self::FrameCapture { .. } => "frame_capture",
            Self::Encode { .. } => "encode",
            Self::RemoteCall { .. } => "remote_call",
            Self::Auth { .. } => "auth",
            Self::Speech { .. } => "speech",
            Self::State { .. } => "state",
            Self::Io { .. } => "io",
        }
    }
}

impl fmt::Display for DescribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescribeError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            DescribeError::CameraInit { device, reason, .. } => {
                write!(f, "Failed to acquire camera '{}': {}", device, reason)
            }
            DescribeError::FrameCapture { reason, .. } => {
                write!(f, "Frame capture failed: {}", reason)
            }
            DescribeError::Encode {
                operation, reason, ..
            } => {
                write!(f, "Encoding failed during {}: {}", operation, reason)
            }
            DescribeError::RemoteCall { message, .. } => {
                write!(f, "Remote model call failed: {}", message)
            }
            DescribeError::Auth { reason, .. } => {
                write!(f, "Authentication error: {}", reason)
            }
            DescribeError::Speech { reason, .. } => {
                write!(f, "Speech playback failed: {}", reason)
            }
            DescribeError::State {
                current_state,
                attempted_operation,
                ..
            } => {
                write!(
                    f,
                    "Operation '{}' is not valid in state '{}'",
                    attempted_operation, current_state
                )
            }
            DescribeError::Io {
                operation, source, ..
            } => {
                write!(f, "I/O error during {}: {}", operation, source)
            }
        }
    }
}

impl StdError for DescribeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type DescribeResult<T> = Result<T, DescribeError>;

/// Trait for errors that can be retried
pub trait Retryable {
    /// Check if this error can be retried
    fn is_retryable(&self) -> bool;
}

impl Retryable for DescribeError {
    fn is_retryable(&self) -> bool {
        self.context().retryable
            || matches!(
                self,
                Self::RemoteCall { .. } | Self::FrameCapture { .. } | Self::Io { .. }
            )
    }
}

/// Trait for errors that can be recovered from
pub trait Recoverable {
    /// Check if the session can recover from this error via reset/retry
    fn is_recoverable(&self) -> bool;
}

impl Recoverable for DescribeError {
    fn is_recoverable(&self) -> bool {
        self.context().recoverable || !matches!(self, Self::Config { .. } | Self::Auth { .. })
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for DescribeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } | Self::Auth { .. } => ErrorSeverity::Fatal,
            Self::Speech { .. } => ErrorSeverity::Warning,
            _ => self.context().severity,
        }
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for DescribeError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

impl From<std::io::Error> for DescribeError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<image::ImageError> for DescribeError {
    fn from(error: image::ImageError) -> Self {
        Self::encode("image", error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = DescribeError::config("jpeg_quality", "0", "must be between 1 and 100");
        assert_eq!(error.category(), "config");
        assert!(!error.is_retryable());
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_error_with_context() {
        let error = DescribeError::frame_capture("ffmpeg exited with status 1")
            .with_operation("take_photo")
            .with_recovery_suggestion("check that the camera device exists");

        assert_eq!(error.category(), "frame_capture");
        assert!(error.is_retryable());
        assert_eq!(
            error.recovery_suggestion(),
            Some("check that the camera device exists")
        );
    }

    #[test]
    fn test_severity_overrides() {
        assert_eq!(
            DescribeError::auth("DESCRIBE_API_KEY is not set").severity(),
            ErrorSeverity::Fatal
        );
        assert_eq!(
            DescribeError::speech("no TTS command found").severity(),
            ErrorSeverity::Warning
        );
    }

    #[test]
    fn test_state_error_display() {
        let error = DescribeError::state("idle", "take_photo");
        let message = error.to_string();
        assert!(message.contains("take_photo"));
        assert!(message.contains("idle"));
    }
}
