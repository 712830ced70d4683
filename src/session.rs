//! # Session Controller
//!
//! Orchestrates the capture → describe workflow as a linear state machine:
//!
//! ```text
//! idle → camera-active → captured → describing → described
//!                 ↑            ↘ error ↙
//!                 └──── retry ────┘        reset → idle
//! ```
//!
//! ## Invariants
//!
//! - At most one captured image and at most one in-flight description request
//!   exist at a time; operations invalid for the current state fail with a
//!   state error and have no side effects.
//! - The camera is released exactly once per acquire, on every exit path:
//!   capture, retry, reset, shutdown, and acquisition failure.
//! - Each capture gets a sequence number; a description completion tagged
//!   with a stale sequence is discarded, so a late-arriving response can
//!   never clobber a newer capture.

use async_trait::async_trait;

use crate::client::Describer;
use crate::error::{DescribeError, DescribeResult};
use crate::processing::{EncodedImage, RawFrame, encode_for_vlm};

/// Abstract interface for camera frame sources.
/// Enables pluggable capture backends and mock cameras in tests.
#[async_trait]
pub trait CameraSource: Send {
    /// Acquire the camera hardware.
    async fn acquire(&mut self) -> DescribeResult<()>;

    /// Freeze the current camera frame into a raw still image.
    async fn capture_still(&mut self) -> DescribeResult<RawFrame>;

    /// Release the camera hardware.
    async fn release(&mut self) -> DescribeResult<()>;
}

/// The finite enumerated phase of the capture/describe workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing held: no camera, no capture, no description.
    Idle,
    /// Camera acquired, live, waiting for a capture trigger.
    CameraActive,
    /// One frame frozen and encoded; camera released.
    Captured,
    /// Description request in flight.
    Describing,
    /// Description stored.
    Described,
    /// A camera or remote failure was recorded; recoverable via retry/reset.
    Error,
}

impl SessionState {
    /// Stable lowercase name, matching the workflow vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CameraActive => "camera-active",
            Self::Captured => "captured",
            Self::Describing => "describing",
            Self::Described => "described",
            Self::Error => "error",
        }
    }
}

/// User-facing operations the controller can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    StartCamera,
    TakePhoto,
    RequestDescription,
    Retry,
    Reset,
}

/// Token for an in-flight description request, tagged with the capture it
/// belongs to.
#[derive(Debug, Clone)]
pub struct PendingDescription {
    seq: u64,
    image: EncodedImage,
}

impl PendingDescription {
    /// The capture sequence number this request was issued for.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The encoded image to send to the model.
    pub fn image(&self) -> &EncodedImage {
        &self.image
    }
}

/// Owns the camera lifecycle and the session view state.
pub struct SessionController<C: CameraSource> {
    camera: C,
    state: SessionState,
    capture: Option<EncodedImage>,
    description: Option<String>,
    error: Option<String>,
    capture_seq: u64,
    camera_held: bool,
    max_long_side: u32,
    jpeg_quality: u8,
}

impl<C: CameraSource> SessionController<C> {
    /// Create an idle controller around a camera source.
    pub fn new(camera: C, max_long_side: u32, jpeg_quality: u8) -> Self {
        Self {
            camera,
            state: SessionState::Idle,
            capture: None,
            description: None,
            error: None,
            capture_seq: 0,
            camera_held: false,
            max_long_side,
            jpeg_quality,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The captured image, if one exists.
    pub fn capture(&self) -> Option<&EncodedImage> {
        self.capture.as_ref()
    }

    /// The stored description, if the last request succeeded.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The recorded error message, if the session is in the error state.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether `action` is valid in the current state.
    pub fn allows(&self, action: SessionAction) -> bool {
        match action {
            SessionAction::StartCamera => self.state == SessionState::Idle,
            SessionAction::TakePhoto => self.state == SessionState::CameraActive,
            SessionAction::RequestDescription => self.state == SessionState::Captured,
            SessionAction::Retry => matches!(
                self.state,
                SessionState::Captured
                    | SessionState::Describing
                    | SessionState::Described
                    | SessionState::Error
            ),
            SessionAction::Reset => true,
        }
    }

    fn guard(&self, action: SessionAction, name: &str) -> DescribeResult<()> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(DescribeError::state(self.state.as_str(), name))
        }
    }

    /// Release the camera if this controller currently holds it.
    /// The held flag guarantees at most one release per acquire.
    async fn release_camera(&mut self) -> DescribeResult<()> {
        if self.camera_held {
            self.camera_held = false;
            self.camera.release().await?;
        }
        Ok(())
    }

    async fn acquire_camera(&mut self) -> DescribeResult<()> {
        match self.camera.acquire().await {
            Ok(()) => {
                self.camera_held = true;
                self.state = SessionState::CameraActive;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = SessionState::Error;
                Err(e)
            }
        }
    }

    /// Acquire the device camera. Valid from `Idle`.
    pub async fn start_camera(&mut self) -> DescribeResult<()> {
        self.guard(SessionAction::StartCamera, "start_camera")?;
        self.acquire_camera().await
    }

    /// Freeze the current camera frame, release the camera, and store the
    /// encoded capture. Valid from `CameraActive`.
    ///
    /// The camera is released whether or not the grab succeeds.
    pub async fn take_photo(&mut self) -> DescribeResult<()> {
        self.guard(SessionAction::TakePhoto, "take_photo")?;

        let grabbed = self.camera.capture_still().await;
        self.release_camera().await?;

        let encoded = grabbed
            .and_then(|frame| encode_for_vlm(frame, self.max_long_side, self.jpeg_quality));
        match encoded {
            Ok(image) => {
                self.capture_seq += 1;
                self.capture = Some(image);
                self.description = None;
                self.error = None;
                self.state = SessionState::Captured;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = SessionState::Error;
                Err(e)
            }
        }
    }

    /// Begin a description request for the current capture. Valid from
    /// `Captured`; transitions to `Describing` and hands back a tagged token.
    pub fn begin_description(&mut self) -> DescribeResult<PendingDescription> {
        self.guard(SessionAction::RequestDescription, "request_description")?;
        let image = self
            .capture
            .clone()
            .ok_or_else(|| DescribeError::state(self.state.as_str(), "request_description"))?;
        self.state = SessionState::Describing;
        Ok(PendingDescription {
            seq: self.capture_seq,
            image,
        })
    }

    /// Apply the outcome of a description request.
    ///
    /// Returns `true` when the completion was applied. A completion whose
    /// sequence number no longer matches the current capture, or that arrives
    /// when no request is pending, is stale and is discarded without touching
    /// state.
    pub fn complete_description(&mut self, seq: u64, result: DescribeResult<String>) -> bool {
        if self.state != SessionState::Describing || seq != self.capture_seq {
            return false;
        }
        match result {
            Ok(text) => {
                self.description = Some(text);
                self.error = None;
                self.state = SessionState::Described;
            }
            Err(e) => {
                self.error = Some(e.to_string());
                self.state = SessionState::Error;
            }
        }
        true
    }

    /// Convenience: begin, call the describer, and apply the completion.
    ///
    /// Remote failures are absorbed into the session state rather than
    /// propagated; inspect [`state`](Self::state) and
    /// [`error_message`](Self::error_message) afterwards.
    pub async fn describe(&mut self, describer: &dyn Describer) -> DescribeResult<()> {
        let pending = self.begin_description()?;
        let result = describer.describe(pending.image()).await;
        self.complete_description(pending.seq(), result);
        Ok(())
    }

    /// Discard image, description, and error; return to `Idle`.
    /// Valid from every state.
    pub async fn reset(&mut self) -> DescribeResult<()> {
        self.release_camera().await?;
        self.capture = None;
        self.description = None;
        self.error = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Discard the current capture/description/error and re-acquire the
    /// camera for another attempt. Valid after a capture or a failure.
    pub async fn retry(&mut self) -> DescribeResult<()> {
        self.guard(SessionAction::Retry, "retry")?;
        self.release_camera().await?;
        self.capture = None;
        self.description = None;
        self.error = None;
        self.acquire_camera().await
    }

    /// Tear the session down, releasing the camera if it is still held.
    /// Equivalent to [`reset`](Self::reset); kept as a named teardown edge.
    pub async fn shutdown(&mut self) -> DescribeResult<()> {
        self.reset().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Size;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock camera that counts acquires/releases and can be told to fail.
    struct MockCamera {
        acquires: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
        fail_acquire: bool,
        fail_capture: bool,
    }

    impl MockCamera {
        fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let acquires = Arc::new(AtomicUsize::new(0));
            let releases = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    acquires: acquires.clone(),
                    releases: releases.clone(),
                    fail_acquire: false,
                    fail_capture: false,
                },
                acquires,
                releases,
            )
        }
    }

    #[async_trait]
    impl CameraSource for MockCamera {
        async fn acquire(&mut self) -> DescribeResult<()> {
            if self.fail_acquire {
                return Err(DescribeError::camera_init("/dev/video9", "no such device"));
            }
            self.acquires.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn capture_still(&mut self) -> DescribeResult<RawFrame> {
            if self.fail_capture {
                return Err(DescribeError::frame_capture("grab failed"));
            }
            RawFrame::new(vec![128u8; 8 * 6 * 3], Size { w: 8, h: 6 })
        }

        async fn release(&mut self) -> DescribeResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FixedDescriber(DescribeResult<String>);

    #[async_trait]
    impl Describer for FixedDescriber {
        async fn describe(&self, _image: &EncodedImage) -> DescribeResult<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(DescribeError::remote_call("model unreachable")),
            }
        }
    }

    fn controller() -> (SessionController<MockCamera>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (camera, acquires, releases) = MockCamera::new();
        (SessionController::new(camera, 640, 80), acquires, releases)
    }

    #[tokio::test]
    async fn actions_are_gated_by_state() {
        let (mut session, _, _) = controller();

        assert!(session.allows(SessionAction::StartCamera));
        assert!(!session.allows(SessionAction::TakePhoto));
        assert!(session.take_photo().await.is_err());
        assert_eq!(session.state(), SessionState::Idle);

        session.start_camera().await.unwrap();
        assert!(!session.allows(SessionAction::StartCamera));
        assert!(!session.allows(SessionAction::RequestDescription));

        session.take_photo().await.unwrap();
        assert!(session.allows(SessionAction::RequestDescription));

        let _pending = session.begin_description().unwrap();
        assert_eq!(session.state(), SessionState::Describing);
        // describe is disabled while a request is in flight
        assert!(!session.allows(SessionAction::RequestDescription));
        assert!(session.begin_description().is_err());
    }

    #[tokio::test]
    async fn successful_flow_stores_description() {
        let (mut session, _, _) = controller();
        session.start_camera().await.unwrap();
        session.take_photo().await.unwrap();
        assert_eq!(session.state(), SessionState::Captured);

        let describer =
            FixedDescriber(Ok("Una silla de madera junto a una ventana.".to_string()));
        session.describe(&describer).await.unwrap();

        assert_eq!(session.state(), SessionState::Described);
        assert_eq!(
            session.description(),
            Some("Una silla de madera junto a una ventana.")
        );
        assert!(session.error_message().is_none());
    }

    #[tokio::test]
    async fn remote_failure_records_nonempty_error() {
        let (mut session, _, _) = controller();
        session.start_camera().await.unwrap();
        session.take_photo().await.unwrap();

        let describer = FixedDescriber(Err(DescribeError::remote_call("boom")));
        session.describe(&describer).await.unwrap();

        assert_eq!(session.state(), SessionState::Error);
        let message = session.error_message().unwrap();
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let (mut session, _, _) = controller();
        session.start_camera().await.unwrap();
        session.take_photo().await.unwrap();
        let stale = session.begin_description().unwrap();

        // Retake before the first response arrives.
        session.retry().await.unwrap();
        session.take_photo().await.unwrap();
        let fresh = session.begin_description().unwrap();
        assert_ne!(stale.seq(), fresh.seq());

        let applied =
            session.complete_description(stale.seq(), Ok("old answer".to_string()));
        assert!(!applied);
        assert_eq!(session.state(), SessionState::Describing);
        assert!(session.description().is_none());

        let applied = session.complete_description(fresh.seq(), Ok("new answer".to_string()));
        assert!(applied);
        assert_eq!(session.description(), Some("new answer"));
    }

    #[tokio::test]
    async fn completion_after_reset_is_discarded() {
        let (mut session, _, _) = controller();
        session.start_camera().await.unwrap();
        session.take_photo().await.unwrap();
        let pending = session.begin_description().unwrap();

        session.reset().await.unwrap();
        let applied = session.complete_description(pending.seq(), Ok("late".to_string()));
        assert!(!applied);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn reset_clears_everything_from_any_state() {
        let (mut session, _, _) = controller();
        session.start_camera().await.unwrap();
        session.take_photo().await.unwrap();
        let describer = FixedDescriber(Ok("algo".to_string()));
        session.describe(&describer).await.unwrap();

        session.reset().await.unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.capture().is_none());
        assert!(session.description().is_none());
        assert!(session.error_message().is_none());
    }

    #[tokio::test]
    async fn camera_released_exactly_once_per_cycle() {
        let (mut session, acquires, releases) = controller();

        // capture cycle
        session.start_camera().await.unwrap();
        session.take_photo().await.unwrap();
        assert_eq!(acquires.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // retry cycle: camera is already released after the capture
        session.retry().await.unwrap();
        assert_eq!(acquires.load(Ordering::SeqCst), 2);
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // reset while camera is held
        session.reset().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 2);

        // shutdown with nothing held is a no-op on the hardware
        session.shutdown().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_capture_still_releases_camera() {
        let (mut camera, _acquires, releases) = MockCamera::new();
        camera.fail_capture = true;
        let mut session = SessionController::new(camera, 640, 80);

        session.start_camera().await.unwrap();
        assert!(session.take_photo().await.is_err());
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // error is recoverable via retry
        session.retry().await.unwrap();
        assert_eq!(session.state(), SessionState::CameraActive);
        assert!(session.error_message().is_none());
    }

    #[tokio::test]
    async fn acquire_failure_transitions_to_error() {
        let (mut camera, _acquires, releases) = MockCamera::new();
        camera.fail_acquire = true;
        let mut session = SessionController::new(camera, 640, 80);

        assert!(session.start_camera().await.is_err());
        assert_eq!(session.state(), SessionState::Error);
        assert!(session.error_message().unwrap().contains("no such device"));
        // nothing was acquired, so nothing gets released
        session.reset().await.unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }
}
