//! Camera capture surface.
//!
//! State machine:
//!
//! ```text
//! Idle --mount--> LivePreview --snap--> Processing --done--> FrozenPreview --reset--> LivePreview
//!   \--mount--> Error(code)
//! ```
//!
//! The widget owns at most one live stream. Every exit path (unmount, resolution
//! change, drop) stops it.

use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, ImageFormat, RgbImage};

use super::media::{Constraints, MediaDevices, MediaError, MediaStream};
use crate::data_url::encode_data_url;
use crate::geometry::{fit_within, CaptureDimensions, Dimension};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraErrorCode {
    NotSupported,
    PermissionDenied,
    NotFound,
}

impl CameraErrorCode {
    /// Banner text shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            CameraErrorCode::NotSupported => "Camera capture is not supported on this platform",
            CameraErrorCode::PermissionDenied => "Please allow access to a camera",
            CameraErrorCode::NotFound => "Cannot detect a camera",
        }
    }
}

impl From<&MediaError> for CameraErrorCode {
    fn from(err: &MediaError) -> Self {
        match err {
            MediaError::NotSupported => CameraErrorCode::NotSupported,
            MediaError::PermissionDenied => CameraErrorCode::PermissionDenied,
            MediaError::NotFound(_) => CameraErrorCode::NotFound,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Error(CameraErrorCode),
    LivePreview,
    FrozenPreview,
    Processing,
}

/// What the control area next to the preview offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Snap,
    Reset,
    /// Busy indicator; not interactable.
    Busy,
    None,
}

/// Payload handed to the snap callback.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapData {
    /// PNG data URL of the captured raster.
    pub base64: String,
    /// Raster size (what the detector sees) and rendered preview size.
    pub dimensions: CaptureDimensions,
    /// Native size delivered by the device.
    pub stream_dimension: Dimension,
}

pub struct CameraWidget {
    devices: Box<dyn MediaDevices>,
    constraints: Constraints,
    preview_bounds: Dimension,
    stream: Option<Box<dyn MediaStream>>,
    state: CameraState,
    captured: Option<SnapData>,
}

impl CameraWidget {
    pub fn new(devices: Box<dyn MediaDevices>, constraints: Constraints, preview_bounds: Dimension) -> Self {
        Self {
            devices,
            constraints,
            preview_bounds,
            stream: None,
            state: CameraState::Idle,
            captured: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self.state {
            CameraState::Error(code) => Some(code.message()),
            _ => None,
        }
    }

    pub fn controls(&self) -> Control {
        match self.state {
            CameraState::LivePreview => Control::Snap,
            CameraState::FrozenPreview => Control::Reset,
            CameraState::Processing => Control::Busy,
            CameraState::Idle | CameraState::Error(_) => Control::None,
        }
    }

    /// Last captured frame, retained until reset.
    pub fn captured(&self) -> Option<&SnapData> {
        self.captured.as_ref()
    }

    pub fn has_live_stream(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| stream.is_live())
    }

    /// Size the live stream is rendered at.
    pub fn preview_dimension(&self) -> Option<Dimension> {
        self.stream
            .as_ref()
            .map(|stream| fit_within(stream.dimensions(), self.preview_bounds))
    }

    /// Acquire the camera. Only acts from `Idle`.
    pub fn mount(&mut self) {
        if self.state != CameraState::Idle {
            return;
        }
        if !self.devices.is_supported() {
            self.state = CameraState::Error(CameraErrorCode::NotSupported);
            return;
        }
        match self.devices.get_user_media(&self.constraints) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = CameraState::LivePreview;
            }
            Err(err) => {
                log::warn!("error when requesting camera access: {}", err);
                self.state = CameraState::Error(CameraErrorCode::from(&err));
            }
        }
    }

    /// Release the camera and return to `Idle`.
    pub fn unmount(&mut self) {
        self.teardown();
        self.captured = None;
        self.state = CameraState::Idle;
    }

    /// Request a different capture size. The current stream is stopped first.
    pub fn set_resolution(&mut self, constraints: Constraints) {
        if constraints == self.constraints {
            return;
        }
        self.constraints = constraints;
        self.unmount();
        self.mount();
    }

    /// Freeze the current frame and enter `Processing`.
    ///
    /// The raster is drawn at the rendered preview size, which is derived from
    /// the stream's actual resolution rather than the requested one.
    pub fn begin_snap(&mut self) -> Result<SnapData> {
        if self.state != CameraState::LivePreview {
            return Err(anyhow!("cannot snap while camera is {:?}", self.state));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("camera has no live stream"))?;
        let stream_dimension = stream.dimensions();
        let frame = stream.grab_frame().context("grab camera frame")?;
        let preview = fit_within(
            Dimension::new(frame.width(), frame.height()),
            self.preview_bounds,
        );
        let raster = draw_raster(&frame, preview);
        let base64 = encode_png_data_url(&raster)?;

        let snap = SnapData {
            base64,
            dimensions: CaptureDimensions::new(preview, preview),
            stream_dimension,
        };
        self.captured = Some(snap.clone());
        self.state = CameraState::Processing;
        Ok(snap)
    }

    /// Leave `Processing`.
    ///
    /// Callback failures are logged with the payload and otherwise swallowed;
    /// the frozen frame is kept so the user does not have to recapture.
    pub fn finish_snap(&mut self, outcome: Result<()>) {
        if self.state != CameraState::Processing {
            return;
        }
        if let Err(err) = outcome {
            let payload = self
                .captured
                .as_ref()
                .map(|snap| snap.base64.as_str())
                .unwrap_or_default();
            log::error!(
                "snap callback failed: {:#} (payload {} bytes: {})",
                err,
                payload.len(),
                abbreviate(payload, 64)
            );
        }
        self.state = CameraState::FrozenPreview;
    }

    /// Capture a frame and run `on_snap` on it.
    pub fn snap<F>(&mut self, on_snap: F) -> Result<()>
    where
        F: FnOnce(&SnapData) -> Result<()>,
    {
        let snap = self.begin_snap()?;
        let outcome = on_snap(&snap);
        self.finish_snap(outcome);
        Ok(())
    }

    /// Discard the frozen frame and go back to the live preview.
    ///
    /// Returns false when reset is not available (e.g. while processing).
    pub fn reset<F: FnOnce()>(&mut self, on_reset: F) -> bool {
        if self.state != CameraState::FrozenPreview {
            return false;
        }
        self.captured = None;
        self.state = CameraState::LivePreview;
        on_reset();
        true
    }

    fn teardown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::debug!("camera: stream released");
        }
    }
}

impl Drop for CameraWidget {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn draw_raster(frame: &RgbImage, size: Dimension) -> RgbImage {
    if frame.dimensions() == (size.width, size.height) {
        return frame.clone();
    }
    image::imageops::resize(frame, size.width, size.height, FilterType::Triangle)
}

fn encode_png_data_url(raster: &RgbImage) -> Result<String> {
    let mut png = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("encode captured frame")?;
    Ok(encode_data_url(&png, "image/png"))
}

fn abbreviate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
