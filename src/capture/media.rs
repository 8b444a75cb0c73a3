//! Media device abstraction.
//!
//! A `MediaDevices` implementation hands out live `MediaStream`s. Streams own
//! the camera hardware until `stop()` is called; callers must stop every stream
//! they acquire.

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::geometry::Dimension;

/// Requested capture size. Devices may deliver a different native resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constraints {
    pub width: u32,
    pub height: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("media capture is not supported")]
    NotSupported,

    #[error("permission denied")]
    PermissionDenied,

    #[error("no capture device: {0}")]
    NotFound(String),
}

pub trait MediaStream: Send {
    /// Native size of delivered frames.
    fn dimensions(&self) -> Dimension;

    /// Current frame as RGB.
    fn grab_frame(&mut self) -> Result<RgbImage>;

    /// Stop all tracks and release the device. Idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

pub trait MediaDevices {
    /// Whether a capture API exists at all on this platform.
    fn is_supported(&self) -> bool;

    fn get_user_media(&mut self, constraints: &Constraints)
        -> Result<Box<dyn MediaStream>, MediaError>;
}

/// Pick a device backend for a device path.
///
/// `stub://` paths get synthetic frames; other paths need the `camera-v4l2` feature.
pub fn open_media_devices(device: &str) -> Box<dyn MediaDevices> {
    if device.starts_with("stub://") {
        return Box::new(SyntheticDevices::from_path(device));
    }
    #[cfg(feature = "camera-v4l2")]
    {
        Box::new(super::v4l2::V4l2Devices::new(device))
    }
    #[cfg(not(feature = "camera-v4l2"))]
    {
        log::warn!("camera device {} requires the camera-v4l2 feature", device);
        Box::new(UnsupportedDevices)
    }
}

/// Platform without any capture API.
pub struct UnsupportedDevices;

impl MediaDevices for UnsupportedDevices {
    fn is_supported(&self) -> bool {
        false
    }

    fn get_user_media(&mut self, _: &Constraints) -> Result<Box<dyn MediaStream>, MediaError> {
        Err(MediaError::NotSupported)
    }
}

// ----------------------------------------------------------------------------
// Synthetic devices (stub://) for tests and offline demos
// ----------------------------------------------------------------------------

/// Synthetic camera.
///
/// `stub://denied` and `stub://missing` simulate the two acquisition failures.
#[derive(Clone, Debug, Default)]
pub struct SyntheticDevices {
    path: String,
    native: Option<Dimension>,
}

impl SyntheticDevices {
    pub fn from_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            native: None,
        }
    }

    /// Deliver frames at this size regardless of the requested constraints.
    pub fn with_native_resolution(mut self, native: Dimension) -> Self {
        self.native = Some(native);
        self
    }
}

impl MediaDevices for SyntheticDevices {
    fn is_supported(&self) -> bool {
        true
    }

    fn get_user_media(
        &mut self,
        constraints: &Constraints,
    ) -> Result<Box<dyn MediaStream>, MediaError> {
        match self.path.as_str() {
            "stub://denied" => return Err(MediaError::PermissionDenied),
            "stub://missing" => return Err(MediaError::NotFound(self.path.clone())),
            _ => {}
        }
        let dimension = self
            .native
            .unwrap_or(Dimension::new(constraints.width, constraints.height));
        if dimension.is_empty() {
            return Err(MediaError::NotFound(format!(
                "{} cannot deliver {}x{}",
                self.path, dimension.width, dimension.height
            )));
        }
        log::info!(
            "camera: opened {} ({}x{}, synthetic)",
            self.path,
            dimension.width,
            dimension.height
        );
        Ok(Box::new(SyntheticStream {
            dimension,
            frame_count: 0,
            live: true,
        }))
    }
}

struct SyntheticStream {
    dimension: Dimension,
    frame_count: u64,
    live: bool,
}

impl MediaStream for SyntheticStream {
    fn dimensions(&self) -> Dimension {
        self.dimension
    }

    fn grab_frame(&mut self) -> Result<RgbImage> {
        if !self.live {
            return Err(anyhow!("synthetic stream stopped"));
        }
        self.frame_count += 1;
        let shift = self.frame_count as u32;
        Ok(RgbImage::from_fn(
            self.dimension.width,
            self.dimension.height,
            |x, y| {
                image::Rgb([
                    ((x + shift) % 256) as u8,
                    ((y + shift) % 256) as u8,
                    ((x + y) % 256) as u8,
                ])
            },
        ))
    }

    fn stop(&mut self) {
        if self.live {
            log::debug!("camera: synthetic stream stopped");
        }
        self.live = false;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_stream_delivers_requested_size() -> Result<()> {
        let mut devices = SyntheticDevices::from_path("stub://front");
        let mut stream = devices.get_user_media(&Constraints::default())?;
        assert_eq!(stream.dimensions(), Dimension::new(400, 300));
        let frame = stream.grab_frame()?;
        assert_eq!(frame.dimensions(), (400, 300));
        stream.stop();
        assert!(!stream.is_live());
        assert!(stream.grab_frame().is_err());
        Ok(())
    }

    #[test]
    fn native_resolution_overrides_constraints() -> Result<()> {
        let mut devices =
            SyntheticDevices::from_path("stub://hd").with_native_resolution(Dimension::new(640, 480));
        let stream = devices.get_user_media(&Constraints::default())?;
        assert_eq!(stream.dimensions(), Dimension::new(640, 480));
        Ok(())
    }

    #[test]
    fn simulated_failures_map_to_media_errors() {
        let mut denied = SyntheticDevices::from_path("stub://denied");
        assert_eq!(
            denied.get_user_media(&Constraints::default()).err(),
            Some(MediaError::PermissionDenied)
        );
        let mut missing = SyntheticDevices::from_path("stub://missing");
        assert!(matches!(
            missing.get_user_media(&Constraints::default()).err(),
            Some(MediaError::NotFound(_))
        ));
    }
}
