//! V4L2 camera devices.
//!
//! Opens a local device node (e.g. /dev/video0), negotiates a format close to the
//! requested constraints and hands frames out as RGB. The driver may pick a
//! different resolution than requested; `dimensions()` reports what it chose.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ouroboros::self_referencing;

use super::media::{Constraints, MediaDevices, MediaError, MediaStream};
use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::geometry::Dimension;

pub struct V4l2Devices {
    path: String,
}

impl V4l2Devices {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl MediaDevices for V4l2Devices {
    fn is_supported(&self) -> bool {
        true
    }

    fn get_user_media(
        &mut self,
        constraints: &Constraints,
    ) -> Result<Box<dyn MediaStream>, MediaError> {
        let stream = V4l2Stream::open(&self.path, constraints)?;
        Ok(Box::new(stream))
    }
}

fn map_open_error(path: &str, err: std::io::Error) -> MediaError {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => MediaError::PermissionDenied,
        _ => MediaError::NotFound(format!("{}: {}", path, err)),
    }
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

struct V4l2Stream {
    path: String,
    state: Option<DeviceState>,
    dimension: Dimension,
    format: PixelFormat,
}

impl V4l2Stream {
    fn open(path: &str, constraints: &Constraints) -> Result<Self, MediaError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(path).map_err(|e| map_open_error(path, e))?;
        let mut format = device.format().map_err(|e| map_open_error(path, e))?;
        format.width = constraints.width;
        format.height = constraints.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("camera: failed to set format on {}: {}", path, err);
                device.format().map_err(|e| map_open_error(path, e))?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            MediaError::NotFound(format!(
                "{}: unsupported pixel format {}",
                path,
                String::from_utf8_lossy(&format.fourcc.repr)
            ))
        })?;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|e| map_open_error(path, e))?;

        log::info!(
            "camera: opened {} ({}x{} {:?}, requested {}x{})",
            path,
            format.width,
            format.height,
            pixel_format,
            constraints.width,
            constraints.height
        );

        Ok(Self {
            path: path.to_string(),
            state: Some(state),
            dimension: Dimension::new(format.width, format.height),
            format: pixel_format,
        })
    }
}

impl MediaStream for V4l2Stream {
    fn dimensions(&self) -> Dimension {
        self.dimension
    }

    fn grab_frame(&mut self) -> Result<RgbImage> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| anyhow!("camera {} already stopped", self.path))?;
        let dimension = self.dimension;
        let format = self.format;
        state.with_mut(|fields| {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            normalize_to_rgb(&buf[..used], dimension.width, dimension.height, format)
        })
    }

    fn stop(&mut self) {
        if self.state.take().is_some() {
            log::info!("camera: released {}", self.path);
        }
    }

    fn is_live(&self) -> bool {
        self.state.is_some()
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}
