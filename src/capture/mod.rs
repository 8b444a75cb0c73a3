//! Capture surfaces.
//!
//! - `upload`: image files from disk
//! - `camera`: live camera with snap/reset (`media` devices, V4L2 behind `camera-v4l2`)
//!
//! Both produce a data URL plus the `CaptureDimensions` needed to map detection
//! boxes onto the rendered preview.

pub mod camera;
pub mod media;
#[cfg(feature = "camera-v4l2")]
mod normalize;
pub mod upload;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2;

pub use camera::{CameraErrorCode, CameraState, CameraWidget, Control, SnapData};
pub use media::{
    open_media_devices, Constraints, MediaDevices, MediaError, MediaStream, SyntheticDevices,
    UnsupportedDevices,
};
pub use upload::{read_upload, FileUploader, ProcessFileData, UploadStatus};
#[cfg(feature = "camera-v4l2")]
pub use v4l2::V4l2Devices;
