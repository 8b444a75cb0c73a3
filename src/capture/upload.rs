//! File upload capture surface.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data_url::bytes_to_data_url;
use crate::geometry::{fit_within, CaptureDimensions, Dimension};

/// Upload handed to the page controller.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessFileData {
    pub path: PathBuf,
    /// Image as a data URL (header included).
    pub data_url: String,
    /// Natural image size and the size of its rendered preview.
    pub dimensions: CaptureDimensions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    /// Processing finished with the returned file id.
    Processed(String),
    /// The callback returned without an id.
    Unresolved,
    /// Message shown in the uploader's error slot.
    Failed(String),
}

pub struct FileUploader {
    preview_bounds: Dimension,
    current: Option<PathBuf>,
    status: UploadStatus,
}

impl FileUploader {
    pub fn new(preview_bounds: Dimension) -> Self {
        Self {
            preview_bounds,
            current: None,
            status: UploadStatus::Idle,
        }
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Load `path` and pass it to `on_process_file`, which must return a file id.
    pub fn process_file<F>(&mut self, path: &Path, on_process_file: F) -> &UploadStatus
    where
        F: FnOnce(&ProcessFileData) -> Result<String>,
    {
        self.current = Some(path.to_path_buf());
        self.status = match read_upload(path, self.preview_bounds).and_then(|data| on_process_file(&data)) {
            Ok(id) if !id.trim().is_empty() => UploadStatus::Processed(id),
            Ok(_) => {
                log::warn!("upload {}: processing returned no id", path.display());
                UploadStatus::Unresolved
            }
            Err(err) => {
                log::warn!("upload {} failed: {:#}", path.display(), err);
                UploadStatus::Failed(format!("{:#}", err))
            }
        };
        &self.status
    }

    pub fn remove_file<F: FnOnce()>(&mut self, on_remove: F) {
        self.current = None;
        self.status = UploadStatus::Idle;
        on_remove();
    }
}

/// Read an image file and measure it against the preview box.
pub fn read_upload(path: &Path, preview_bounds: Dimension) -> Result<ProcessFileData> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let data_url =
        bytes_to_data_url(&bytes).with_context(|| format!("{} is not an image", path.display()))?;
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("decode {}", path.display()))?;
    let image_dimension = Dimension::new(decoded.width(), decoded.height());
    let preview_dimension = fit_within(image_dimension, preview_bounds);
    Ok(ProcessFileData {
        path: path.to_path_buf(),
        data_url,
        dimensions: CaptureDimensions::new(image_dimension, preview_dimension),
    })
}
