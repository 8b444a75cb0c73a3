//! Nvision object-detection demo
//!
//! Capture an image (file upload or live camera), send it to the Nvision
//! object-detection service, and present the result as a sorted, filterable list
//! with bounding-box overlays on the preview.
//!
//! # Module Structure
//!
//! - `capture`: upload and camera surfaces producing data URLs and capture dimensions
//! - `detect`: detection client, lazily built behind `DetectionService`
//! - `category`: category table (icon, glyph, colours) keyed by parent category
//! - `present`: result list, filters, overlays
//! - `controller`: page state with generation counters for stale responses
//! - `config`: file + env configuration
//! - `geometry`, `data_url`: shared helpers
//! - `ui`: terminal busy indicator

pub mod capture;
pub mod category;
pub mod config;
pub mod controller;
pub mod data_url;
pub mod detect;
pub mod geometry;
pub mod present;
pub mod ui;

pub use capture::{CameraWidget, FileUploader, ProcessFileData, SnapData};
pub use category::{category_style, CategoryName, CategoryStyle};
pub use config::AppConfig;
pub use controller::{DetectionPage, DetectionWorker, Generation, InputMode, PageState};
pub use detect::{DetectError, DetectedObject, DetectionResult, DetectionService};
pub use geometry::{BoundingBox, CaptureDimensions, Dimension, OverlayRect};
pub use present::{BoundingBoxOverlay, FilterState, ResultListView};
