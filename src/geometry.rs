//! Geometry and number formatting helpers.
//!
//! The detection service reports boxes in the pixel space of the image it received.
//! The preview is rendered at a possibly different size, so every box is mapped
//! through a single scaling factor derived from the capture that produced it.

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Source image size paired with the size its preview is rendered at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDimensions {
    pub image_dimension: Dimension,
    pub preview_dimension: Dimension,
}

impl CaptureDimensions {
    pub fn new(image_dimension: Dimension, preview_dimension: Dimension) -> Self {
        Self {
            image_dimension,
            preview_dimension,
        }
    }

    /// Ratio of rendered preview width to image width.
    ///
    /// A zero-width image yields 1.0 so boxes are never collapsed to nothing.
    pub fn scaling_factor(&self) -> f64 {
        if self.image_dimension.width == 0 {
            return 1.0;
        }
        f64::from(self.preview_dimension.width) / f64::from(self.image_dimension.width)
    }
}

/// Axis-aligned box in source-image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Absolutely positioned rectangle anchored at the preview's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OverlayRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Map a source-image box into preview coordinates.
///
/// `None` and non-finite factors fall back to 1.0. No clamping is applied.
pub fn to_overlay_rect(bbox: &BoundingBox, scaling_factor: Option<f64>) -> OverlayRect {
    let s = match scaling_factor {
        Some(s) if s.is_finite() => s,
        _ => 1.0,
    };
    OverlayRect {
        top: bbox.top * s,
        left: bbox.left * s,
        width: (bbox.right - bbox.left) * s,
        height: (bbox.bottom - bbox.top) * s,
    }
}

/// Like `toFixed(digits)` but returns the number.
pub fn round_digits(value: f64, digits: u32) -> f64 {
    let power = 10f64.powi(digits as i32);
    ((value + f64::EPSILON) * power).round() / power
}

/// Confidence in [0, 1] as a percentage with two decimals.
pub fn confidence_percent(confidence: f64) -> f64 {
    round_digits(confidence * 100.0, 2)
}

/// Rendered size of `source` inside a preview box.
///
/// The preview keeps the source aspect ratio, fits within `bounds` and is never
/// scaled above the source's natural size.
pub fn fit_within(source: Dimension, bounds: Dimension) -> Dimension {
    if source.is_empty() || bounds.is_empty() {
        return source;
    }
    let scale_w = f64::from(bounds.width) / f64::from(source.width);
    let scale_h = f64::from(bounds.height) / f64::from(source.height);
    let scale = scale_w.min(scale_h).min(1.0);
    Dimension {
        width: ((f64::from(source.width) * scale).round() as u32).max(1),
        height: ((f64::from(source.height) * scale).round() as u32).max(1),
    }
}
