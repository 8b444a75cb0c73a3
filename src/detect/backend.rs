use crate::detect::error::DetectError;
use crate::detect::result::{DetectionRequest, DetectionResult};

/// Detector backend trait.
///
/// Backends receive an already header-stripped base64 image and return the
/// service's objects unfiltered; any filtering beyond the request's confidence
/// floor is left to the presentation layer.
pub trait ObjectDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one image.
    fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionResult, DetectError>;
}
