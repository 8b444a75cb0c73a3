use serde::{Deserialize, Serialize};

use crate::category::CategoryName;
use crate::geometry::BoundingBox;

/// One object reported by the detection service.
///
/// Produced entirely by the service; the application only re-derives order and
/// visibility from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub name: String,
    /// Parent category as reported, e.g. "human".
    pub parent: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

impl DetectedObject {
    /// Known category, if the service used one of the documented names.
    pub fn category(&self) -> Option<CategoryName> {
        self.parent.parse().ok()
    }
}

/// Response of a single detection call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Opaque identifier assigned by the service.
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub detected_objects: Vec<DetectedObject>,
}

/// Payload submitted to a detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRequest {
    /// Base64 image with any data-URL header already removed.
    pub raw_data: String,
    pub output_cropped_image: bool,
    pub confidence_threshold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_response_shape() {
        let json = r#"{
            "service_id": "b1c2",
            "detected_objects": [
                {
                    "name": "person",
                    "parent": "human",
                    "confidence": 0.91,
                    "bounding_box": {"left": 10, "right": 110, "top": 5, "bottom": 205}
                },
                {
                    "name": "fern",
                    "parent": "plant",
                    "confidence": 0.33,
                    "bounding_box": {"left": 0, "right": 1, "top": 0, "bottom": 1}
                }
            ]
        }"#;
        let result: DetectionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.service_id, "b1c2");
        assert_eq!(result.detected_objects.len(), 2);
        assert_eq!(result.detected_objects[0].category(), Some(CategoryName::Human));
        assert_eq!(result.detected_objects[0].bounding_box.right, 110.0);
        assert_eq!(result.detected_objects[1].category(), None);
    }

    #[test]
    fn empty_response_defaults() {
        let result: DetectionResult = serde_json::from_str("{}").unwrap();
        assert!(result.service_id.is_empty());
        assert!(result.detected_objects.is_empty());
    }
}
