use crate::detect::backend::ObjectDetector;
use crate::detect::error::DetectError;
use crate::detect::result::{DetectedObject, DetectionRequest, DetectionResult};
use crate::geometry::BoundingBox;

/// Offline backend returning a fixed object list.
///
/// Objects below the request's confidence floor are dropped, the way the hosted
/// service applies its threshold.
pub struct StubBackend {
    objects: Vec<DetectedObject>,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::with_objects(sample_objects())
    }

    pub fn with_objects(objects: Vec<DetectedObject>) -> Self {
        Self { objects, calls: 0 }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectDetector for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionResult, DetectError> {
        if request.raw_data.is_empty() {
            return Err(DetectError::Decode("empty image payload".into()));
        }
        self.calls += 1;
        Ok(DetectionResult {
            service_id: format!("stub-{}", self.calls),
            detected_objects: self
                .objects
                .iter()
                .filter(|object| object.confidence >= request.confidence_threshold)
                .cloned()
                .collect(),
        })
    }
}

fn object(name: &str, parent: &str, confidence: f64, bbox: [f64; 4]) -> DetectedObject {
    let [left, top, right, bottom] = bbox;
    DetectedObject {
        name: name.to_string(),
        parent: parent.to_string(),
        confidence,
        bounding_box: BoundingBox {
            top,
            left,
            right,
            bottom,
        },
    }
}

fn sample_objects() -> Vec<DetectedObject> {
    vec![
        object("person", "human", 0.93, [40.0, 20.0, 180.0, 290.0]),
        object("dog", "animal", 0.41, [210.0, 180.0, 330.0, 290.0]),
        object("chair", "furniture", 0.67, [300.0, 120.0, 390.0, 280.0]),
        object("cup", "kitchenware", 0.12, [10.0, 10.0, 30.0, 30.0]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(threshold: f64) -> DetectionRequest {
        DetectionRequest {
            raw_data: "AAAA".into(),
            output_cropped_image: false,
            confidence_threshold: threshold,
        }
    }

    #[test]
    fn stub_applies_confidence_floor() {
        let mut backend = StubBackend::new();
        let result = backend.detect(&request(0.2)).unwrap();
        assert_eq!(result.detected_objects.len(), 3);
        assert!(result
            .detected_objects
            .iter()
            .all(|object| object.confidence >= 0.2));
    }

    #[test]
    fn stub_assigns_fresh_service_ids() {
        let mut backend = StubBackend::new();
        let first = backend.detect(&request(0.0)).unwrap();
        let second = backend.detect(&request(0.0)).unwrap();
        assert_ne!(first.service_id, second.service_id);
    }

    #[test]
    fn stub_rejects_empty_payload() {
        let mut backend = StubBackend::new();
        let mut req = request(0.2);
        req.raw_data.clear();
        assert!(backend.detect(&req).is_err());
    }
}
