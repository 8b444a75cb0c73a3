use std::sync::{Arc, Mutex, OnceLock};

use crate::data_url::strip_data_url_header;
use crate::detect::backend::ObjectDetector;
use crate::detect::error::DetectError;
use crate::detect::result::{DetectionRequest, DetectionResult};

type DetectorFactory = Box<dyn FnOnce() -> Result<Box<dyn ObjectDetector>, DetectError> + Send>;
type DetectorSlot = Result<Mutex<Box<dyn ObjectDetector>>, DetectError>;

/// Shared handle to a lazily constructed detector.
///
/// The factory runs at most once, on the first detection, no matter how many
/// clones of the handle exist. A failed construction is cached and reported on
/// every later call.
#[derive(Clone)]
pub struct DetectionService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    factory: Mutex<Option<DetectorFactory>>,
    detector: OnceLock<DetectorSlot>,
    confidence_threshold: f64,
}

impl DetectionService {
    pub fn new<F>(confidence_threshold: f64, factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn ObjectDetector>, DetectError> + Send + 'static,
    {
        Self {
            inner: Arc::new(ServiceInner {
                factory: Mutex::new(Some(Box::new(factory))),
                detector: OnceLock::new(),
                confidence_threshold,
            }),
        }
    }

    /// Wrap an already built detector.
    pub fn with_detector<D: ObjectDetector + 'static>(confidence_threshold: f64, detector: D) -> Self {
        Self::new(confidence_threshold, move || {
            Ok(Box::new(detector) as Box<dyn ObjectDetector>)
        })
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.inner.confidence_threshold
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.detector.get().is_some()
    }

    /// Detect objects in a base64 image, with or without a data-URL header.
    pub fn detect_image(&self, image: &str) -> Result<DetectionResult, DetectError> {
        let request = DetectionRequest {
            raw_data: strip_data_url_header(image).to_string(),
            output_cropped_image: false,
            confidence_threshold: self.inner.confidence_threshold,
        };
        self.detect(&request)
    }

    pub fn detect(&self, request: &DetectionRequest) -> Result<DetectionResult, DetectError> {
        let slot = self.inner.detector.get_or_init(|| self.construct());
        let detector = slot.as_ref().map_err(Clone::clone)?;
        let mut guard = detector
            .lock()
            .map_err(|_| DetectError::Unavailable("detector lock poisoned".into()))?;
        log::debug!(
            "detect: {} bytes of base64 via {}",
            request.raw_data.len(),
            guard.name()
        );
        guard.detect(request)
    }

    fn construct(&self) -> DetectorSlot {
        let factory = self
            .inner
            .factory
            .lock()
            .map_err(|_| DetectError::Unavailable("detector factory lock poisoned".into()))?
            .take()
            .ok_or_else(|| DetectError::Unavailable("detector factory already consumed".into()))?;
        match factory() {
            Ok(detector) => {
                log::info!("detector '{}' initialised", detector.name());
                Ok(Mutex::new(detector))
            }
            Err(err) => {
                log::error!("detector initialisation failed: {}", err);
                Err(err)
            }
        }
    }
}
