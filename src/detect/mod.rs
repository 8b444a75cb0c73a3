mod backend;
pub mod backends;
mod error;
mod result;
mod service;

pub use backend::ObjectDetector;
pub use backends::{NvisionBackend, NvisionConfig, StubBackend};
pub use error::DetectError;
pub use result::{DetectedObject, DetectionRequest, DetectionResult};
pub use service::DetectionService;
