//! Nvision object-detection REST backend.
//!
//! The request carries the header-stripped base64 image plus the service
//! configuration list. Cropped-image output is always disabled.

use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::detect::backend::ObjectDetector;
use crate::detect::error::DetectError;
use crate::detect::result::{DetectionRequest, DetectionResult};

pub const DEFAULT_ENDPOINT: &str = "https://nvision.nipa.cloud/api/v1/object-detection";

#[derive(Clone, Debug)]
pub struct NvisionConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for NvisionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct PredictBody<'a> {
    raw_data: &'a str,
    configurations: Vec<Configuration>,
}

#[derive(Serialize)]
struct Configuration {
    parameter: &'static str,
    value: String,
}

pub struct NvisionBackend {
    agent: ureq::Agent,
    endpoint: Url,
    api_key: String,
}

impl NvisionBackend {
    pub fn new(config: NvisionConfig) -> Result<Self, DetectError> {
        if config.api_key.trim().is_empty() {
            return Err(DetectError::MissingApiKey);
        }
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            DetectError::Unavailable(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        log::debug!("nvision backend configured for {}", endpoint);
        Ok(Self {
            agent,
            endpoint,
            api_key: config.api_key,
        })
    }
}

fn build_body(request: &DetectionRequest) -> PredictBody<'_> {
    PredictBody {
        raw_data: &request.raw_data,
        configurations: vec![
            Configuration {
                parameter: "OutputCroppedImage",
                value: request.output_cropped_image.to_string(),
            },
            Configuration {
                parameter: "ConfidenceThreshold",
                value: request.confidence_threshold.to_string(),
            },
        ],
    }
}

impl ObjectDetector for NvisionBackend {
    fn name(&self) -> &'static str {
        "nvision"
    }

    fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionResult, DetectError> {
        let response = self
            .agent
            .post(self.endpoint.as_str())
            .set("Authorization", &format!("ApiKey {}", self.api_key))
            .send_json(build_body(request))?;
        let result: DetectionResult = response
            .into_json()
            .map_err(|e| DetectError::Decode(e.to_string()))?;
        log::info!(
            "nvision: service {} returned {} object(s)",
            result.service_id,
            result.detected_objects.len()
        );
        Ok(result)
    }
}
