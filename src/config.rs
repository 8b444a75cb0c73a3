use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::Constraints;
use crate::detect::{
    DetectionService, NvisionBackend, NvisionConfig, ObjectDetector, StubBackend,
};
use crate::geometry::Dimension;

const DEFAULT_ENDPOINT: &str = crate::detect::backends::DEFAULT_ENDPOINT;
const DEFAULT_BACKEND: &str = "nvision";
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.2;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_WIDTH: u32 = 400;
const DEFAULT_CAMERA_HEIGHT: u32 = 300;
const DEFAULT_PREVIEW_MAX_WIDTH: u32 = 640;
const DEFAULT_PREVIEW_HEIGHT: u32 = 300;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    api_key: Option<String>,
    backend: Option<String>,
    detection: Option<DetectionConfigFile>,
    camera: Option<CameraConfigFile>,
    preview: Option<PreviewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    endpoint: Option<String>,
    confidence_threshold: Option<f64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    max_width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Nvision,
    Stub,
}

impl BackendKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nvision" => Ok(BackendKind::Nvision),
            "stub" => Ok(BackendKind::Stub),
            other => Err(anyhow!(
                "unknown detection backend '{}'; expected nvision or stub",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub backend: BackendKind,
    pub detection: DetectionSettings,
    pub camera: CameraSettings,
    pub preview: PreviewSettings,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub endpoint: String,
    /// Confidence floor sent with every request.
    pub confidence_threshold: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl CameraSettings {
    pub fn constraints(&self) -> Constraints {
        Constraints {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub max_width: u32,
    pub height: u32,
}

impl PreviewSettings {
    pub fn bounds(&self) -> Dimension {
        Dimension::new(self.max_width, self.height)
    }
}

impl AppConfig {
    /// Defaults, then the file named by `NVISION_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("NVISION_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AppConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Result<Self> {
        let backend = BackendKind::parse(file.backend.as_deref().unwrap_or(DEFAULT_BACKEND))?;
        let detection = file.detection.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let preview = file.preview.unwrap_or_default();
        Ok(Self {
            api_key: file.api_key.unwrap_or_default(),
            backend,
            detection: DetectionSettings {
                endpoint: detection
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                confidence_threshold: detection
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                timeout: Duration::from_secs(
                    detection.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                ),
            },
            camera: CameraSettings {
                device: camera
                    .device
                    .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            },
            preview: PreviewSettings {
                max_width: preview.max_width.unwrap_or(DEFAULT_PREVIEW_MAX_WIDTH),
                height: preview.height.unwrap_or(DEFAULT_PREVIEW_HEIGHT),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(key) = non_empty_env("NVISION_API_KEY") {
            self.api_key = key;
        }
        if let Some(backend) = non_empty_env("NVISION_BACKEND") {
            self.backend = BackendKind::parse(&backend)?;
        }
        if let Some(endpoint) = non_empty_env("NVISION_ENDPOINT") {
            self.detection.endpoint = endpoint;
        }
        if let Some(threshold) = non_empty_env("NVISION_CONFIDENCE_THRESHOLD") {
            self.detection.confidence_threshold = threshold.parse().map_err(|_| {
                anyhow!("NVISION_CONFIDENCE_THRESHOLD must be a number between 0 and 1")
            })?;
        }
        if let Some(timeout) = non_empty_env("NVISION_TIMEOUT_SECS") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("NVISION_TIMEOUT_SECS must be an integer number of seconds"))?;
            self.detection.timeout = Duration::from_secs(seconds);
        }
        if let Some(device) = non_empty_env("NVISION_CAMERA_DEVICE") {
            self.camera.device = device;
        }
        Ok(())
    }

    /// Range and format checks; call again after overriding fields.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                threshold
            ));
        }
        url::Url::parse(&self.detection.endpoint).map_err(|e| {
            anyhow!("invalid detection endpoint '{}': {}", self.detection.endpoint, e)
        })?;
        if self.detection.timeout.is_zero() {
            return Err(anyhow!("detection timeout must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.preview.bounds().is_empty() {
            return Err(anyhow!("preview max_width and height must be greater than zero"));
        }
        Ok(())
    }

    /// Detection handle for this configuration. The backend is built on first use.
    pub fn detection_service(&self) -> DetectionService {
        let backend = self.backend;
        let nvision = NvisionConfig {
            api_key: self.api_key.clone(),
            endpoint: self.detection.endpoint.clone(),
            timeout: self.detection.timeout,
        };
        DetectionService::new(self.detection.confidence_threshold, move || {
            let detector: Box<dyn ObjectDetector> = match backend {
                BackendKind::Nvision => Box::new(NvisionBackend::new(nvision)?),
                BackendKind::Stub => Box::new(StubBackend::new()),
            };
            Ok(detector)
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: AppConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
