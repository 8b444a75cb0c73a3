//! nvision_detect - run Nvision object detection on an image file or a camera snap
//!
//! Prints the sorted detection list (or JSON) and optionally writes the preview
//! with bounding-box overlays to a PNG.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use image::DynamicImage;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nvision_demo::capture::open_media_devices;
use nvision_demo::config::BackendKind;
use nvision_demo::data_url::decode_data_url;
use nvision_demo::present::render_preview;
use nvision_demo::ui::{Ui, UiMode};
use nvision_demo::{
    AppConfig, BoundingBoxOverlay, CameraWidget, CaptureDimensions, DetectionPage,
    DetectionWorker, FileUploader, InputMode, ResultListView,
};

/// Grace period on top of the HTTP timeout before a camera snap is abandoned.
const WAIT_SLACK: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(
    name = "nvision_detect",
    about = "Detect objects in an image with the Nvision service"
)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension)
    #[arg(long, env = "NVISION_CONFIG", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Detection backend (nvision|stub)
    #[arg(long, value_name = "NAME", global = true)]
    backend: Option<String>,

    /// Confidence threshold sent with each request
    #[arg(long, value_name = "0..1", global = true)]
    threshold: Option<f64>,

    /// Only list objects of this parent category
    #[arg(long, value_name = "CATEGORY", global = true)]
    category: Option<String>,

    /// Highlight one object by its index in the service response
    #[arg(long, value_name = "INDEX", global = true)]
    select: Option<usize>,

    /// Write the preview with overlays to this PNG
    #[arg(long, value_name = "PATH", global = true)]
    overlay_out: Option<PathBuf>,

    /// Print the result as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE", global = true)]
    ui: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload an image file
    File {
        /// Image to analyse (JPEG or PNG)
        path: PathBuf,
    },
    /// Snap from a camera
    Camera {
        /// Device path, or stub://<name> for a synthetic camera
        #[arg(long, value_name = "PATH")]
        device: Option<String>,

        /// Requested capture width
        #[arg(long)]
        width: Option<u32>,

        /// Requested capture height
        #[arg(long)]
        height: Option<u32>,

        /// Number of snaps; the preview is reset between them
        #[arg(long, default_value_t = 1)]
        shots: u32,
    },
}

#[derive(Serialize)]
struct JsonReport<'a> {
    service_id: &'a str,
    scaling_factor: Option<f64>,
    dimensions: Option<CaptureDimensions>,
    result: &'a ResultListView,
    overlays: &'a [BoundingBoxOverlay],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::new(
        UiMode::parse(Some(&args.ui)),
        std::io::stderr().is_terminal(),
    );

    let mut cfg = AppConfig::load_from(args.config.as_deref())?;
    if let Some(backend) = &args.backend {
        cfg.backend = BackendKind::parse(backend)?;
    }
    if let Some(threshold) = args.threshold {
        cfg.detection.confidence_threshold = threshold;
    }
    if let Command::Camera {
        device,
        width,
        height,
        ..
    } = &args.command
    {
        if let Some(device) = device {
            cfg.camera.device = device.clone();
        }
        cfg.camera.width = width.unwrap_or(cfg.camera.width);
        cfg.camera.height = height.unwrap_or(cfg.camera.height);
    }
    cfg.validate()?;
    log::info!(
        "backend {:?}, endpoint {}, threshold {}",
        cfg.backend,
        cfg.detection.endpoint,
        cfg.detection.confidence_threshold
    );

    let mut page = DetectionPage::new(cfg.detection_service());
    match &args.command {
        Command::File { path } => run_file(&args, &cfg, &ui, &mut page, path),
        Command::Camera { shots, .. } => run_camera(&args, &cfg, &ui, &mut page, *shots),
    }
}

fn run_file(
    args: &Args,
    cfg: &AppConfig,
    ui: &Ui,
    page: &mut DetectionPage,
    path: &Path,
) -> Result<()> {
    page.switch_mode(InputMode::Upload);
    let mut uploader = FileUploader::new(cfg.preview.bounds());
    {
        let busy = ui.busy(&format!("Detect {}", path.display()));
        uploader.process_file(path, |data| page.process_file(data));
        if uploader.error().is_some() {
            busy.fail();
        }
    }
    if let Some(message) = uploader.error() {
        ui.banner(message);
        return Err(anyhow!("detection failed for {}", path.display()));
    }
    let source = image::open(path).with_context(|| format!("decode {}", path.display()))?;
    report(args, ui, page, &source)
}

fn run_camera(
    args: &Args,
    cfg: &AppConfig,
    ui: &Ui,
    page: &mut DetectionPage,
    shots: u32,
) -> Result<()> {
    page.switch_mode(InputMode::Camera);
    let mut camera = CameraWidget::new(
        open_media_devices(&cfg.camera.device),
        cfg.camera.constraints(),
        cfg.preview.bounds(),
    );
    camera.mount();
    if let Some(message) = camera.error_message() {
        ui.banner(message);
        return Err(anyhow!("camera {} unavailable", cfg.camera.device));
    }
    if let Some(preview) = camera.preview_dimension() {
        log::info!(
            "camera {} live at {}x{}",
            cfg.camera.device,
            preview.width,
            preview.height
        );
    }

    let worker = DetectionWorker::spawn(page.service().clone())?;
    let timeout = cfg.detection.timeout + WAIT_SLACK;
    for shot in 0..shots {
        if shot > 0 && !camera.reset(|| page.reset()) {
            return Err(anyhow!("camera could not return to live preview"));
        }
        {
            let busy = ui.busy(&format!("Snap {}/{}", shot + 1, shots));
            camera.snap(|snap| {
                page.submit(&worker, snap.base64.clone(), snap.dimensions)?;
                page.wait(&worker, timeout)
            })?;
            if page.state().error.is_some() {
                busy.fail();
            }
        }
        if let Some(message) = &page.state().error {
            ui.banner(message);
            continue;
        }
        let snap = camera
            .captured()
            .ok_or_else(|| anyhow!("camera kept no frame"))?;
        let (_, bytes) = decode_data_url(&snap.base64)?;
        let source = image::load_from_memory(&bytes).context("decode snapped frame")?;
        report(args, ui, page, &source)?;
    }
    camera.unmount();
    Ok(())
}

fn report(args: &Args, ui: &Ui, page: &mut DetectionPage, source: &DynamicImage) -> Result<()> {
    if let Some(category) = &args.category {
        page.select_category(category);
    }
    if let Some(index) = args.select {
        page.select_object(index);
    }
    let state = page.state();
    let Some(result) = &state.result else {
        ui.banner("no detection result");
        return Ok(());
    };
    let view = page
        .result_view()
        .ok_or_else(|| anyhow!("no detection result"))?;
    let overlays = page.overlays();

    if args.json {
        let report = JsonReport {
            service_id: &result.service_id,
            scaling_factor: state.scaling_factor(),
            dimensions: state.dimensions,
            result: &view,
            overlays: &overlays,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("service id: {}", result.service_id);
        print!("{}", view.render_text());
    }

    if let Some(out) = &args.overlay_out {
        let dimensions = state
            .dimensions
            .ok_or_else(|| anyhow!("capture dimensions unknown"))?;
        let canvas = render_preview(source, &dimensions, &overlays);
        canvas
            .save(out)
            .with_context(|| format!("write overlay {}", out.display()))?;
        log::info!("overlay written to {}", out.display());
    }
    Ok(())
}
