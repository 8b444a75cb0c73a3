//! Page-level controller.
//!
//! `PageState` is an immutable value; every user action or completion produces a
//! complete new state through one transition function. `DetectionPage` holds the
//! current state together with the detection service handle.
//!
//! Every capture bumps a `Generation`. A response is applied only when its
//! generation is still current, so a slow earlier request can never overwrite the
//! result of a later capture.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::capture::{ProcessFileData, SnapData};
use crate::detect::{DetectError, DetectionResult, DetectionService};
use crate::geometry::CaptureDimensions;
use crate::present::{visible_overlays, BoundingBoxOverlay, FilterState, ResultListView};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Upload,
    Camera,
}

/// Capture counter used to discard stale responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageState {
    pub mode: InputMode,
    pub loading: bool,
    pub result: Option<DetectionResult>,
    /// Dimensions of the capture `result` belongs to.
    pub dimensions: Option<CaptureDimensions>,
    pub filter: FilterState,
    /// Detection failure shown to the user.
    pub error: Option<String>,
    pub generation: Generation,
}

impl PageState {
    /// Start a new capture: previous result, filter and error are dropped.
    pub fn begin_capture(&self, dimensions: CaptureDimensions) -> PageState {
        PageState {
            mode: self.mode,
            loading: true,
            result: None,
            dimensions: Some(dimensions),
            filter: FilterState::default(),
            error: None,
            generation: self.generation.next(),
        }
    }

    /// Apply a response. Responses from older generations leave the state as is.
    pub fn apply_response(
        &self,
        generation: Generation,
        response: Result<DetectionResult, DetectError>,
    ) -> PageState {
        if generation != self.generation {
            return self.clone();
        }
        match response {
            Ok(result) => PageState {
                loading: false,
                result: Some(result),
                error: None,
                ..self.clone()
            },
            Err(err) => PageState {
                loading: false,
                result: None,
                error: Some(err.to_string()),
                ..self.clone()
            },
        }
    }

    /// Remove file / retake photo. In-flight responses become stale.
    pub fn cleared(&self) -> PageState {
        PageState {
            mode: self.mode,
            generation: self.generation.next(),
            ..PageState::default()
        }
    }

    pub fn with_mode(&self, mode: InputMode) -> PageState {
        if mode == self.mode {
            return self.clone();
        }
        PageState {
            mode,
            ..self.cleared()
        }
    }

    pub fn with_filter(&self, filter: FilterState) -> PageState {
        PageState {
            filter,
            ..self.clone()
        }
    }

    pub fn scaling_factor(&self) -> Option<f64> {
        self.dimensions.map(|dims| dims.scaling_factor())
    }
}

pub struct DetectionPage {
    service: DetectionService,
    state: PageState,
}

impl DetectionPage {
    pub fn new(service: DetectionService) -> Self {
        Self {
            service,
            state: PageState::default(),
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn service(&self) -> &DetectionService {
        &self.service
    }

    pub fn switch_mode(&mut self, mode: InputMode) {
        self.state = self.state.with_mode(mode);
    }

    pub fn begin_capture(&mut self, dimensions: CaptureDimensions) -> Generation {
        self.state = self.state.begin_capture(dimensions);
        self.state.generation
    }

    /// Returns true when the response belonged to the current capture.
    pub fn apply_response(
        &mut self,
        generation: Generation,
        response: Result<DetectionResult, DetectError>,
    ) -> bool {
        if generation != self.state.generation {
            log::debug!(
                "discarding stale response {:?} (current {:?})",
                generation,
                self.state.generation
            );
            return false;
        }
        if let Err(err) = &response {
            log::error!("detection failed: {}", err);
        }
        self.state = self.state.apply_response(generation, response);
        true
    }

    pub fn reset(&mut self) {
        self.state = self.state.cleared();
    }

    pub fn select_category(&mut self, category: &str) {
        self.state = self.state.with_filter(self.state.filter.select_category(category));
    }

    pub fn select_object(&mut self, original_index: usize) {
        self.state = self.state.with_filter(self.state.filter.select_object(original_index));
    }

    /// Upload callback: detect synchronously and return the service id.
    pub fn process_file(&mut self, upload: &ProcessFileData) -> Result<String> {
        let generation = self.begin_capture(upload.dimensions);
        let response = self.service.detect_image(&upload.data_url);
        let service_id = response
            .as_ref()
            .map(|r| r.service_id.clone())
            .map_err(Clone::clone);
        self.apply_response(generation, response);
        service_id.map_err(|err| anyhow!(err))
    }

    /// Camera snap callback.
    pub fn on_snap(&mut self, snap: &SnapData) -> Result<()> {
        let generation = self.begin_capture(snap.dimensions);
        let response = self.service.detect_image(&snap.base64);
        let outcome = response.as_ref().map(|_| ()).map_err(|err| anyhow!(err.clone()));
        self.apply_response(generation, response);
        outcome
    }

    /// Start a capture and hand the image to a background worker.
    pub fn submit(
        &mut self,
        worker: &DetectionWorker,
        image: String,
        dimensions: CaptureDimensions,
    ) -> Result<Generation> {
        let generation = self.begin_capture(dimensions);
        if let Err(err) = worker.submit(generation, image) {
            self.apply_response(
                generation,
                Err(DetectError::Unavailable(err.to_string())),
            );
            return Err(err);
        }
        Ok(generation)
    }

    /// Apply every response the worker has ready.
    pub fn poll(&mut self, worker: &DetectionWorker) {
        while let Some((generation, response)) = worker.try_recv() {
            self.apply_response(generation, response);
        }
    }

    /// Block until the current capture has a result or `timeout` elapses.
    pub fn wait(&mut self, worker: &DetectionWorker, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while self.state.loading {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let err = DetectError::Transport(format!("no response within {:?}", timeout));
                self.apply_response(self.state.generation, Err(err.clone()));
                return Err(anyhow!(err));
            }
            match worker.recv_timeout(remaining) {
                Some((generation, response)) => {
                    self.apply_response(generation, response);
                }
                None if worker.is_closed() => {
                    let err = DetectError::Unavailable("detection worker stopped".into());
                    self.apply_response(self.state.generation, Err(err.clone()));
                    return Err(anyhow!(err));
                }
                None => {}
            }
        }
        Ok(())
    }

    pub fn result_view(&self) -> Option<ResultListView> {
        self.state
            .result
            .as_ref()
            .map(|result| ResultListView::build(&result.detected_objects, &self.state.filter))
    }

    /// Visible boxes scaled for the current capture.
    pub fn overlays(&self) -> Vec<BoundingBoxOverlay> {
        match &self.state.result {
            Some(result) => visible_overlays(
                &result.detected_objects,
                &self.state.filter,
                self.state.scaling_factor(),
            ),
            None => Vec::new(),
        }
    }
}

type Job = (Generation, String);
pub type WorkerResponse = (Generation, Result<DetectionResult, DetectError>);

/// Runs detections off the calling thread, one at a time, in submission order.
pub struct DetectionWorker {
    jobs: Option<Sender<Job>>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
    closed: std::cell::Cell<bool>,
}

impl DetectionWorker {
    pub fn spawn(service: DetectionService) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (resp_tx, resp_rx) = mpsc::channel::<WorkerResponse>();
        let handle = std::thread::Builder::new()
            .name("detection-worker".into())
            .spawn(move || {
                for (generation, image) in job_rx {
                    let response = service.detect_image(&image);
                    if resp_tx.send((generation, response)).is_err() {
                        break;
                    }
                }
                log::debug!("detection worker exiting");
            })?;
        Ok(Self {
            jobs: Some(job_tx),
            responses: resp_rx,
            handle: Some(handle),
            closed: std::cell::Cell::new(false),
        })
    }

    pub fn submit(&self, generation: Generation, image: String) -> Result<()> {
        self.jobs
            .as_ref()
            .ok_or_else(|| anyhow!("detection worker shut down"))?
            .send((generation, image))
            .map_err(|_| anyhow!("detection worker stopped"))
    }

    pub fn try_recv(&self) -> Option<WorkerResponse> {
        self.responses.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerResponse> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed.set(true);
                None
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("detection worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectedObject, DetectionRequest, ObjectDetector, StubBackend};
    use crate::geometry::{BoundingBox, Dimension};

    fn dims(image_width: u32, preview_width: u32) -> CaptureDimensions {
        CaptureDimensions::new(
            Dimension::new(image_width, image_width),
            Dimension::new(preview_width, preview_width),
        )
    }

    fn result(id: &str) -> DetectionResult {
        DetectionResult {
            service_id: id.to_string(),
            detected_objects: vec![DetectedObject {
                name: "person".into(),
                parent: "human".into(),
                confidence: 0.8,
                bounding_box: BoundingBox {
                    top: 100.0,
                    left: 400.0,
                    right: 800.0,
                    bottom: 300.0,
                },
            }],
        }
    }

    fn page() -> DetectionPage {
        DetectionPage::new(DetectionService::with_detector(0.2, StubBackend::new()))
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut page = page();
        let first = page.begin_capture(dims(1200, 300));
        let second = page.begin_capture(dims(800, 400));
        assert!(second > first);

        assert!(!page.apply_response(first, Ok(result("old"))));
        assert!(page.state().loading);
        assert!(page.state().result.is_none());

        assert!(page.apply_response(second, Ok(result("new"))));
        assert!(!page.state().loading);
        assert_eq!(page.state().result.as_ref().unwrap().service_id, "new");
        assert_eq!(page.state().scaling_factor(), Some(0.5));
    }

    #[test]
    fn failure_is_surfaced_and_loading_cleared() {
        let mut page = page();
        let generation = page.begin_capture(dims(100, 100));
        page.apply_response(
            generation,
            Err(DetectError::Status {
                code: 401,
                body: "bad key".into(),
            }),
        );
        let state = page.state();
        assert!(!state.loading);
        assert!(state.error.as_deref().unwrap().contains("401"));
    }

    #[test]
    fn scaling_factor_follows_latest_capture() {
        let mut page = page();
        let generation = page.begin_capture(dims(1200, 300));
        page.apply_response(generation, Ok(result("a")));
        assert_eq!(page.overlays()[0].rect.left, 100.0);

        let generation = page.begin_capture(dims(400, 400));
        page.apply_response(generation, Ok(result("b")));
        assert_eq!(page.overlays()[0].rect.left, 400.0);
    }

    #[test]
    fn reset_and_mode_switch_wipe_state() {
        let mut page = page();
        let generation = page.begin_capture(dims(100, 100));
        page.apply_response(generation, Ok(result("a")));
        page.select_category("human");
        page.select_object(0);

        page.reset();
        assert!(page.state().result.is_none());
        assert_eq!(page.state().filter, FilterState::default());

        let generation = page.begin_capture(dims(100, 100));
        page.switch_mode(InputMode::Camera);
        assert_eq!(page.state().mode, InputMode::Camera);
        assert!(!page.state().loading);
        assert!(!page.apply_response(generation, Ok(result("late"))));
        assert!(page.state().result.is_none());
    }

    #[test]
    fn filter_transitions_through_page() {
        let mut page = page();
        let generation = page.begin_capture(dims(100, 100));
        page.apply_response(generation, Ok(result("a")));
        page.select_category("human");
        page.select_object(0);
        assert_eq!(page.state().filter.active_category.as_deref(), Some("human"));
        page.select_category("animal");
        assert_eq!(page.state().filter.active_object_index, None);
        assert!(page.overlays().is_empty());
    }

    struct SlowBackend;

    impl ObjectDetector for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn detect(&mut self, request: &DetectionRequest) -> Result<DetectionResult, DetectError> {
            if request.raw_data == "slow" {
                std::thread::sleep(Duration::from_millis(100));
            }
            Ok(result(&request.raw_data))
        }
    }

    #[test]
    fn worker_results_from_superseded_captures_are_ignored() -> Result<()> {
        let service = DetectionService::with_detector(0.2, SlowBackend);
        let worker = DetectionWorker::spawn(service.clone())?;
        let mut page = DetectionPage::new(service);

        page.submit(&worker, "slow".into(), dims(100, 100))?;
        page.submit(&worker, "fast".into(), dims(100, 50))?;
        page.wait(&worker, Duration::from_secs(5))?;

        let state = page.state();
        assert_eq!(state.result.as_ref().unwrap().service_id, "fast");
        assert_eq!(state.scaling_factor(), Some(0.5));
        Ok(())
    }

    #[test]
    fn wait_past_deadline_surfaces_timeout() -> Result<()> {
        let service = DetectionService::with_detector(0.2, SlowBackend);
        let worker = DetectionWorker::spawn(service.clone())?;
        let mut page = DetectionPage::new(service);

        page.submit(&worker, "slow".into(), dims(100, 100))?;
        assert!(page.wait(&worker, Duration::from_millis(10)).is_err());

        let state = page.state();
        assert!(!state.loading);
        assert!(state.result.is_none());
        assert!(state.error.as_deref().unwrap().contains("no response within"));
        Ok(())
    }

    struct PanickingBackend;

    impl ObjectDetector for PanickingBackend {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn detect(&mut self, _: &DetectionRequest) -> Result<DetectionResult, DetectError> {
            panic!("detector crashed");
        }
    }

    #[test]
    fn stopped_worker_surfaces_error_and_clears_loading() -> Result<()> {
        let service = DetectionService::with_detector(0.2, PanickingBackend);
        let worker = DetectionWorker::spawn(service.clone())?;
        let mut page = DetectionPage::new(service);

        page.submit(&worker, "frame".into(), dims(100, 100))?;
        let err = page.wait(&worker, Duration::from_secs(2)).unwrap_err();
        assert!(err.to_string().contains("detection worker stopped"));

        let state = page.state();
        assert!(!state.loading);
        assert!(state.error.as_deref().unwrap().contains("detection worker stopped"));
        Ok(())
    }

    #[test]
    fn process_file_returns_service_id_or_error() {
        let mut page = page();
        let upload = ProcessFileData {
            path: "frame.png".into(),
            data_url: "data:image/png;base64,iVBOR".into(),
            dimensions: dims(100, 100),
        };
        assert_eq!(page.process_file(&upload).unwrap(), "stub-1");

        let empty = ProcessFileData {
            data_url: "data:image/png;base64,".into(),
            ..upload
        };
        assert!(page.process_file(&empty).is_err());
        assert!(page.state().error.is_some());
        assert!(!page.state().loading);
    }
}
