use std::path::Path;
use std::time::Duration;

use crate::shared::face_geometry::FaceGeometry;
use crate::shared::frame::Frame;

use super::face_geometry_source::{DetectOptions, DetectionError, ModelLoadError};

/// A frame submitted for detection, tagged with the scheduler epoch that
/// issued it.
#[derive(Clone, Debug)]
pub struct DetectionRequest {
    pub frame: Frame,
    pub options: DetectOptions,
    pub epoch: u64,
}

/// Outcome of one detection request, delivered back to the render thread.
#[derive(Clone, Debug)]
pub struct DetectionCompletion {
    pub epoch: u64,
    pub frame_id: usize,
    pub captured_at: Duration,
    pub outcome: Result<Vec<FaceGeometry>, DetectionError>,
    /// Wall time the detector spent on the request.
    pub elapsed: Duration,
}

impl DetectionCompletion {
    /// Completion for `request` with the given outcome.
    pub fn for_request(
        request: &DetectionRequest,
        outcome: Result<Vec<FaceGeometry>, DetectionError>,
        elapsed: Duration,
    ) -> Self {
        Self {
            epoch: request.epoch,
            frame_id: request.frame.index(),
            captured_at: request.frame.timestamp(),
            outcome,
            elapsed,
        }
    }
}

#[derive(Debug)]
pub enum DetectionEvent {
    ModelsLoaded(Result<(), ModelLoadError>),
    Completed(DetectionCompletion),
}

/// Runs a face geometry source off the render path.
///
/// This is a port: the render loop only submits work and polls for events,
/// so it never waits on the detector. Infrastructure provides the concrete
/// threading.
pub trait DetectionExecutor: Send {
    /// Starts model initialization; the result arrives as
    /// [`DetectionEvent::ModelsLoaded`].
    fn load_models(&mut self, model_path: &Path) -> Result<(), ModelLoadError>;

    /// Hands a frame to the detector without waiting for the result.
    fn submit(&mut self, request: DetectionRequest) -> Result<(), DetectionError>;

    /// Next pending event, if any. Never blocks.
    fn poll(&mut self) -> Option<DetectionEvent>;

    /// Stops accepting work. Does not wait for a request already running.
    fn shutdown(&mut self);
}
