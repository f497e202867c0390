use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::shared::face_geometry::FaceGeometry;
use crate::shared::frame::Frame;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to load model from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("detection worker is not running")]
    WorkerUnavailable,
}

/// A single failed detection attempt.
///
/// Recovered locally by the scheduler; only sustained failure is surfaced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("detector not ready: models not loaded")]
    NotReady,
    #[error("detection timed out after {0:?}")]
    TimedOut(Duration),
    #[error("detector returned no result")]
    NoResult,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("detector cannot produce {0}")]
    Unsupported(&'static str),
    #[error("detection worker disconnected")]
    Disconnected,
}

/// Per-request detector options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectOptions {
    /// Detections scoring below this are discarded (0.0-1.0).
    pub min_confidence: f64,
    pub with_landmarks: bool,
    /// Request per-face descriptors. Sources that cannot compute them fail
    /// the detection with [`DetectionError::Unsupported`].
    pub with_descriptors: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            with_landmarks: true,
            with_descriptors: false,
        }
    }
}

/// Domain interface for the external face detector.
///
/// Latency is unbounded and accuracy is the implementation's concern.
/// Calls block; the pipeline runs them off the render path.
pub trait FaceGeometrySource: Send {
    fn load_models(&mut self, model_path: &Path) -> Result<(), ModelLoadError>;

    fn detect(
        &mut self,
        frame: &Frame,
        options: &DetectOptions,
    ) -> Result<Vec<FaceGeometry>, DetectionError>;
}
