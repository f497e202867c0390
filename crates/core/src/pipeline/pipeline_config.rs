use std::time::Duration;

use thiserror::Error;

use crate::detection::domain::detection_scheduler::{
    DEFAULT_DETECTION_INTERVAL, DEFAULT_DETECTION_TIMEOUT, DEFAULT_FAILURE_THRESHOLD,
};
use crate::detection::domain::face_geometry_source::DetectOptions;
use crate::filters::domain::filter_drawing::DEFAULT_PIXEL_SIZE;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("detection interval must be >= 1")]
    ZeroDetectionInterval,
    #[error("detection timeout must be greater than zero")]
    ZeroDetectionTimeout,
    #[error("pixel size must be >= 1")]
    ZeroPixelSize,
    #[error("confidence must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),
}

/// Tunables for one compositor run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Submit a detection every Nth tick.
    pub detection_interval: usize,
    /// Consecutive failures tolerated before cached geometry is dropped.
    pub failure_threshold: u32,
    /// A detection still running after this long counts as failed.
    pub detection_timeout: Duration,
    /// Block edge, in pixels, of the pixelate filter.
    pub pixel_size: u32,
    pub detect_options: DetectOptions,
    /// Draw bounding boxes and landmarks over the filters.
    pub show_detections: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_interval: DEFAULT_DETECTION_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            detection_timeout: DEFAULT_DETECTION_TIMEOUT,
            pixel_size: DEFAULT_PIXEL_SIZE,
            detect_options: DetectOptions::default(),
            show_detections: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection_interval == 0 {
            return Err(ConfigError::ZeroDetectionInterval);
        }
        if self.detection_timeout.is_zero() {
            return Err(ConfigError::ZeroDetectionTimeout);
        }
        if self.pixel_size == 0 {
            return Err(ConfigError::ZeroPixelSize);
        }
        let confidence = self.detect_options.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::ConfidenceOutOfRange(confidence));
        }
        Ok(())
    }
}
