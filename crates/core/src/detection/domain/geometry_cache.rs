use std::sync::Arc;
use std::time::Duration;

use super::detection_result::DetectionResult;

/// Holds the most recent accepted detection for the render path.
///
/// Writes are ordered by capture time, not completion order. The capture-time
/// watermark survives [`GeometryCache::clear`], so a late result for an older
/// frame can never resurrect stale geometry.
#[derive(Debug, Default)]
pub struct GeometryCache {
    latest: Option<Arc<DetectionResult>>,
    watermark: Option<Duration>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best available result; never blocks.
    pub fn get(&self) -> Option<Arc<DetectionResult>> {
        self.latest.clone()
    }

    /// Stores `result` unless it was captured before the last accepted one.
    ///
    /// Returns whether the result was accepted.
    pub fn put(&mut self, result: DetectionResult) -> bool {
        if self.watermark.is_some_and(|w| result.captured_at < w) {
            log::debug!(
                "Discarding out-of-order detection for frame {} ({:?} < {:?})",
                result.frame_id,
                result.captured_at,
                self.watermark
            );
            return false;
        }
        self.watermark = Some(result.captured_at);
        self.latest = Some(Arc::new(result));
        true
    }

    /// Drops the cached result; the watermark is kept.
    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}
