use std::time::{Duration, Instant};

use crate::shared::frame::Frame;

use super::detection_executor::{DetectionCompletion, DetectionExecutor, DetectionRequest};
use super::detection_result::DetectionResult;
use super::face_geometry_source::{DetectOptions, DetectionError};
use super::geometry_cache::GeometryCache;

pub const DEFAULT_DETECTION_INTERVAL: usize = 1;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Raised once when consecutive detection failures exceed the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionDegraded {
    pub consecutive_failures: u32,
}

#[derive(Debug, PartialEq)]
pub enum SubmitOutcome {
    Submitted,
    /// A request is already in flight; the frame was dropped.
    Busy,
    /// Not a detection tick under the configured interval.
    Throttled,
    /// The executor refused the request; counted as a failed detection.
    Rejected {
        error: DetectionError,
        degraded: Option<DetectionDegraded>,
    },
    /// The request in flight outlived the timeout. It was abandoned and
    /// counted as a failed detection; its completion will come back stale.
    TimedOut {
        error: DetectionError,
        degraded: Option<DetectionDegraded>,
    },
}

#[derive(Debug, PartialEq)]
pub enum CompletionOutcome {
    Accepted { faces: usize },
    /// Result was older than what the cache already holds.
    OutOfOrder,
    /// Issued before the last [`DetectionScheduler::cancel`]; ignored.
    Stale,
    Failed {
        error: DetectionError,
        degraded: Option<DetectionDegraded>,
    },
}

/// Decides when frames go to the detector and folds results into the cache.
///
/// At most one request is in flight. Frames arriving while busy are dropped
/// rather than queued, so a slow detector never builds a backlog. Failed
/// detections keep the previous geometry until more than `failure_threshold`
/// fail in a row, at which point the cache is cleared. A request still
/// running after `timeout` counts as a failure and frees the slot.
pub struct DetectionScheduler {
    interval: usize,
    failure_threshold: u32,
    timeout: Duration,
    options: DetectOptions,
    tick_count: usize,
    in_flight: Option<InFlight>,
    epoch: u64,
    consecutive_failures: u32,
    dropped_frames: usize,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    frame_id: usize,
    submitted_at: Instant,
}

impl DetectionScheduler {
    /// An `interval` of 0 is treated as 1; [`PipelineConfig::validate`]
    /// rejects it before it gets here.
    ///
    /// [`PipelineConfig::validate`]: crate::pipeline::pipeline_config::PipelineConfig::validate
    pub fn new(
        interval: usize,
        failure_threshold: u32,
        timeout: Duration,
        options: DetectOptions,
    ) -> Self {
        Self {
            interval: interval.max(1),
            failure_threshold,
            timeout,
            options,
            tick_count: 0,
            in_flight: None,
            epoch: 0,
            consecutive_failures: 0,
            dropped_frames: 0,
        }
    }

    /// Called once per rendered tick with the frame just acquired.
    pub fn on_frame_available(
        &mut self,
        frame: &Frame,
        executor: &mut dyn DetectionExecutor,
        cache: &mut GeometryCache,
    ) -> SubmitOutcome {
        self.on_frame_available_at(frame, Instant::now(), executor, cache)
    }

    /// [`Self::on_frame_available`] with an explicit wall-clock reading.
    pub fn on_frame_available_at(
        &mut self,
        frame: &Frame,
        now: Instant,
        executor: &mut dyn DetectionExecutor,
        cache: &mut GeometryCache,
    ) -> SubmitOutcome {
        let due = self.tick_count % self.interval == 0;
        self.tick_count += 1;

        if let Some(request) = self.in_flight {
            let waited = now.saturating_duration_since(request.submitted_at);
            if waited > self.timeout {
                log::warn!(
                    "Detection for frame {} still running after {:.0}ms; abandoning it",
                    request.frame_id,
                    waited.as_secs_f64() * 1000.0
                );
                // Bumping the epoch turns the eventual completion stale.
                self.cancel();
                let degraded = self.record_failure(cache);
                return SubmitOutcome::TimedOut {
                    error: DetectionError::TimedOut(self.timeout),
                    degraded,
                };
            }
        }

        if !due {
            return SubmitOutcome::Throttled;
        }
        if self.in_flight.is_some() {
            self.dropped_frames += 1;
            return SubmitOutcome::Busy;
        }

        let request = DetectionRequest {
            frame: frame.clone(),
            options: self.options,
            epoch: self.epoch,
        };
        match executor.submit(request) {
            Ok(()) => {
                self.in_flight = Some(InFlight {
                    frame_id: frame.index(),
                    submitted_at: now,
                });
                SubmitOutcome::Submitted
            }
            Err(error) => {
                let degraded = self.record_failure(cache);
                SubmitOutcome::Rejected { error, degraded }
            }
        }
    }

    /// Merges a finished request into `cache` and clears the in-flight slot.
    pub fn on_completion(
        &mut self,
        completion: DetectionCompletion,
        cache: &mut GeometryCache,
    ) -> CompletionOutcome {
        if completion.epoch != self.epoch {
            log::debug!(
                "Dropping detection for frame {} from cancelled epoch {}",
                completion.frame_id,
                completion.epoch
            );
            return CompletionOutcome::Stale;
        }
        self.in_flight = None;

        match completion.outcome {
            Ok(geometries) => {
                self.consecutive_failures = 0;
                let faces = geometries.len();
                let result =
                    DetectionResult::new(geometries, completion.captured_at, completion.frame_id);
                if cache.put(result) {
                    CompletionOutcome::Accepted { faces }
                } else {
                    CompletionOutcome::OutOfOrder
                }
            }
            Err(error) => {
                log::debug!("Detection failed for frame {}: {error}", completion.frame_id);
                let degraded = self.record_failure(cache);
                CompletionOutcome::Failed { error, degraded }
            }
        }
    }

    /// Invalidates any request in flight. Its completion will be ignored.
    pub fn cancel(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.in_flight = None;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Frames dropped because a detection was still running.
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    fn record_failure(&mut self, cache: &mut GeometryCache) -> Option<DetectionDegraded> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures <= self.failure_threshold {
            return None;
        }
        cache.clear();
        if self.consecutive_failures == self.failure_threshold + 1 {
            Some(DetectionDegraded {
                consecutive_failures: self.consecutive_failures,
            })
        } else {
            None
        }
    }
}
