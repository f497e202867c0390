use crate::detection::domain::detection_scheduler::DetectionScheduler;
use crate::detection::domain::geometry_cache::GeometryCache;
use crate::filters::domain::filter_registry::FilterRegistry;

use super::frame_clock::ClockSubscription;

/// Readiness of the detector models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    NotRequested,
    Loading,
    Ready,
    Failed,
}

/// All mutable state of one compositor run, owned by the render loop.
///
/// Lives from `start` to `stop`; nothing here is shared with other threads.
pub struct PipelineState {
    pub scheduler: DetectionScheduler,
    pub cache: GeometryCache,
    pub registry: FilterRegistry,
    pub models: ModelStatus,
    /// `Some` while subscribed to the frame clock.
    pub subscription: Option<ClockSubscription>,
}

impl PipelineState {
    pub fn new(scheduler: DetectionScheduler, registry: FilterRegistry) -> Self {
        Self {
            scheduler,
            cache: GeometryCache::new(),
            registry,
            models: ModelStatus::NotRequested,
            subscription: None,
        }
    }

    pub fn is_detection_in_flight(&self) -> bool {
        self.scheduler.is_in_flight()
    }

    /// Cancels pending detection and drops the clock subscription.
    pub fn teardown(&mut self) {
        self.subscription = None;
        self.scheduler.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::detection::domain::face_geometry_source::DetectOptions;

    #[test]
    fn test_teardown_unsubscribes_and_bumps_epoch() {
        let scheduler =
            DetectionScheduler::new(1, 5, Duration::from_secs(2), DetectOptions::default());
        let mut state = PipelineState::new(scheduler, FilterRegistry::new());
        let (_tx, rx) = crossbeam_channel::unbounded();
        state.subscription = Some(ClockSubscription::new(rx));
        let epoch = state.scheduler.epoch();

        state.teardown();

        assert!(state.subscription.is_none());
        assert_eq!(state.scheduler.epoch(), epoch + 1);
        assert!(!state.is_detection_in_flight());
        assert_eq!(state.models, ModelStatus::NotRequested);
    }
}
