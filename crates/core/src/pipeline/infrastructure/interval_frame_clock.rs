use std::time::Duration;

use crate::pipeline::frame_clock::{ClockSubscription, FrameClock};
use crate::shared::constants::DEFAULT_FPS;

/// Fixed-rate frame clock built on [`crossbeam_channel::tick`].
///
/// Ticks that the consumer does not pick up in time are coalesced, so a slow
/// render loop never sees a backlog.
pub struct IntervalFrameClock {
    period: Duration,
}

impl IntervalFrameClock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Clock ticking `fps` times per second; non-positive or non-finite
    /// rates fall back to the default display rate.
    pub fn from_fps(fps: f64) -> Self {
        let fps = if fps > 0.0 && fps.is_finite() {
            fps
        } else {
            DEFAULT_FPS
        };
        Self::new(Duration::from_secs_f64(1.0 / fps))
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl FrameClock for IntervalFrameClock {
    fn subscribe(&mut self) -> ClockSubscription {
        ClockSubscription::new(crossbeam_channel::tick(self.period))
    }
}
