use std::time::Instant;

use crossbeam_channel::Receiver;

/// Live subscription to a frame clock; one message per display tick.
///
/// Dropping it unsubscribes.
pub struct ClockSubscription {
    ticks: Receiver<Instant>,
}

impl ClockSubscription {
    pub fn new(ticks: Receiver<Instant>) -> Self {
        Self { ticks }
    }

    pub fn ticks(&self) -> &Receiver<Instant> {
        &self.ticks
    }
}

/// Source of display-refresh ticks that drives the compositor.
pub trait FrameClock {
    fn subscribe(&mut self) -> ClockSubscription;
}
