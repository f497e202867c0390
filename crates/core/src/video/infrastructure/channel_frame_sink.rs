use crossbeam_channel::{Sender, TrySendError};

use crate::shared::frame::Frame;
use crate::video::domain::frame_sink::FrameSink;

/// Forwards presented frames to a channel, e.g. a display thread.
///
/// Never blocks the render loop: when the receiver lags and the channel is
/// full, the frame is dropped and counted.
pub struct ChannelFrameSink {
    tx: Sender<Frame>,
    dropped: usize,
}

impl ChannelFrameSink {
    pub fn new(tx: Sender<Frame>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Frames discarded because the channel was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl FrameSink for ChannelFrameSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err("frame receiver disconnected".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, 3, index)
    }

    #[test]
    fn test_forwards_frames_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = ChannelFrameSink::new(tx);
        sink.write(&frame(0)).unwrap();
        sink.write(&frame(1)).unwrap();

        assert_eq!(rx.try_recv().unwrap().index(), 0);
        assert_eq!(rx.try_recv().unwrap().index(), 1);
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut sink = ChannelFrameSink::new(tx);
        sink.write(&frame(0)).unwrap();
        sink.write(&frame(1)).unwrap();

        assert_eq!(sink.dropped(), 1);
        assert_eq!(rx.try_recv().unwrap().index(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnected_receiver_is_error() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let mut sink = ChannelFrameSink::new(tx);
        assert!(sink.write(&frame(0)).is_err());
    }
}
