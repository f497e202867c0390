use crate::shared::frame::Frame;

/// Destination for composited frames (display, files, a channel).
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and releases the sink. Default: no-op.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Discards every frame.
pub struct NullFrameSink;

impl FrameSink for NullFrameSink {
    fn write(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
