/// Properties of a started video source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0.0 when the source does not report one.
    pub fps: f64,
    /// Human-readable origin (file path, URL, ...), used in log lines.
    pub source: String,
}

impl VideoMetadata {
    /// Frame period derived from `fps`, or `None` for rate-less sources.
    pub fn frame_period(&self) -> Option<std::time::Duration> {
        if self.fps > 0.0 && self.fps.is_finite() {
            Some(std::time::Duration::from_secs_f64(1.0 / self.fps))
        } else {
            None
        }
    }
}
