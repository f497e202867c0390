use std::time::Duration;

use crate::shared::face_geometry::FaceGeometry;

/// Faces found in one frame, stamped with that frame's capture time.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionResult {
    pub geometries: Vec<FaceGeometry>,
    pub captured_at: Duration,
    pub frame_id: usize,
}

impl DetectionResult {
    pub fn new(geometries: Vec<FaceGeometry>, captured_at: Duration, frame_id: usize) -> Self {
        Self {
            geometries,
            captured_at,
            frame_id,
        }
    }

    pub fn face_count(&self) -> usize {
        self.geometries.len()
    }
}
