/// A point in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned rectangle in frame pixel coordinates.
///
/// Coordinates are fractional; surfaces decide how to rasterize them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when every coordinate is finite and both sides are positive.
    pub fn is_drawable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Intersection with the `width × height` frame, or `None` if disjoint.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x1 = self.x.max(0.0);
        let y1 = self.y.max(0.0);
        let x2 = self.right().min(width as f64);
        let y2 = self.bottom().min(height as f64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }
}

/// Geometry of one detected face in one frame.
///
/// Produced by a face geometry source, immutable once created, and replaced
/// wholesale by the next detection cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceGeometry {
    pub bounding_box: Rect,
    /// Landmark points in detector order (e.g. eyes, nose, mouth, ears).
    pub landmarks: Vec<Point>,
    /// Optional fixed-length identity descriptor.
    pub descriptor: Option<Vec<f32>>,
}

impl FaceGeometry {
    pub fn new(bounding_box: Rect) -> Self {
        Self {
            bounding_box,
            landmarks: Vec::new(),
            descriptor: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: Vec<Point>) -> Self {
        self.landmarks = landmarks;
        self
    }

    pub fn with_descriptor(mut self, descriptor: Vec<f32>) -> Self {
        self.descriptor = Some(descriptor);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(100.0, 50.0, 200.0, 150.0);
        assert_relative_eq!(r.right(), 300.0);
        assert_relative_eq!(r.bottom(), 200.0);
    }

    #[rstest]
    #[case::regular(Rect::new(0.0, 0.0, 10.0, 10.0), true)]
    #[case::zero_width(Rect::new(0.0, 0.0, 0.0, 10.0), false)]
    #[case::negative_height(Rect::new(0.0, 0.0, 10.0, -1.0), false)]
    #[case::nan_x(Rect::new(f64::NAN, 0.0, 10.0, 10.0), false)]
    #[case::infinite_width(Rect::new(0.0, 0.0, f64::INFINITY, 10.0), false)]
    fn test_rect_is_drawable(#[case] rect: Rect, #[case] expected: bool) {
        assert_eq!(rect.is_drawable(), expected);
    }

    #[test]
    fn test_clamp_inside_frame_is_unchanged() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.clamp_to(100, 100), Some(r));
    }

    #[test]
    fn test_clamp_crops_at_edges() {
        let r = Rect::new(-10.0, 90.0, 30.0, 40.0);
        let clamped = r.clamp_to(100, 100).unwrap();
        assert_relative_eq!(clamped.x, 0.0);
        assert_relative_eq!(clamped.y, 90.0);
        assert_relative_eq!(clamped.width, 20.0);
        assert_relative_eq!(clamped.height, 10.0);
    }

    #[test]
    fn test_clamp_outside_frame_is_none() {
        let r = Rect::new(150.0, 150.0, 10.0, 10.0);
        assert!(r.clamp_to(100, 100).is_none());
    }

    #[test]
    fn test_face_geometry_builders() {
        let face = FaceGeometry::new(Rect::new(0.0, 0.0, 10.0, 10.0))
            .with_landmarks(vec![Point::new(1.0, 2.0)])
            .with_descriptor(vec![0.5; 4]);
        assert_eq!(face.landmarks, vec![Point::new(1.0, 2.0)]);
        assert_eq!(face.descriptor.as_deref(), Some(&[0.5f32; 4][..]));
    }
}
