use thiserror::Error;

use crate::shared::face_geometry::{Point, Rect};
use crate::shared::frame::Frame;

/// Opaque RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const PURPLE: Color = Color::rgb(128, 0, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn lerp(self, other: Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient axis, 0.0-1.0.
    pub offset: f64,
    pub color: Color,
}

impl GradientStop {
    pub const fn new(offset: f64, color: Color) -> Self {
        Self { offset, color }
    }
}

/// Linear gradient between two points with ordered color stops.
///
/// Colors are interpolated in RGB between neighbouring stops and held at the
/// first/last stop outside the `[start, end]` span.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point, stops: Vec<GradientStop>) -> Self {
        Self { start, end, stops }
    }

    /// Color at normalized position `t` along the axis.
    pub fn color_at(&self, t: f64) -> Color {
        let Some(first) = self.stops.first() else {
            return Color::BLACK;
        };
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        if t <= first.offset {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                if span <= 0.0 {
                    return b.color;
                }
                return a.color.lerp(b.color, (t - a.offset) / span);
            }
        }
        self.stops[self.stops.len() - 1].color
    }

    /// Color at `point`, projected onto the start→end axis.
    pub fn color_at_point(&self, point: Point) -> Color {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let len2 = dx * dx + dy * dy;
        if len2 <= 0.0 {
            return self.color_at(0.0);
        }
        let t = ((point.x - self.start.x) * dx + (point.y - self.start.y) * dy) / len2;
        self.color_at(t)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("surface not ready: {0}")]
    SurfaceNotReady(String),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("unsupported image with {0} channels")]
    UnsupportedImage(u8),
    #[error("failed to present frame: {0}")]
    Present(String),
}

/// Composited output the filters paint onto.
///
/// One tick is `clear` → any number of draws → `present`. Coordinates are
/// frame pixels; shapes falling partly outside the surface are cropped.
pub trait DrawingSurface: Send {
    /// Resets the surface to show `background` (the raw video frame).
    fn clear(&mut self, background: &Frame) -> Result<(), RenderError>;

    fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<(), RenderError>;

    fn draw_circle(&mut self, center: Point, radius: f64, color: Color)
        -> Result<(), RenderError>;

    fn draw_gradient_rect(
        &mut self,
        rect: Rect,
        gradient: &LinearGradient,
    ) -> Result<(), RenderError>;

    /// Draws `image` scaled into `dest` with nearest-neighbor sampling.
    /// Four-channel images are alpha-blended over the surface.
    fn draw_image(&mut self, image: &Frame, dest: Rect) -> Result<(), RenderError>;

    /// Publishes the composited frame.
    fn present(&mut self) -> Result<(), RenderError>;
}
