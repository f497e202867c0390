use crate::shared::face_geometry::{FaceGeometry, Point, Rect};
use crate::shared::frame::Frame;

use super::drawing_surface::{Color, DrawingSurface, GradientStop, LinearGradient, RenderError};
use super::filter_assets::FilterAssets;
use super::filter_id::FilterId;

pub const DEFAULT_PIXEL_SIZE: u32 = 10;

pub const RAINBOW_STOPS: [GradientStop; 6] = [
    GradientStop::new(0.0, Color::RED),
    GradientStop::new(0.2, Color::ORANGE),
    GradientStop::new(0.4, Color::YELLOW),
    GradientStop::new(0.6, Color::GREEN),
    GradientStop::new(0.8, Color::BLUE),
    GradientStop::new(1.0, Color::PURPLE),
];

const DEBUG_BOX_COLOR: Color = Color::BLUE;
const DEBUG_LANDMARK_COLOR: Color = Color::rgb(0, 255, 255);
const DEBUG_LINE_WIDTH: f64 = 2.0;
const DEBUG_LANDMARK_RADIUS: f64 = 2.0;

/// Everything a filter may read or paint during one tick.
pub struct DrawContext<'a> {
    pub surface: &'a mut dyn DrawingSurface,
    /// The raw frame being composited; source pixels for pixelation.
    pub frame: &'a Frame,
    pub pixel_size: u32,
    pub assets: &'a FilterAssets,
}

/// Drawing function for one filter on one face.
///
/// Deterministic: the same context and geometry always produce the same
/// surface operations.
pub type DrawFn = fn(&mut DrawContext<'_>, &FaceGeometry) -> Result<(), RenderError>;

/// Drawing function registered for `id`.
pub fn draw_fn_for(id: FilterId) -> DrawFn {
    match id {
        FilterId::Sunglasses => draw_sunglasses,
        FilterId::Mustache => draw_mustache,
        FilterId::ClownNose => draw_clown_nose,
        FilterId::Pixelate => draw_pixelate,
        FilterId::Rainbow => draw_rainbow,
        FilterId::None => draw_nothing,
    }
}

/// Rejects boxes no filter can be derived from (non-finite or empty).
pub fn validate_geometry(face: &FaceGeometry) -> Result<(), RenderError> {
    if face.bounding_box.is_drawable() {
        Ok(())
    } else {
        Err(RenderError::InvalidGeometry(format!(
            "bounding box {:?}",
            face.bounding_box
        )))
    }
}

pub fn sunglasses_band(b: &Rect) -> Rect {
    Rect::new(b.x, b.y + 0.2 * b.height, b.width, 0.1 * b.height)
}

pub fn mustache_rect(b: &Rect) -> Rect {
    Rect::new(
        b.x + 0.2 * b.width,
        b.y + 0.5 * b.height,
        0.6 * b.width,
        0.1 * b.height,
    )
}

/// Center and radius of the clown nose.
pub fn clown_nose(b: &Rect) -> (Point, f64) {
    (
        Point::new(b.x + b.width / 2.0, b.y + 0.3 * b.height),
        0.1 * b.width,
    )
}

/// Rainbow gradient running from the top-left to the bottom-right corner.
pub fn rainbow_gradient(b: &Rect) -> LinearGradient {
    LinearGradient::new(
        Point::new(b.x, b.y),
        Point::new(b.right(), b.bottom()),
        RAINBOW_STOPS.to_vec(),
    )
}

/// Downsampled copy of the part of `frame` under `region`.
///
/// The region is snapped to whole pixels and cropped to the frame. Returns
/// the small image (`w / pixel_size × h / pixel_size`, at least 1×1, sampled
/// nearest-neighbor at block centers) together with the snapped destination
/// rectangle it should be stretched back over.
pub fn pixelated_region(frame: &Frame, region: &Rect, pixel_size: u32) -> Option<(Frame, Rect)> {
    let clamped = region.clamp_to(frame.width(), frame.height())?;
    let x0 = clamped.x.round() as u32;
    let y0 = clamped.y.round() as u32;
    let x1 = (clamped.right().round() as u32).min(frame.width());
    let y1 = (clamped.bottom().round() as u32).min(frame.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let (w, h) = (x1 - x0, y1 - y0);
    let ps = pixel_size.max(1);
    let small_w = (w / ps).max(1);
    let small_h = (h / ps).max(1);

    let channels = frame.channels() as usize;
    let mut data = Vec::with_capacity(small_w as usize * small_h as usize * channels);
    for sy in 0..small_h {
        let src_y = y0 + ((2 * sy + 1) * h) / (2 * small_h);
        for sx in 0..small_w {
            let src_x = x0 + ((2 * sx + 1) * w) / (2 * small_w);
            data.extend_from_slice(frame.pixel(src_x, src_y));
        }
    }
    let small = Frame::new(data, small_w, small_h, frame.channels(), frame.index());
    Some((small, Rect::new(x0 as f64, y0 as f64, w as f64, h as f64)))
}

fn draw_sunglasses(ctx: &mut DrawContext<'_>, face: &FaceGeometry) -> Result<(), RenderError> {
    let band = sunglasses_band(&face.bounding_box);
    match ctx.assets.get(FilterId::Sunglasses) {
        Some(image) => ctx.surface.draw_image(image, band),
        None => ctx.surface.draw_rect(band, Color::BLACK),
    }
}

fn draw_mustache(ctx: &mut DrawContext<'_>, face: &FaceGeometry) -> Result<(), RenderError> {
    let rect = mustache_rect(&face.bounding_box);
    match ctx.assets.get(FilterId::Mustache) {
        Some(image) => ctx.surface.draw_image(image, rect),
        None => ctx.surface.draw_rect(rect, Color::BLACK),
    }
}

fn draw_clown_nose(ctx: &mut DrawContext<'_>, face: &FaceGeometry) -> Result<(), RenderError> {
    let (center, radius) = clown_nose(&face.bounding_box);
    ctx.surface.draw_circle(center, radius, Color::RED)
}

fn draw_pixelate(ctx: &mut DrawContext<'_>, face: &FaceGeometry) -> Result<(), RenderError> {
    match pixelated_region(ctx.frame, &face.bounding_box, ctx.pixel_size) {
        Some((small, dest)) => ctx.surface.draw_image(&small, dest),
        // Face entirely off-frame.
        None => Ok(()),
    }
}

fn draw_rainbow(ctx: &mut DrawContext<'_>, face: &FaceGeometry) -> Result<(), RenderError> {
    let b = face.bounding_box;
    ctx.surface.draw_gradient_rect(b, &rainbow_gradient(&b))
}

fn draw_nothing(_ctx: &mut DrawContext<'_>, _face: &FaceGeometry) -> Result<(), RenderError> {
    Ok(())
}

/// Bounding box outline and landmark dots, drawn over the filters.
pub fn draw_detection_overlay(
    ctx: &mut DrawContext<'_>,
    face: &FaceGeometry,
) -> Result<(), RenderError> {
    let b = face.bounding_box;
    let lw = DEBUG_LINE_WIDTH.min(b.width).min(b.height);
    let edges = [
        Rect::new(b.x, b.y, b.width, lw),
        Rect::new(b.x, b.bottom() - lw, b.width, lw),
        Rect::new(b.x, b.y, lw, b.height),
        Rect::new(b.right() - lw, b.y, lw, b.height),
    ];
    for edge in edges {
        ctx.surface.draw_rect(edge, DEBUG_BOX_COLOR)?;
    }
    for point in face.landmarks.iter().filter(|p| p.is_finite()) {
        ctx.surface
            .draw_circle(*point, DEBUG_LANDMARK_RADIUS, DEBUG_LANDMARK_COLOR)?;
    }
    Ok(())
}
