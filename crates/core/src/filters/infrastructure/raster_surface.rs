use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};

use crate::filters::domain::drawing_surface::{Color, DrawingSurface, LinearGradient, RenderError};
use crate::shared::face_geometry::{Point, Rect};
use crate::shared::frame::Frame;
use crate::video::domain::frame_sink::FrameSink;

/// CPU drawing surface backed by an [`RgbImage`].
///
/// `clear` copies the video frame into the canvas, filters paint over it with
/// `imageproc`, and `present` hands the finished frame to a [`FrameSink`].
/// Rectangles cover the pixels in `[round(x), round(x + w))` on each axis.
pub struct RasterSurface {
    sink: Box<dyn FrameSink>,
    canvas: Option<RgbImage>,
    /// Identity of the frame the canvas was cleared to.
    frame_index: usize,
    frame_timestamp: std::time::Duration,
    last_presented: Option<Frame>,
}

impl RasterSurface {
    pub fn new(sink: Box<dyn FrameSink>) -> Self {
        Self {
            sink,
            canvas: None,
            frame_index: 0,
            frame_timestamp: std::time::Duration::ZERO,
            last_presented: None,
        }
    }

    /// The most recently presented frame.
    pub fn last_presented(&self) -> Option<&Frame> {
        self.last_presented.as_ref()
    }

    fn canvas_mut(&mut self) -> Result<&mut RgbImage, RenderError> {
        self.canvas.as_mut().ok_or_else(|| {
            RenderError::SurfaceNotReady("draw called before clear".into())
        })
    }
}

impl Drop for RasterSurface {
    fn drop(&mut self) {
        if let Err(e) = self.sink.close() {
            log::warn!("Failed to close frame sink: {e}");
        }
    }
}

fn rgb(color: Color) -> Rgb<u8> {
    Rgb([color.r, color.g, color.b])
}

/// Pixel span `[x0, x1) × [y0, y1)` covered by `rect`, cropped to the canvas.
fn pixel_bounds(rect: &Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if !rect.is_drawable() {
        return None;
    }
    let snap = |v: f64, max: u32| v.round().clamp(0.0, max as f64) as u32;
    let x0 = snap(rect.x, width);
    let x1 = snap(rect.right(), width);
    let y0 = snap(rect.y, height);
    let y1 = snap(rect.bottom(), height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

fn frame_to_rgb(frame: &Frame) -> Result<RgbImage, RenderError> {
    let data = match frame.channels() {
        3 => frame.data().to_vec(),
        4 => frame
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        other => return Err(RenderError::UnsupportedImage(other)),
    };
    RgbImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| RenderError::SurfaceNotReady("frame buffer does not match its size".into()))
}

impl DrawingSurface for RasterSurface {
    fn clear(&mut self, background: &Frame) -> Result<(), RenderError> {
        self.canvas = Some(frame_to_rgb(background)?);
        self.frame_index = background.index();
        self.frame_timestamp = background.timestamp();
        Ok(())
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<(), RenderError> {
        let canvas = self.canvas_mut()?;
        let Some((x0, y0, x1, y1)) = pixel_bounds(&rect, canvas.width(), canvas.height()) else {
            return Ok(());
        };
        let area = imageproc::rect::Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0, y1 - y0);
        draw_filled_rect_mut(canvas, area, rgb(color));
        Ok(())
    }

    fn draw_circle(
        &mut self,
        center: Point,
        radius: f64,
        color: Color,
    ) -> Result<(), RenderError> {
        let canvas = self.canvas_mut()?;
        if !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
            return Ok(());
        }
        let c = (center.x.round() as i32, center.y.round() as i32);
        draw_filled_circle_mut(canvas, c, radius.round() as i32, rgb(color));
        Ok(())
    }

    fn draw_gradient_rect(
        &mut self,
        rect: Rect,
        gradient: &LinearGradient,
    ) -> Result<(), RenderError> {
        let canvas = self.canvas_mut()?;
        let Some((x0, y0, x1, y1)) = pixel_bounds(&rect, canvas.width(), canvas.height()) else {
            return Ok(());
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                canvas.put_pixel(x, y, rgb(gradient.color_at_point(center)));
            }
        }
        Ok(())
    }

    fn draw_image(&mut self, image: &Frame, dest: Rect) -> Result<(), RenderError> {
        let channels = image.channels();
        if channels != 3 && channels != 4 {
            return Err(RenderError::UnsupportedImage(channels));
        }
        let canvas = self.canvas_mut()?;
        if image.width() == 0 || image.height() == 0 {
            return Ok(());
        }
        let Some((x0, y0, x1, y1)) = pixel_bounds(&dest, canvas.width(), canvas.height()) else {
            return Ok(());
        };
        let scale_x = image.width() as f64 / dest.width;
        let scale_y = image.height() as f64 / dest.height;
        for y in y0..y1 {
            let sy = (((y as f64 + 0.5 - dest.y) * scale_y).floor() as i64)
                .clamp(0, image.height() as i64 - 1) as u32;
            for x in x0..x1 {
                let sx = (((x as f64 + 0.5 - dest.x) * scale_x).floor() as i64)
                    .clamp(0, image.width() as i64 - 1) as u32;
                let src = image.pixel(sx, sy);
                let dst = canvas.get_pixel_mut(x, y);
                if channels == 4 {
                    let a = src[3] as u32;
                    for c in 0..3 {
                        dst.0[c] = ((src[c] as u32 * a + dst.0[c] as u32 * (255 - a) + 127) / 255)
                            as u8;
                    }
                } else {
                    dst.0 = [src[0], src[1], src[2]];
                }
            }
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let canvas = self.canvas.take().ok_or_else(|| {
            RenderError::SurfaceNotReady("present called before clear".into())
        })?;
        let (w, h) = canvas.dimensions();
        let frame = Frame::new(canvas.into_raw(), w, h, 3, self.frame_index)
            .with_timestamp(self.frame_timestamp);
        self.sink
            .write(&frame)
            .map_err(|e| RenderError::Present(e.to_string()))?;
        self.last_presented = Some(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::frame_sink::NullFrameSink;
    use crate::video::infrastructure::channel_frame_sink::ChannelFrameSink;
    use crossbeam_channel::Receiver;

    const GRAY: [u8; 3] = [128, 128, 128];

    fn gray_frame(w: u32, h: u32) -> Frame {
        Frame::new(GRAY.repeat((w * h) as usize), w, h, 3, 3)
    }

    fn surface() -> RasterSurface {
        RasterSurface::new(Box::new(NullFrameSink))
    }

    fn channel_surface() -> (RasterSurface, Receiver<Frame>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (RasterSurface::new(Box::new(ChannelFrameSink::new(tx))), rx)
    }

    #[test]
    fn test_clear_then_present_shows_background() {
        let (mut s, rx) = channel_surface();
        let frame = gray_frame(4, 4).with_timestamp(std::time::Duration::from_millis(40));
        s.clear(&frame).unwrap();
        s.present().unwrap();

        let out = rx.try_recv().unwrap();
        assert_eq!(out.data(), frame.data());
        assert_eq!(out.index(), 3);
        assert_eq!(out.timestamp(), std::time::Duration::from_millis(40));
    }

    #[test]
    fn test_sunglasses_band_pixels() {
        let mut s = surface();
        s.clear(&gray_frame(400, 300)).unwrap();
        s.draw_rect(Rect::new(100.0, 90.0, 200.0, 20.0), Color::BLACK)
            .unwrap();
        s.present().unwrap();

        let out = s.last_presented().unwrap();
        assert_eq!(out.pixel(100, 90), &[0, 0, 0]);
        assert_eq!(out.pixel(299, 109), &[0, 0, 0]);
        assert_eq!(out.pixel(99, 90), &GRAY);
        assert_eq!(out.pixel(300, 90), &GRAY);
        assert_eq!(out.pixel(100, 89), &GRAY);
        assert_eq!(out.pixel(100, 110), &GRAY);
    }

    #[test]
    fn test_clown_nose_pixels() {
        let mut s = surface();
        s.clear(&gray_frame(400, 300)).unwrap();
        s.draw_circle(Point::new(200.0, 110.0), 20.0, Color::RED)
            .unwrap();
        s.present().unwrap();

        let out = s.last_presented().unwrap();
        assert_eq!(out.pixel(200, 110), &[255, 0, 0]);
        assert_eq!(out.pixel(219, 110), &[255, 0, 0]);
        assert_eq!(out.pixel(200, 91), &[255, 0, 0]);
        assert_eq!(out.pixel(222, 110), &GRAY);
        assert_eq!(out.pixel(216, 126), &GRAY);
    }

    #[test]
    fn test_rect_partly_outside_is_cropped() {
        let mut s = surface();
        s.clear(&gray_frame(10, 10)).unwrap();
        s.draw_rect(Rect::new(-5.0, 8.0, 8.0, 10.0), Color::BLACK)
            .unwrap();
        s.present().unwrap();

        let out = s.last_presented().unwrap();
        assert_eq!(out.pixel(0, 9), &[0, 0, 0]);
        assert_eq!(out.pixel(2, 8), &[0, 0, 0]);
        assert_eq!(out.pixel(3, 8), &GRAY);
        assert_eq!(out.pixel(0, 7), &GRAY);
    }

    #[test]
    fn test_gradient_corners() {
        let mut s = surface();
        s.clear(&gray_frame(100, 100)).unwrap();
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        s.draw_gradient_rect(
            rect,
            &crate::filters::domain::filter_drawing::rainbow_gradient(&rect),
        )
        .unwrap();
        s.present().unwrap();

        let out = s.last_presented().unwrap();
        // Pixel centers sit half a pixel inside the corners.
        assert_eq!(out.pixel(0, 0), &[255, 4, 0]);
        assert_eq!(out.pixel(99, 99), &[125, 0, 131]);
    }

    #[test]
    fn test_draw_image_scales_nearest() {
        let mut s = surface();
        s.clear(&gray_frame(8, 8)).unwrap();
        // 2x1 image: red, blue
        let image = Frame::new(vec![255, 0, 0, 0, 0, 255], 2, 1, 3, 0);
        s.draw_image(&image, Rect::new(0.0, 0.0, 8.0, 4.0)).unwrap();
        s.present().unwrap();

        let out = s.last_presented().unwrap();
        assert_eq!(out.pixel(0, 0), &[255, 0, 0]);
        assert_eq!(out.pixel(3, 3), &[255, 0, 0]);
        assert_eq!(out.pixel(4, 0), &[0, 0, 255]);
        assert_eq!(out.pixel(7, 3), &[0, 0, 255]);
        assert_eq!(out.pixel(0, 4), &GRAY);
    }

    #[test]
    fn test_draw_image_blends_alpha() {
        let mut s = surface();
        s.clear(&Frame::new(vec![0, 0, 0, 0, 0, 0], 2, 1, 3, 0))
            .unwrap();
        // Opaque white, then fully transparent white.
        let image = Frame::new(vec![255, 255, 255, 255, 255, 255, 255, 0], 2, 1, 4, 0);
        s.draw_image(&image, Rect::new(0.0, 0.0, 2.0, 1.0)).unwrap();
        s.present().unwrap();

        let out = s.last_presented().unwrap();
        assert_eq!(out.pixel(0, 0), &[255, 255, 255]);
        assert_eq!(out.pixel(1, 0), &[0, 0, 0]);
    }

    #[test]
    fn test_draw_before_clear_is_not_ready() {
        let mut s = surface();
        assert!(matches!(
            s.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK),
            Err(RenderError::SurfaceNotReady(_))
        ));
        assert!(matches!(s.present(), Err(RenderError::SurfaceNotReady(_))));
    }

    #[test]
    fn test_draw_after_present_requires_clear() {
        let mut s = surface();
        s.clear(&gray_frame(2, 2)).unwrap();
        s.present().unwrap();
        assert!(s
            .draw_circle(Point::new(1.0, 1.0), 1.0, Color::RED)
            .is_err());
    }

    #[test]
    fn test_same_draws_are_pixel_identical() {
        let render = || {
            let mut s = surface();
            s.clear(&gray_frame(64, 64)).unwrap();
            s.draw_rect(Rect::new(3.3, 7.6, 20.2, 5.5), Color::BLACK)
                .unwrap();
            s.draw_circle(Point::new(30.4, 30.6), 6.2, Color::RED)
                .unwrap();
            let rect = Rect::new(10.0, 10.0, 40.0, 40.0);
            s.draw_gradient_rect(
                rect,
                &crate::filters::domain::filter_drawing::rainbow_gradient(&rect),
            )
            .unwrap();
            s.present().unwrap();
            s.last_presented().unwrap().data().to_vec()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_rgba_background_drops_alpha() {
        let mut s = surface();
        s.clear(&Frame::new(vec![1, 2, 3, 4], 1, 1, 4, 0)).unwrap();
        s.present().unwrap();
        assert_eq!(s.last_presented().unwrap().data(), &[1, 2, 3]);
    }

    #[test]
    fn test_failing_sink_reports_present_error() {
        struct FailingSink;
        impl FrameSink for FailingSink {
            fn write(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
                Err("disk full".into())
            }
        }
        let mut s = RasterSurface::new(Box::new(FailingSink));
        s.clear(&gray_frame(2, 2)).unwrap();
        assert_eq!(
            s.present(),
            Err(RenderError::Present("disk full".to_string()))
        );
    }
}
