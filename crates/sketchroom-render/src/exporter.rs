//! Raster export of a canvas session.

use crate::encode::{EncodedImage, RasterImage};
use kurbo::{BezPath, PathEl};
use sketchroom_core::stroke::{LineCap, LineJoin};
use sketchroom_core::{CanvasSession, Color, Stroke};
use thiserror::Error;
use vello_cpu::kurbo::{Affine, Cap, Join, Rect};
use vello_cpu::{Pixmap, RenderContext};

/// Largest width or height the rasterizer accepts, in device pixels.
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// Export errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("cannot export an empty surface ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },
    #[error("surface too large to export ({width}x{height})")]
    SurfaceTooLarge { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Rasterizes strokes onto a background-filled pixel surface.
///
/// Output size is the session viewport times its scale factor. Strokes are
/// painted in order, so later strokes cover earlier ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterExporter;

impl RasterExporter {
    pub fn new() -> Self {
        Self
    }

    /// Rasterize everything committed to `session`.
    ///
    /// A gesture still in progress is not part of the image.
    pub fn rasterize(&self, session: &CanvasSession) -> ExportResult<RasterImage> {
        let viewport = session.viewport();
        let (width, height) = viewport.pixel_size();
        self.rasterize_strokes(
            session.strokes(),
            session.background_color(),
            width,
            height,
            viewport.scale_factor,
        )
    }

    /// Rasterize `strokes` at `scale` onto a `width` x `height` pixel surface.
    pub fn rasterize_strokes(
        &self,
        strokes: &[Stroke],
        background: Color,
        width: u32,
        height: u32,
        scale: f64,
    ) -> ExportResult<RasterImage> {
        if width == 0 || height == 0 {
            return Err(ExportError::EmptySurface { width, height });
        }
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(ExportError::SurfaceTooLarge { width, height });
        };

        let mut ctx = RenderContext::new(w, h);

        ctx.set_transform(Affine::IDENTITY);
        ctx.set_paint(to_cpu_color(background));
        ctx.fill_rect(&Rect::new(0.0, 0.0, width as f64, height as f64));

        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        ctx.set_transform(Affine::scale(scale));
        for stroke in strokes {
            paint_stroke(&mut ctx, stroke);
        }

        let mut pixmap = Pixmap::new(w, h);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        log::debug!(
            "rasterized {} strokes at {}x{} (scale {})",
            strokes.len(),
            width,
            height,
            scale
        );
        Ok(RasterImage::from_premultiplied(
            width,
            height,
            pixmap.data_as_u8_slice(),
        ))
    }

    /// Rasterize and encode as PNG.
    pub fn export(&self, session: &CanvasSession) -> ExportResult<EncodedImage> {
        self.rasterize(session)?.encode_png()
    }

    /// Rasterize and encode as a `data:image/png;base64,...` URL.
    pub fn export_data_url(&self, session: &CanvasSession) -> ExportResult<String> {
        Ok(self.export(session)?.to_data_url())
    }
}

fn paint_stroke(ctx: &mut RenderContext, stroke: &Stroke) {
    // A lone point has no segment to stroke.
    if stroke.len() < 2 {
        return;
    }

    let style = vello_cpu::kurbo::Stroke::new(stroke.width())
        .with_caps(cap_to_cpu(stroke.cap()))
        .with_join(join_to_cpu(stroke.join()));
    ctx.set_stroke(style);
    ctx.set_paint(to_cpu_color(stroke.color()));
    ctx.stroke_path(&bezpath_to_cpu(&stroke.to_path()));
}

fn to_cpu_color(color: Color) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn cap_to_cpu(cap: LineCap) -> Cap {
    match cap {
        LineCap::Round => Cap::Round,
    }
}

fn join_to_cpu(join: LineJoin) -> Join {
    match join {
        LineJoin::Round => Join::Round,
    }
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use sketchroom_core::{StrokeStyle, Viewport};

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn session(width: f64, height: f64) -> CanvasSession {
        let mut session = CanvasSession::new();
        session.resize(width, height);
        session
    }

    fn draw(session: &mut CanvasSession, points: &[(f64, f64)]) {
        let mut iter = points.iter();
        if let Some(&(x, y)) = iter.next() {
            session.gesture_start(Point::new(x, y));
        }
        for &(x, y) in iter {
            session.gesture_move(Point::new(x, y));
        }
        session.gesture_end();
    }

    #[test]
    fn test_empty_session_is_uniform_background() {
        let mut s = session(16.0, 12.0);
        s.style_mut().set_background_color(Color::rgb(0x11, 0x22, 0x33));

        let img = RasterExporter::new().rasterize(&s).unwrap();
        assert_eq!((img.width, img.height), (16, 12));
        for px in img.pixels.chunks_exact(4) {
            assert_eq!(px, &[0x11, 0x22, 0x33, 0xff]);
        }
    }

    #[test]
    fn test_stroke_pixels() {
        let mut s = session(40.0, 40.0);
        s.style_mut().set_pen_color(RED);
        s.style_mut().set_pen_width(3.0);
        draw(&mut s, &[(10.0, 10.0), (20.0, 10.0), (20.0, 20.0)]);

        let img = RasterExporter::new().rasterize(&s).unwrap();
        assert_eq!(img.pixel(15, 10), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(20, 15), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(2, 2), Some([0, 0, 0, 255]));
        assert_eq!(img.pixel(35, 35), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_later_strokes_cover_earlier() {
        let mut s = session(30.0, 30.0);
        s.style_mut().set_pen_width(6.0);
        s.style_mut().set_pen_color(RED);
        draw(&mut s, &[(0.0, 15.0), (30.0, 15.0)]);
        s.style_mut().set_pen_color(BLUE);
        draw(&mut s, &[(15.0, 0.0), (15.0, 30.0)]);

        let img = RasterExporter::new().rasterize(&s).unwrap();
        assert_eq!(img.pixel(15, 15), Some([0, 0, 255, 255]));
        assert_eq!(img.pixel(5, 15), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_eraser_paints_background() {
        let mut s = session(30.0, 30.0);
        s.style_mut().set_pen_width(8.0);
        draw(&mut s, &[(0.0, 15.0), (30.0, 15.0)]);
        s.style_mut().toggle_eraser();
        draw(&mut s, &[(15.0, 0.0), (15.0, 30.0)]);

        let img = RasterExporter::new().rasterize(&s).unwrap();
        assert_eq!(img.pixel(15, 15), Some([0, 0, 0, 255]));
        assert_eq!(img.pixel(5, 15), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_single_point_stroke_draws_nothing() {
        let mut s = session(10.0, 10.0);
        draw(&mut s, &[(5.0, 5.0)]);
        assert_eq!(s.stroke_count(), 1);

        let img = RasterExporter::new().rasterize(&s).unwrap();
        assert!(img.pixels.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_export_is_deterministic() {
        let mut s = session(64.0, 48.0);
        s.style_mut().set_pen_color(RED);
        draw(&mut s, &[(3.0, 4.0), (40.0, 30.0), (60.0, 5.0)]);
        s.style_mut().set_pen_width(17.0);
        draw(&mut s, &[(10.0, 40.0), (50.0, 41.5)]);

        let exporter = RasterExporter::new();
        let a = exporter.export(&s).unwrap();
        let b = exporter.export(&s).unwrap();
        assert_eq!(a.png, b.png);
        assert_eq!(exporter.export_data_url(&s).unwrap(), a.to_data_url());
    }

    #[test]
    fn test_png_decodes_to_raster() {
        let mut s = session(20.0, 10.0);
        s.style_mut().set_pen_color(RED);
        draw(&mut s, &[(2.0, 5.0), (18.0, 5.0)]);

        let exporter = RasterExporter::new();
        let raster = exporter.rasterize(&s).unwrap();
        let encoded = raster.encode_png().unwrap();

        let decoded = image::load_from_memory(&encoded.png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_eq!(decoded.into_raw(), raster.pixels);
    }

    #[test]
    fn test_scale_factor_sizes_output() {
        let mut s = session(10.0, 5.0);
        s.set_viewport(Viewport::new(10.0, 5.0).with_scale_factor(2.0));
        s.style_mut().set_pen_color(RED);
        s.style_mut().set_pen_width(2.0);
        draw(&mut s, &[(0.0, 2.5), (10.0, 2.5)]);

        let img = RasterExporter::new().rasterize(&s).unwrap();
        assert_eq!((img.width, img.height), (20, 10));
        // 2 logical units wide becomes 4 device pixels around y = 5
        assert_eq!(img.pixel(10, 3), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(10, 6), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(10, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_empty_surface_rejected() {
        let s = CanvasSession::new();
        assert_eq!(
            RasterExporter::new().export(&s).unwrap_err(),
            ExportError::EmptySurface {
                width: 0,
                height: 0
            }
        );
    }

    #[test]
    fn test_oversized_surface_rejected() {
        let err = RasterExporter::new()
            .rasterize_strokes(&[], Color::BLACK, 70_000, 10, 1.0)
            .unwrap_err();
        assert!(matches!(err, ExportError::SurfaceTooLarge { .. }));
    }

    #[test]
    fn test_explicit_strokes() {
        let stroke = Stroke::from_points(
            vec![Point::new(0.0, 2.0), Point::new(8.0, 2.0)],
            StrokeStyle {
                color: BLUE,
                width: 2.0,
            },
        );
        let img = RasterExporter::new()
            .rasterize_strokes(&[stroke], Color::WHITE, 8, 4, 1.0)
            .unwrap();
        assert_eq!(img.pixel(4, 1), Some([0, 0, 255, 255]));
        assert_eq!(img.pixel(4, 3), Some([255, 255, 255, 255]));
    }
}
