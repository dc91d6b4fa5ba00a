use image::{Rgba, RgbaImage};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, GradientStop, LineCap, LineJoin, Path, PathBuilder, Pattern,
    Pixmap, Shader, SpreadMode, Stroke, Transform,
};

use crate::geometry::{Rect, Segment, Shape};

use super::surface::{Color, Paint, RadialGradient, Surface};

/// Overlay surface backed by a `tiny_skia` pixmap.
///
/// Shapes are anti-aliased and composited source-over in premultiplied
/// alpha; [`RasterSurface::to_image`] hands back straight alpha so the result
/// can be laid over the mirrored video frame as-is.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    // `None` while either dimension is zero
    pixmap: Option<Pixmap>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixmap: Pixmap::new(width, height),
        }
    }

    /// Matches the surface to the video dimensions, reallocating only when
    /// they change. Returns `true` when the buffer was replaced.
    pub fn fit(&mut self, width: u32, height: u32) -> bool {
        if self.size() == (width, height) {
            return false;
        }
        self.pixmap = Pixmap::new(width, height);
        true
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Straight-alpha copy of the surface.
    pub fn to_image(&self) -> RgbaImage {
        let Some(pixmap) = &self.pixmap else {
            return RgbaImage::new(0, 0);
        };
        RgbaImage::from_fn(pixmap.width(), pixmap.height(), |x, y| {
            let c = pixmap
                .pixel(x, y)
                .map(|p| p.demultiply())
                .unwrap_or(ColorU8::from_rgba(0, 0, 0, 0));
            Rgba([c.red(), c.green(), c.blue(), c.alpha()])
        })
    }

    /// Number of pixels with any coverage.
    pub fn painted_pixels(&self) -> usize {
        self.pixmap
            .as_ref()
            .map(|p| p.pixels().iter().filter(|px| px.alpha() > 0).count())
            .unwrap_or(0)
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.pixmap
            .as_ref()
            .map(|p| (p.width(), p.height()))
            .unwrap_or((0, 0))
    }

    fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(Color::TRANSPARENT);
        }
    }

    fn fill_path(&mut self, shape: &Shape, paint: &Paint) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let (Some(path), Some(paint)) = (to_path(shape), to_paint(paint)) else {
            return;
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn stroke_path(&mut self, shape: &Shape, width: f32, paint: &Paint) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let (Some(path), Some(paint)) = (to_path(shape), to_paint(paint)) else {
            return;
        };
        let stroke = Stroke {
            width: width.max(1.0),
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }
        let bounds = Rect::new(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32);
        let Some(visible) = dest.intersect(&bounds) else {
            return;
        };
        let Some(area) =
            tiny_skia::Rect::from_xywh(visible.x, visible.y, visible.width, visible.height)
        else {
            return;
        };
        let Some(source) = to_pixmap(image) else {
            return;
        };

        // the source is sampled through the placement transform, so only the
        // visible pixels are ever computed
        let placement = Transform::from_row(
            dest.width / width as f32,
            0.0,
            0.0,
            dest.height / height as f32,
            dest.x,
            dest.y,
        );
        let paint = tiny_skia::Paint {
            shader: Pattern::new(
                source.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Bilinear,
                1.0,
                placement,
            ),
            ..tiny_skia::Paint::default()
        };
        pixmap.fill_rect(area, &paint, Transform::identity(), None);
    }
}

fn to_path(shape: &Shape) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for segment in shape.segments() {
        match *segment {
            Segment::MoveTo(p) => builder.move_to(p.x, p.y),
            Segment::LineTo(p) => builder.line_to(p.x, p.y),
            Segment::QuadTo(c, p) => builder.quad_to(c.x, c.y, p.x, p.y),
            Segment::CubicTo(c1, c2, p) => builder.cubic_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            Segment::Close => builder.close(),
        }
    }
    builder.finish()
}

fn to_paint(paint: &Paint) -> Option<tiny_skia::Paint<'static>> {
    let mut out = tiny_skia::Paint::default();
    match paint {
        Paint::Solid(color) => out.set_color(*color),
        Paint::Radial(gradient) => out.shader = radial_shader(gradient)?,
    }
    Some(out)
}

/// `tiny_skia` starts every radial gradient at a point, so a non-zero start
/// radius becomes the offset of the inner stop.
fn radial_shader(gradient: &RadialGradient) -> Option<Shader<'static>> {
    if gradient.end_radius.is_nan() || gradient.end_radius <= 0.0 {
        return None;
    }
    let inner_stop = (gradient.start_radius / gradient.end_radius).clamp(0.0, 1.0);
    tiny_skia::RadialGradient::new(
        tiny_skia::Point::from_xy(gradient.start.x, gradient.start.y),
        tiny_skia::Point::from_xy(gradient.end.x, gradient.end.y),
        gradient.end_radius,
        vec![
            GradientStop::new(inner_stop, gradient.inner),
            GradientStop::new(1.0, gradient.outer),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    )
}

fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}
