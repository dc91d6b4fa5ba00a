use image::RgbaImage;
pub use tiny_skia::Color;

use crate::geometry::{Point, Rect, Shape};

/// Straight-alpha colour helper mirroring CSS `rgba(r, g, b, a)`.
pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Color {
    Color::from_rgba8(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Two-point radial gradient: `inner` at the circle around `start`, blending
/// to `outer` at the circle around `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub start: Point,
    pub start_radius: f32,
    pub end: Point,
    pub end_radius: f32,
    pub inner: Color,
    pub outer: Color,
}

impl RadialGradient {
    /// Single-centre gradient.
    pub fn centered(
        center: Point,
        inner_radius: f32,
        outer_radius: f32,
        inner: Color,
        outer: Color,
    ) -> Self {
        Self {
            start: center,
            start_radius: inner_radius,
            end: center,
            end_radius: outer_radius,
            inner,
            outer,
        }
    }
}

/// How a filled or stroked shape is coloured.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Radial(RadialGradient),
}

/// Drawing target for the overlay compositor.
pub trait Surface {
    /// Width and height in pixels. A zero dimension means the surface is not
    /// ready to be drawn on.
    fn size(&self) -> (u32, u32);

    /// Resets every pixel to transparent.
    fn clear(&mut self);

    /// Fills the interior of `shape` (non-zero winding).
    fn fill_path(&mut self, shape: &Shape, paint: &Paint);

    /// Strokes the outline of `shape` with round caps.
    fn stroke_path(&mut self, shape: &Shape, width: f32, paint: &Paint);

    /// Draws `image` scaled to `dest`. Only the part of `dest` that lies on
    /// the surface is touched.
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect);
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill {
        shape: Shape,
        paint: Paint,
    },
    Stroke {
        shape: Shape,
        width: f32,
        paint: Paint,
    },
    Image {
        dest: Rect,
        source_size: (u32, u32),
    },
}

impl DrawCommand {
    pub fn is_image(&self) -> bool {
        matches!(self, DrawCommand::Image { .. })
    }

    /// Points that describe where the command lands on the surface.
    pub fn points(&self) -> Vec<Point> {
        match self {
            DrawCommand::Fill { shape, .. } | DrawCommand::Stroke { shape, .. } => shape.points(),
            DrawCommand::Image { dest, .. } => vec![dest.center()],
        }
    }
}

/// Surface that records commands instead of rasterising them, so a render
/// tick can be inspected without any display.
#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn fill_path(&mut self, shape: &Shape, paint: &Paint) {
        self.commands.push(DrawCommand::Fill {
            shape: shape.clone(),
            paint: paint.clone(),
        });
    }

    fn stroke_path(&mut self, shape: &Shape, width: f32, paint: &Paint) {
        self.commands.push(DrawCommand::Stroke {
            shape: shape.clone(),
            width,
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        self.commands.push(DrawCommand::Image {
            dest,
            source_size: image.dimensions(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_matches_css_alpha() {
        let color = rgba(255, 0, 0, 0.5);
        assert_eq!(color.to_color_u8().alpha(), 128);
        assert_eq!(rgba(1, 2, 3, 7.0).to_color_u8().alpha(), 255);
    }

    #[test]
    fn display_list_clear_drops_commands() {
        let mut list = DisplayList::new(10, 10);
        let triangle = Shape::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(1.0, 0.0))
            .line_to(Point::new(0.0, 1.0))
            .close();
        list.fill_path(&triangle, &Paint::Solid(rgba(1, 2, 3, 1.0)));
        assert_eq!(list.commands().len(), 1);
        assert_eq!(list.commands()[0].points().len(), 3);
        list.clear();
        assert!(list.is_empty());
    }
}
