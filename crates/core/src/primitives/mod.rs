//! Procedural jewelry shapes.
//!
//! Every function here is stateless: it takes anchors and sizes in frame
//! coordinates and emits fills and strokes on a [`Surface`]. Sizes are
//! clamped so a shape never collapses to nothing.

use std::f32::consts::PI;

use crate::accessory::{EarringStyle, NecklaceStyle, NoseStyle};
use crate::geometry::{CubicBezier, Point, Shape};
use crate::render::surface::{rgba, Color, Paint, RadialGradient, Surface};

/// Smallest size any primitive is drawn at.
pub const MIN_PRIMITIVE_SIZE: f32 = 2.0;
/// Parameter steps along the necklace curve; beads sit at every step
/// including both ends.
pub const PEARL_STEPS: usize = 18;
/// Curve parameter the pendant hangs from.
pub const PENDANT_T: f32 = 0.5;

fn gold() -> Color {
    rgba(245, 220, 120, 0.95)
}

fn stud_rim() -> Color {
    rgba(255, 255, 255, 0.6)
}

fn pale_gold() -> Color {
    rgba(230, 210, 160, 0.95)
}

fn chain_gold() -> Color {
    rgba(240, 215, 150, 0.95)
}

fn clamp_size(size: f32) -> f32 {
    if size.is_finite() {
        size.max(MIN_PRIMITIVE_SIZE)
    } else {
        MIN_PRIMITIVE_SIZE
    }
}

/// Filled gold disc of diameter `size` with a light rim.
pub fn draw_stud<S: Surface + ?Sized>(surface: &mut S, at: Point, size: f32) {
    let size = clamp_size(size);
    let outline = Shape::circle(at, size / 2.0);
    surface.fill_path(&outline, &Paint::Solid(gold()));
    surface.stroke_path(&outline, (size * 0.08).max(1.0), &Paint::Solid(stud_rim()));
}

/// Open hoop with its gap facing right.
pub fn draw_hoop<S: Surface + ?Sized>(surface: &mut S, at: Point, size: f32) {
    let size = clamp_size(size);
    let shape = Shape::arc(at, size * 0.6, PI * 0.15, PI * 1.85);
    surface.stroke_path(&shape, (size * 0.12).max(1.0), &Paint::Solid(pale_gold()));
}

/// Teardrop hanging below `at`.
pub fn draw_drop<S: Surface + ?Sized>(surface: &mut S, at: Point, size: f32) {
    let size = clamp_size(size);
    let top = at.offset(0.0, -size * 0.15);
    let bottom = at.offset(0.0, size * 0.55);

    let shape = Shape::new()
        .move_to(top)
        .quad_to(at.offset(size * 0.25, size * 0.15), bottom)
        .quad_to(at.offset(-size * 0.25, size * 0.15), top)
        .close();

    let paint = Paint::Radial(RadialGradient::centered(
        at,
        1.0,
        size * 0.55,
        rgba(255, 255, 255, 0.9),
        rgba(255, 200, 120, 0.95),
    ));
    surface.fill_path(&shape, &paint);
}

/// Pearl bead of the given radius, lit from the upper left: the highlight
/// circle sits up and left of the centre and widens to the bead outline.
pub fn draw_pearl<S: Surface + ?Sized>(surface: &mut S, at: Point, radius: f32) {
    let radius = clamp_size(radius);
    let paint = Paint::Radial(RadialGradient {
        start: at.offset(-radius * 0.3, -radius * 0.3),
        start_radius: radius * 0.1,
        end: at,
        end_radius: radius,
        inner: rgba(255, 255, 255, 0.95),
        outer: rgba(230, 235, 245, 0.95),
    });
    surface.fill_path(&Shape::circle(at, radius), &paint);
}

/// Chain curve and sizes derived from the chin anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NecklaceLayout {
    pub curve: CubicBezier,
    pub sag: f32,
    pub stroke_width: f32,
    pub bead_radius: f32,
    pub pendant_size: f32,
}

impl NecklaceLayout {
    pub fn new(chin: Point, face_width: f32, scale: f32) -> Self {
        let width = face_width * 0.95 * scale;
        let sag = (face_width * 0.22).max(16.0);
        let y = chin.y + face_width * 0.08;
        let x = chin.x;
        let curve = CubicBezier::new(
            Point::new(x - width / 2.0, y),
            Point::new(x - width * 0.25, y + sag),
            Point::new(x + width * 0.25, y + sag),
            Point::new(x + width / 2.0, y),
        );
        Self {
            curve,
            sag,
            stroke_width: (face_width * 0.02).max(2.0),
            bead_radius: (face_width * 0.018).max(2.0),
            pendant_size: (face_width * 0.12).max(16.0),
        }
    }

    pub fn bead_positions(&self) -> Vec<Point> {
        self.curve.sample(PEARL_STEPS)
    }

    pub fn pendant_anchor(&self) -> Point {
        self.curve.point_at(PENDANT_T).offset(0.0, self.sag * 0.13)
    }
}

pub fn draw_necklace<S: Surface + ?Sized>(
    surface: &mut S,
    chin: Point,
    face_width: f32,
    scale: f32,
    style: NecklaceStyle,
) {
    let layout = NecklaceLayout::new(chin, face_width, scale);
    surface.stroke_path(
        &Shape::curve(&layout.curve),
        layout.stroke_width,
        &Paint::Solid(chain_gold()),
    );

    match style {
        NecklaceStyle::Plain => {}
        NecklaceStyle::Pearl => {
            for bead in layout.bead_positions() {
                draw_pearl(surface, bead, layout.bead_radius);
            }
        }
        NecklaceStyle::Pendant => draw_drop(surface, layout.pendant_anchor(), layout.pendant_size),
    }
}

/// Edge of the square an earring occupies, before style-specific scaling.
pub fn earring_size(face_width: f32, scale: f32) -> f32 {
    (face_width * 0.14).max(18.0) * scale
}

/// Point an earring hangs from, slightly below the ear landmark.
pub fn earring_anchor(ear: Point, face_width: f32) -> Point {
    ear.offset(0.0, face_width * 0.02)
}

pub fn draw_earrings<S: Surface + ?Sized>(
    surface: &mut S,
    ears: [Point; 2],
    face_width: f32,
    scale: f32,
    style: EarringStyle,
) {
    let size = earring_size(face_width, scale);
    for ear in ears {
        let at = earring_anchor(ear, face_width);
        match style {
            EarringStyle::Stud => draw_stud(surface, at, size * 0.5),
            EarringStyle::Hoop => draw_hoop(surface, at, size),
            EarringStyle::Drop => draw_drop(surface, at, size),
        }
    }
}

pub fn nose_size(face_width: f32, scale: f32) -> f32 {
    (face_width * 0.035).max(4.0) * scale
}

pub fn draw_nose<S: Surface + ?Sized>(
    surface: &mut S,
    nose: Point,
    face_width: f32,
    scale: f32,
    style: NoseStyle,
) {
    let s = clamp_size(nose_size(face_width, scale));
    match style {
        NoseStyle::Dot => draw_stud(surface, nose, s * 0.6),
        NoseStyle::Stud => draw_stud(surface, nose, s),
        NoseStyle::Ring => {
            let center = nose.offset(s * 0.25, s * 0.05);
            let shape = Shape::arc(center, s * 0.6, PI * 0.1, PI * 1.2);
            surface.stroke_path(&shape, (s * 0.18).max(1.5), &Paint::Solid(chain_gold()));
        }
    }
}
