//! Points, rectangles and path outlines shared by the jewelry primitives.
//!
//! All coordinates live in the pixel space of the transmitted (mirrored) video
//! frame: `x` grows to the right and `y` grows downwards, so arcs sweep
//! clockwise on screen as their angle increases.

use std::f32::consts::FRAC_PI_2;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// 2D coordinate in frame space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the point shifted by `(dx, dy)`.
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f32 {
        (self - other).length()
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` centred on `center`.
    pub fn centered(center: Point, size: f32) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.x + self.width, self.y + self.height]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Overlapping part of the two rectangles, or `None` when they do not
    /// overlap or either one is not finite.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if !self.is_finite() || !other.is_finite() {
            return None;
        }
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// One step of a [`Shape`] outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

impl Segment {
    /// The on-curve point the segment ends at.
    pub fn end(&self) -> Option<Point> {
        match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => Some(p),
            Segment::QuadTo(_, p) | Segment::CubicTo(_, _, p) => Some(p),
            Segment::Close => None,
        }
    }
}

/// Vector outline built from lines and Bézier segments; arcs and circles are
/// stored as cubics so a rasteriser can draw them without flattening.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    segments: Vec<Segment>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, to: Point) -> Self {
        self.segments.push(Segment::MoveTo(to));
        self
    }

    pub fn line_to(mut self, to: Point) -> Self {
        self.segments.push(Segment::LineTo(to));
        self
    }

    pub fn quad_to(mut self, control: Point, to: Point) -> Self {
        self.segments.push(Segment::QuadTo(control, to));
        self
    }

    pub fn cubic_to(mut self, control1: Point, control2: Point, to: Point) -> Self {
        self.segments.push(Segment::CubicTo(control1, control2, to));
        self
    }

    pub fn close(mut self) -> Self {
        self.segments.push(Segment::Close);
        self
    }

    pub fn curve(curve: &CubicBezier) -> Self {
        Self::new()
            .move_to(curve.start)
            .cubic_to(curve.control1, curve.control2, curve.end)
    }

    /// Open arc of `radius` around `center` from `start` to `end` radians,
    /// one cubic per quarter turn or less.
    pub fn arc(center: Point, radius: f32, start: f32, end: f32) -> Self {
        let sweep = end - start;
        let pieces = (sweep.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / pieces as f32;
        let k = radius * 4.0 / 3.0 * (step / 4.0).tan();
        let on_circle = |angle: f32| center.offset(radius * angle.cos(), radius * angle.sin());
        let tangent = |angle: f32| Point::new(-angle.sin(), angle.cos());

        let mut shape = Self::new().move_to(on_circle(start));
        for i in 0..pieces {
            let a = start + step * i as f32;
            let b = a + step;
            shape = shape.cubic_to(
                on_circle(a) + tangent(a) * k,
                on_circle(b) - tangent(b) * k,
                on_circle(b),
            );
        }
        shape
    }

    /// Closed circle made of four quarter arcs that returns exactly to its
    /// starting point.
    pub fn circle(center: Point, radius: f32) -> Self {
        let k = radius * 4.0 / 3.0 * (FRAC_PI_2 / 4.0).tan();
        let right = center.offset(radius, 0.0);
        let bottom = center.offset(0.0, radius);
        let left = center.offset(-radius, 0.0);
        let top = center.offset(0.0, -radius);
        Self::new()
            .move_to(right)
            .cubic_to(right.offset(0.0, k), bottom.offset(k, 0.0), bottom)
            .cubic_to(bottom.offset(-k, 0.0), left.offset(0.0, k), left)
            .cubic_to(left.offset(0.0, -k), top.offset(-k, 0.0), top)
            .cubic_to(top.offset(k, 0.0), right.offset(0.0, -k), right)
            .close()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// On-curve points of the outline. A segment that returns to the start
    /// of its subpath is not repeated.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        let mut subpath_start = None;
        for segment in &self.segments {
            let Some(end) = segment.end() else {
                continue;
            };
            if let Segment::MoveTo(p) = segment {
                subpath_start = Some(*p);
            } else if subpath_start == Some(end) {
                continue;
            }
            points.push(end);
        }
        points
    }
}

/// Evaluates a one-dimensional cubic Bézier at `t`.
pub fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}

/// Cubic Bézier curve in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub fn new(start: Point, control1: Point, control2: Point, end: Point) -> Self {
        Self {
            start,
            control1,
            control2,
            end,
        }
    }

    pub fn point_at(&self, t: f32) -> Point {
        Point::new(
            cubic_bezier(self.start.x, self.control1.x, self.control2.x, self.end.x, t),
            cubic_bezier(self.start.y, self.control1.y, self.control2.y, self.end.y, t),
        )
    }

    /// Points at `samples + 1` evenly spaced parameters from 0 to 1 inclusive.
    pub fn sample(&self, samples: usize) -> Vec<Point> {
        let samples = samples.max(1);
        (0..=samples)
            .map(|i| self.point_at(i as f32 / samples as f32))
            .collect()
    }
}

/// Arithmetic mean of the given points, if there are any.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Point::default(), |acc, p| acc + *p);
    Some(sum * (1.0 / points.len() as f32))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    #[test]
    fn bezier_hits_endpoints_and_sags_in_the_middle() {
        let curve = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(25.0, 20.0),
            Point::new(75.0, 20.0),
            Point::new(100.0, 0.0),
        );
        assert_eq!(curve.point_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(curve.point_at(1.0), Point::new(100.0, 0.0));

        let mid = curve.point_at(0.5);
        assert!((mid.x - 50.0).abs() < 1e-4);
        assert!((mid.y - 15.0).abs() < 1e-4);
        assert_eq!(curve.sample(18).len(), 19);
    }

    #[test]
    fn arc_endpoints_stay_on_radius() {
        let center = Point::new(10.0, 10.0);
        let shape = Shape::arc(center, 5.0, 0.15 * PI, 1.85 * PI);
        let points = shape.points();
        // one cubic per quarter turn
        assert_eq!(points.len(), 5);
        for p in points {
            assert!((p.distance(center) - 5.0).abs() < 1e-3);
        }
    }

    #[test]
    fn circle_closes_on_its_start() {
        let center = Point::new(4.0, 4.0);
        let shape = Shape::circle(center, 2.0);
        assert_eq!(shape.segments().last(), Some(&Segment::Close));
        assert_eq!(
            shape.points(),
            vec![
                Point::new(6.0, 4.0),
                Point::new(4.0, 6.0),
                Point::new(2.0, 4.0),
                Point::new(4.0, 2.0),
            ]
        );
        assert_eq!(centroid(&shape.points()), Some(center));
    }

    #[test]
    fn rect_intersection() {
        let frame = Rect::new(0.0, 0.0, 400.0, 400.0);
        let huge = Rect::new(-1.0e9, 250.0, 2.0e9, 7.0e8);
        assert_eq!(frame.intersect(&huge), Some(Rect::new(0.0, 250.0, 400.0, 150.0)));
        assert_eq!(frame.intersect(&Rect::new(500.0, 0.0, 10.0, 10.0)), None);
        assert_eq!(frame.intersect(&Rect::new(f32::NAN, 0.0, 10.0, 10.0)), None);
    }
}
