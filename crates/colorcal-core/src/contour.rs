//! Planar geometry on closed pixel contours.
//!
//! A contour is a closed polyline of integer pixel coordinates; the last
//! point connects back to the first. Most operations defer to
//! `imageproc::geometry`.

use crate::ops::{from_luma, to_luma};
use crate::GrayImage;
use ::image::Luma;
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry;
use imageproc::point::Point;
use nalgebra::Point2;

pub type Contour = Vec<Point2<i32>>;

#[inline]
fn to_f64(p: &Point2<i32>) -> (f64, f64) {
    (p.x as f64, p.y as f64)
}

pub(crate) fn to_points(contour: &[Point2<i32>]) -> Vec<Point<i32>> {
    contour.iter().map(|p| Point::new(p.x, p.y)).collect()
}

pub(crate) fn from_points(points: &[Point<i32>]) -> Contour {
    points.iter().map(|p| Point2::new(p.x, p.y)).collect()
}

/// Perimeter of the closed contour.
pub fn arc_length(contour: &[Point2<i32>]) -> f64 {
    if contour.len() < 2 {
        return 0.0;
    }
    geometry::arc_length(&to_points(contour), true)
}

/// Raw polygon moments of order <= 1 (Green's theorem).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Centroid `(m10 / m00, m01 / m00)`, `None` for degenerate polygons.
    pub fn centroid(&self) -> Option<Point2<f32>> {
        if self.m00.abs() < f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            (self.m10 / self.m00) as f32,
            (self.m01 / self.m00) as f32,
        ))
    }
}

/// Orientation-independent polygon moments.
pub fn moments(contour: &[Point2<i32>]) -> Moments {
    let n = contour.len();
    if n < 3 {
        return Moments::default();
    }
    let mut a = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let (x0, y0) = to_f64(&contour[i]);
        let (x1, y1) = to_f64(&contour[(i + 1) % n]);
        let cross = x0 * y1 - x1 * y0;
        a += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    a *= 0.5;
    if a.abs() < f64::EPSILON {
        return Moments::default();
    }
    // Sign of `a` depends on the traversal direction; the ratios don't.
    let sign = a.signum();
    Moments {
        m00: a.abs(),
        m10: sign * cx / 6.0,
        m01: sign * cy / 6.0,
    }
}

/// Unsigned shoelace area.
pub fn contour_area(contour: &[Point2<i32>]) -> f64 {
    moments(contour).m00
}

/// True when the polygon is its own convex hull.
pub fn is_convex(contour: &[Point2<i32>]) -> bool {
    let points = to_points(contour);
    points.len() >= 3 && geometry::convex_hull(points.as_slice()).len() == points.len()
}

fn farthest_from(contour: &[Point2<i32>], from: usize) -> usize {
    let o = to_f64(&contour[from]);
    let mut best = from;
    let mut best_d = -1.0;
    for (i, p) in contour.iter().enumerate() {
        let (x, y) = to_f64(p);
        let d = (x - o.0).hypot(y - o.1);
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Closed-curve polygon simplification.
///
/// The curve is split at two mutually distant points and each half goes
/// through open Douglas-Peucker with tolerance `epsilon`, so the split
/// points always survive as vertices.
pub fn approx_polygon(contour: &[Point2<i32>], epsilon: f64) -> Contour {
    let n = contour.len();
    if n < 3 || epsilon <= 0.0 {
        return contour.to_vec();
    }
    let a = farthest_from(contour, 0);
    let b = farthest_from(contour, a);
    if a == b {
        return vec![contour[a]];
    }

    let half = |from: usize, to: usize| -> Vec<Point<i32>> {
        let len = (to + n - from) % n + 1;
        (0..len)
            .map(|k| {
                let p = contour[(from + k) % n];
                Point::new(p.x, p.y)
            })
            .collect()
    };

    let mut out = Vec::new();
    for chain in [half(a, b), half(b, a)] {
        let mut simplified = geometry::approximate_polygon_dp(&chain, epsilon, false);
        // Each half ends where the other starts.
        simplified.pop();
        out.extend(simplified.iter().map(|p| Point2::new(p.x, p.y)));
    }
    out
}

/// Oriented bounding rectangle of minimum area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotatedRect {
    pub center: Point2<f32>,
    pub width: f32,
    pub height: f32,
    pub angle_rad: f32,
}

impl RotatedRect {
    /// Rectangle through four corners in any order. The corner farthest
    /// from the first one is its diagonal opposite.
    fn from_corners(corners: &[Point<i32>; 4]) -> Self {
        let c: Vec<(f32, f32)> = corners.iter().map(|p| (p.x as f32, p.y as f32)).collect();
        let mut sides: Vec<(f32, f32, f32)> = c[1..]
            .iter()
            .map(|p| {
                let (dx, dy) = (p.0 - c[0].0, p.1 - c[0].1);
                (dx.hypot(dy), dx, dy)
            })
            .collect();
        sides.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (width, dx, dy) = sides[0];
        Self {
            center: Point2::new(
                c.iter().map(|p| p.0).sum::<f32>() / 4.0,
                c.iter().map(|p| p.1).sum::<f32>() / 4.0,
            ),
            width,
            height: sides[1].0,
            angle_rad: dy.atan2(dx),
        }
    }

    /// Long side over short side; infinite for degenerate rectangles.
    pub fn aspect_ratio(&self) -> f32 {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if short <= 0.0 {
            return f32::INFINITY;
        }
        long / short
    }
}

/// Minimum-area enclosing rectangle, `None` for collinear input.
pub fn min_area_rect(contour: &[Point2<i32>]) -> Option<RotatedRect> {
    let points = to_points(contour);
    if geometry::convex_hull(points.as_slice()).len() < 3 {
        return None;
    }
    let corners = geometry::min_area_rect(&points);
    Some(RotatedRect::from_corners(&corners))
}

/// Circle as `(center, radius)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point2<f32>,
    pub radius: f32,
}

impl Circle {
    pub fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }
}

type C64 = ((f64, f64), f64);

fn circle_contains(c: &C64, p: (f64, f64)) -> bool {
    (p.0 - c.0 .0).hypot(p.1 - c.0 .1) <= c.1 * (1.0 + 1e-9) + 1e-9
}

fn circle_from_two(a: (f64, f64), b: (f64, f64)) -> C64 {
    let c = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    (c, (a.0 - c.0).hypot(a.1 - c.1))
}

fn circle_from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> C64 {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < f64::EPSILON {
        // Collinear: the widest pair spans the circle.
        let pairs = [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)];
        return pairs
            .into_iter()
            .fold(pairs[0], |best, cur| if cur.1 > best.1 { cur } else { best });
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    ((ux, uy), (a.0 - ux).hypot(a.1 - uy))
}

/// Smallest circle containing every contour point (incremental Welzl).
pub fn min_enclosing_circle(contour: &[Point2<i32>]) -> Option<Circle> {
    let pts: Vec<(f64, f64)> = contour.iter().map(to_f64).collect();
    let first = *pts.first()?;
    let mut c: C64 = (first, 0.0);
    for i in 1..pts.len() {
        if circle_contains(&c, pts[i]) {
            continue;
        }
        c = (pts[i], 0.0);
        for j in 0..i {
            if circle_contains(&c, pts[j]) {
                continue;
            }
            c = circle_from_two(pts[i], pts[j]);
            for k in 0..j {
                if !circle_contains(&c, pts[k]) {
                    c = circle_from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    Some(Circle {
        center: Point2::new(c.0 .0 as f32, c.0 .1 as f32),
        radius: c.1 as f32,
    })
}

/// Axis-aligned inclusive bounds `(x0, y0, x1, y1)` of the contour.
pub fn bounding_box(contour: &[Point2<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = contour.first()?;
    Some(contour.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    ))
}

/// Rasterize a closed polygon (interior plus outline) into `out`.
pub fn fill_polygon(out: &mut GrayImage, polygon: &[Point2<i32>], value: u8) {
    let mut points = to_points(polygon);
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        for p in &points {
            if p.x >= 0 && p.y >= 0 && (p.x as usize) < out.width && (p.y as usize) < out.height {
                out.set(p.x as usize, p.y as usize, value);
            }
        }
        return;
    }
    let mut canvas = to_luma(out);
    draw_polygon_mut(&mut canvas, &points, Luma([value]));
    *out = from_luma(canvas);
}
