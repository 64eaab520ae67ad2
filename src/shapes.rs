//! # Planar shapes used as spatial selectors
//!
//! [`Rectangle`], [`Circle`] and [`Polygon`] implement [`Shape`]: a membership test
//! on the first two components of a [`Coord`] plus the derived
//! [`Shape::select`] that keeps the observations of a track lying inside.
//!
//! Shapes are purely planar. For geodetic tracks the first two components are
//! longitude and latitude in degrees, so convert to a local frame first when
//! metric radii matter.
//!
//! Minimal enclosing circle
//! -----------------
//! [`Circle::enclosing`] is Welzl's algorithm in its iterative move-to-front
//! form: the points are shuffled once, then scanned linearly with at most three
//! boundary points held at a time. Expected running time is linear and the stack
//! depth is constant whatever the number of points.
use rand::seq::SliceRandom;
use rand::Rng;

use crate::control::Monitor;
use crate::coords::Coord;
use crate::track::Track;
use crate::tracklib_errors::TrackError;

/// Relative slack of the enclosing-circle membership test.
const CIRCLE_EPSILON: f64 = 1e-12;

pub trait Shape {
    /// Whether the horizontal projection of `p` lies inside (boundary included).
    fn contains(&self, p: &Coord) -> bool;

    /// Observations of `track` lying inside the shape, features kept.
    fn select(&self, track: &Track) -> Track
    where
        Self: Sized,
    {
        track.select_by(self)
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rectangle {
    /// Rectangle from two opposite corners given in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Rectangle {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Bounding rectangle of a point set, `None` if the set is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Rectangle::new(x, y, x, y),
                Some(r) => Rectangle {
                    x_min: r.x_min.min(x),
                    y_min: r.y_min.min(y),
                    x_max: r.x_max.max(x),
                    y_max: r.y_max.max(y),
                },
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.x_min + self.x_max),
            0.5 * (self.y_min + self.y_max),
        )
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

impl Shape for Rectangle {
    fn contains(&self, p: &Coord) -> bool {
        self.contains_xy(p.x(), p.y())
    }
}

/// Disk of given center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
}

impl Circle {
    pub fn new(cx: f64, cy: f64, radius: f64) -> Self {
        Circle {
            center: (cx, cy),
            radius,
        }
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let d = (x - self.center.0).hypot(y - self.center.1);
        d <= self.radius * (1.0 + CIRCLE_EPSILON) + CIRCLE_EPSILON
    }

    fn diameter(p: (f64, f64), q: (f64, f64)) -> Circle {
        let c = (0.5 * (p.0 + q.0), 0.5 * (p.1 + q.1));
        Circle {
            center: c,
            radius: (p.0 - c.0).hypot(p.1 - c.1).max((q.0 - c.0).hypot(q.1 - c.1)),
        }
    }

    /// Circle through three points, `None` when they are collinear.
    fn circumscribed(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Option<Circle> {
        // translate to the bounding box center for stability
        let ox = (a.0.min(b.0).min(c.0) + a.0.max(b.0).max(c.0)) / 2.0;
        let oy = (a.1.min(b.1).min(c.1) + a.1.max(b.1).max(c.1)) / 2.0;
        let (ax, ay) = (a.0 - ox, a.1 - oy);
        let (bx, by) = (b.0 - ox, b.1 - oy);
        let (cx, cy) = (c.0 - ox, c.1 - oy);
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d == 0.0 {
            return None;
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let x = ox + (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let y = oy + (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let r = [a, b, c]
            .iter()
            .map(|p| (p.0 - x).hypot(p.1 - y))
            .fold(0.0, f64::max);
        Some(Circle::new(x, y, r))
    }

    /// Minimal circle enclosing all `points`.
    ///
    /// Arguments
    /// -----------------
    /// * `points`: planar points (order irrelevant, a shuffled copy is processed).
    /// * `rng`: source for the initial shuffle.
    /// * `monitor`: ticked once per outer iteration, may cancel.
    ///
    /// Return
    /// ----------
    /// * [`TrackError::WrongArgument`] on an empty point set,
    ///   [`TrackError::Cancelled`] if the monitor asks so.
    pub fn enclosing(
        points: &[(f64, f64)],
        rng: &mut impl Rng,
        monitor: &mut Monitor,
    ) -> Result<Circle, TrackError> {
        if points.is_empty() {
            return Err(TrackError::wrong("enclosing circle of an empty point set"));
        }
        let mut pts = points.to_vec();
        pts.shuffle(rng);

        let n = pts.len();
        let mut circle = Circle::new(pts[0].0, pts[0].1, 0.0);
        for i in 1..n {
            monitor.tick(i, n)?;
            let p = pts[i];
            if !circle.contains_xy(p.0, p.1) {
                circle = Self::with_one_boundary(&pts[..i], p);
            }
        }
        Ok(circle)
    }

    /// Enclosing circle of the whole track (horizontal components).
    pub fn enclosing_track(
        track: &Track,
        rng: &mut impl Rng,
        monitor: &mut Monitor,
    ) -> Result<Circle, TrackError> {
        let points: Vec<(f64, f64)> = track
            .observations()
            .iter()
            .map(|o| (o.position.x(), o.position.y()))
            .collect();
        Circle::enclosing(&points, rng, monitor)
    }

    fn with_one_boundary(points: &[(f64, f64)], p: (f64, f64)) -> Circle {
        let mut circle = Circle::new(p.0, p.1, 0.0);
        for (i, &q) in points.iter().enumerate() {
            if !circle.contains_xy(q.0, q.1) {
                circle = if circle.radius == 0.0 {
                    Circle::diameter(p, q)
                } else {
                    Self::with_two_boundary(&points[..=i], p, q)
                };
            }
        }
        circle
    }

    fn with_two_boundary(points: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> Circle {
        let base = Circle::diameter(p, q);
        let cross = |r: (f64, f64)| (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0);

        let mut left: Option<Circle> = None;
        let mut right: Option<Circle> = None;
        for &r in points {
            if base.contains_xy(r.0, r.1) {
                continue;
            }
            let side = cross(r);
            let Some(c) = Circle::circumscribed(p, q, r) else {
                continue;
            };
            let offset = cross(c.center);
            if side > 0.0 && left.map_or(true, |l| offset > cross(l.center)) {
                left = Some(c);
            } else if side < 0.0 && right.map_or(true, |rc| offset < cross(rc.center)) {
                right = Some(c);
            }
        }

        match (left, right) {
            (None, None) => base,
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (Some(l), Some(r)) => {
                if l.radius <= r.radius {
                    l
                } else {
                    r
                }
            }
        }
    }
}

impl Shape for Circle {
    fn contains(&self, p: &Coord) -> bool {
        self.contains_xy(p.x(), p.y())
    }
}

/// Simple polygon given by its vertices (closing edge implied).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Polygon { vertices }
    }

    /// Outline of a track taken as a polygon ring.
    pub fn from_track(track: &Track) -> Self {
        Polygon::new(
            track
                .observations()
                .iter()
                .map(|o| (o.position.x(), o.position.y()))
                .collect(),
        )
    }

    /// Signed shoelace area (positive counterclockwise).
    pub fn signed_area(&self) -> f64 {
        shoelace(&self.vertices)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Ray casting test (even-odd rule).
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl Shape for Polygon {
    fn contains(&self, p: &Coord) -> bool {
        self.contains_xy(p.x(), p.y())
    }
}

/// Signed area of a closed ring by the shoelace formula.
pub(crate) fn shoelace(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    0.5 * (0..n)
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum::<f64>()
}
