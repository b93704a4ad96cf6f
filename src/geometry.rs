//! Plane geometry and the canvas/screen mapping.
//!
//! Nodes live in canvas space. The [`ViewTransform`] maps canvas space to
//! screen pixels with a uniform zoom followed by a pan offset:
//!
//! ```text
//! screen = canvas * zoom + pan
//! canvas = (screen - pan) / zoom
//! ```

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A point or a displacement in either coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_sq(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Component-wise product.
    pub fn scale(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x * other.x, self.y * other.y)
    }

    pub fn lerp(self, to: Vec2, t: f32) -> Vec2 {
        self + (to - self) * t
    }

    pub fn abs_diff_eq(self, other: Vec2, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Vec2::new(x, y)
    }
}

/// Axis aligned rectangle, `min` inclusive, `max` exclusive for hit tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self::new(min, min + size)
    }

    /// Rectangle spanned by two arbitrary corners (rubber band).
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self::new(a.min(b), a.max(b))
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        Self::from_min_size(center - size * 0.5, size)
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn expanded(&self, amount: f32) -> Rect {
        Rect::new(self.min - Vec2::splat(amount), self.max + Vec2::splat(amount))
    }

    pub fn translated(&self, by: Vec2) -> Rect {
        Rect::new(self.min + by, self.max + by)
    }

    /// Point on the rectangle addressed by a normalized alignment
    /// (`(0, 0)` is `min`, `(1, 1)` is `max`).
    pub fn point_at(&self, alignment: Vec2) -> Vec2 {
        self.min + self.size().scale(alignment)
    }

    /// Segment/rectangle intersection (Liang-Barsky clipping).
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }

        let d = b - a;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        let edges = [
            (-d.x, a.x - self.min.x),
            (d.x, self.max.x - a.x),
            (-d.y, a.y - self.min.y),
            (d.y, self.max.y - a.y),
        ];

        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }

        t0 <= t1
    }

    /// Smallest rectangle containing all of `rects`, `None` for an empty input.
    pub fn bounding<I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = Rect>,
    {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }
}

/// Canvas to screen mapping: uniform zoom, then pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Screen position of the canvas origin.
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn new(pan: Vec2, zoom: f32) -> Self {
        Self { pan, zoom }
    }

    pub fn canvas_to_screen(&self, p: Vec2) -> Vec2 {
        p * self.zoom + self.pan
    }

    pub fn screen_to_canvas(&self, p: Vec2) -> Vec2 {
        (p - self.pan) / self.zoom
    }

    pub fn canvas_rect_to_screen(&self, r: &Rect) -> Rect {
        Rect::new(self.canvas_to_screen(r.min), self.canvas_to_screen(r.max))
    }

    pub fn screen_rect_to_canvas(&self, r: &Rect) -> Rect {
        Rect::new(self.screen_to_canvas(r.min), self.screen_to_canvas(r.max))
    }

    /// Converts a screen-space length (pixels) into canvas units.
    pub fn screen_len_to_canvas(&self, len: f32) -> f32 {
        len / self.zoom
    }
}
