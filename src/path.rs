use crate::geometry::{Rect, Vec2};

/// Links shorter than this (in the curve's own units) are drawn straight
/// to avoid zig-zags.
const STRAIGHT_LINK_THRESHOLD: f32 = 10.0;

/// Cubic bezier curve used for link rendering and hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Vec2, // Start point
    pub p1: Vec2, // Control point 1
    pub p2: Vec2, // Control point 2
    pub p3: Vec2, // End point
}

impl CubicBezier {
    /// Build a link curve leaving `start` along `start_dir` and entering
    /// `end` against `end_dir`.
    ///
    /// The control point offset is half the horizontal span, but never less
    /// than `strength * zoom`. Pass `zoom = 1.0` when working in canvas space.
    pub fn for_link(
        start: Vec2,
        start_dir: Vec2,
        end: Vec2,
        end_dir: Vec2,
        zoom: f32,
        strength: f32,
    ) -> Self {
        let delta = end - start;
        let threshold = STRAIGHT_LINK_THRESHOLD * zoom;

        if delta.length_sq() < threshold * threshold {
            return CubicBezier {
                p0: start,
                p1: start,
                p2: end,
                p3: end,
            };
        }

        let offset = (delta.x.abs() * 0.5).max(strength * zoom);

        CubicBezier {
            p0: start,
            p1: start + start_dir * offset,
            p2: end + end_dir * offset,
            p3: end,
        }
    }

    /// Horizontal link between an output on the left and an input on the right.
    pub fn horizontal(start: Vec2, end: Vec2, zoom: f32, strength: f32) -> Self {
        Self::for_link(
            start,
            Vec2::new(1.0, 0.0),
            end,
            Vec2::new(-1.0, 0.0),
            zoom,
            strength,
        )
    }

    /// Map every control point through `f`. Bezier curves are affine
    /// invariant, so this is exact for the canvas/screen transform.
    pub fn map(&self, f: impl Fn(Vec2) -> Vec2) -> Self {
        CubicBezier {
            p0: f(self.p0),
            p1: f(self.p1),
            p2: f(self.p2),
            p3: f(self.p3),
        }
    }

    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> Vec2 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        self.p0 * mt3 + self.p1 * (3.0 * mt2 * t) + self.p2 * (3.0 * mt * t2) + self.p3 * t3
    }

    /// Split at `t` with de Casteljau's algorithm, returning the two halves.
    pub fn split(&self, t: f32) -> (CubicBezier, CubicBezier) {
        let t = t.clamp(0.0, 1.0);

        let q0 = self.p0.lerp(self.p1, t);
        let q1 = self.p1.lerp(self.p2, t);
        let q2 = self.p2.lerp(self.p3, t);

        let r0 = q0.lerp(q1, t);
        let r1 = q1.lerp(q2, t);

        let s = r0.lerp(r1, t);

        (
            CubicBezier {
                p0: self.p0,
                p1: q0,
                p2: r0,
                p3: s,
            },
            CubicBezier {
                p0: s,
                p1: r1,
                p2: q2,
                p3: self.p3,
            },
        )
    }

    /// Polyline approximation with `segments` segments (0 means 20).
    pub fn flatten(&self, segments: usize) -> Vec<Vec2> {
        let segments = if segments == 0 { 20 } else { segments };
        (0..=segments)
            .map(|i| self.eval(i as f32 / segments as f32))
            .collect()
    }

    /// Conservative bounds: the hull of the control points.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.p0.min(self.p1).min(self.p2).min(self.p3),
            self.p0.max(self.p1).max(self.p2).max(self.p3),
        )
    }

    /// Calculate the minimum distance from a point to the curve
    ///
    /// Uses subdivision: the curve is sampled at regular intervals and the
    /// distance to the resulting polyline is taken.
    pub fn distance_to(&self, point: Vec2, num_samples: usize) -> f32 {
        let num_samples = if num_samples == 0 { 20 } else { num_samples };

        let mut min_dist_sq = f32::MAX;
        let mut prev_point = self.eval(0.0);

        for i in 1..=num_samples {
            let t = i as f32 / num_samples as f32;
            let curr_point = self.eval(t);

            let dist_sq = distance_to_line_segment_sq(point, prev_point, curr_point);
            if dist_sq < min_dist_sq {
                min_dist_sq = dist_sq;
            }

            prev_point = curr_point;
        }

        min_dist_sq.sqrt()
    }

    /// True if any part of the sampled curve crosses `rect`.
    pub fn intersects_rect(&self, rect: &Rect, num_samples: usize) -> bool {
        if !self.bounds().intersects(rect) && !rect.contains(self.p0) {
            return false;
        }
        self.flatten(num_samples)
            .windows(2)
            .any(|w| rect.intersects_segment(w[0], w[1]))
    }

    /// SVG path command for this curve (e.g. "M 10 20 C 60 20 90 80 140 80"),
    /// for renderers that draw from path text.
    pub fn to_svg_path(&self) -> String {
        if self.p0 == self.p1 && self.p2 == self.p3 {
            return format!("M {} {} L {} {}", self.p0.x, self.p0.y, self.p3.x, self.p3.y);
        }
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.p0.x, self.p0.y, self.p1.x, self.p1.y, self.p2.x, self.p2.y, self.p3.x, self.p3.y
        )
    }
}

/// Calculate squared distance from a point to a line segment
fn distance_to_line_segment_sq(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let ap = point - a;

    let ab_len_sq = ab.length_sq();

    if ab_len_sq < f32::EPSILON {
        // Degenerate segment (a == b)
        return ap.length_sq();
    }

    // Project point onto line, clamped to segment
    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);

    (point - (a + ab * t)).length_sq()
}
