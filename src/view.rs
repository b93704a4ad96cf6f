//! Pan/zoom state of one editor, with animated navigation and suspend nesting.

use tracing::{debug, trace};

use crate::geometry::{Rect, Vec2, ViewTransform};

/// Remaining distance (screen pixels) under which an animation snaps to its
/// target.
const SNAP_EPSILON: f32 = 0.25;
const ZOOM_SNAP_EPSILON: f32 = 1e-4;

/// In-flight view animation. Interpolates the canvas point shown at the
/// viewport center together with the zoom, so the motion looks straight on
/// screen regardless of the zoom change.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewAnimation {
    from_center: Vec2,
    from_zoom: f32,
    to_center: Vec2,
    to_zoom: f32,
    duration: f32,
    elapsed: f32,
}

fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

pub struct ViewController {
    transform: ViewTransform,
    viewport: Vec2,
    zoom_limits: (f32, f32),
    zoom_levels: Vec<f32>,
    default_duration: f32,
    animation: Option<ViewAnimation>,
    suspend_depth: u32,
    changed: bool,
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new((0.01, 15.0), Vec::new())
    }
}

impl ViewController {
    pub fn new(zoom_limits: (f32, f32), mut zoom_levels: Vec<f32>) -> Self {
        zoom_levels.retain(|z| z.is_finite() && *z > 0.0);
        zoom_levels.sort_by(f32::total_cmp);
        zoom_levels.dedup();
        Self {
            transform: ViewTransform::default(),
            viewport: Vec2::ZERO,
            zoom_limits,
            zoom_levels,
            default_duration: 0.35,
            animation: None,
            suspend_depth: 0,
            changed: false,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.transform.pan
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, size: Vec2) {
        self.viewport = size;
    }

    /// Duration used when a navigation call passes a negative duration.
    pub fn set_default_duration(&mut self, seconds: f32) {
        self.default_duration = seconds.max(0.0);
    }

    /// Part of the canvas currently visible through the viewport.
    pub fn visible_canvas_rect(&self) -> Rect {
        self.transform
            .screen_rect_to_canvas(&Rect::from_min_size(Vec2::ZERO, self.viewport))
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        if !zoom.is_finite() || zoom <= 0.0 {
            return self.transform.zoom;
        }
        zoom.clamp(self.zoom_limits.0, self.zoom_limits.1)
    }

    fn apply(&mut self, transform: ViewTransform) {
        if transform != self.transform {
            self.transform = transform;
            self.changed = true;
        }
    }

    /// Edge-triggered: true once after the view moved.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    // === Immediate changes ===

    /// Set pan and zoom immediately, cancelling any animation.
    pub fn set_view(&mut self, pan: Vec2, zoom: f32) {
        self.animation = None;
        let zoom = self.clamp_zoom(zoom);
        self.apply(ViewTransform::new(pan, zoom));
    }

    /// Change zoom while keeping the canvas point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Vec2, zoom: f32) {
        self.animation = None;
        let zoom = self.clamp_zoom(zoom);
        let anchor = self.transform.screen_to_canvas(screen_point);
        let pan = screen_point - anchor * zoom;
        self.apply(ViewTransform::new(pan, zoom));
    }

    /// Next zoom for `steps` wheel steps: walks the configured zoom levels,
    /// or scales by 10% per step when none are configured.
    pub fn wheel_zoom_target(&self, steps: f32) -> f32 {
        let current = self.transform.zoom;
        if steps == 0.0 {
            return current;
        }
        if self.zoom_levels.is_empty() {
            return self.clamp_zoom(current * 1.1f32.powf(steps));
        }
        let eps = current * 1e-3;
        let next = if steps > 0.0 {
            self.zoom_levels.iter().copied().find(|z| *z > current + eps)
        } else {
            self.zoom_levels.iter().rev().copied().find(|z| *z < current - eps)
        };
        self.clamp_zoom(next.unwrap_or(current))
    }

    pub fn wheel_zoom(&mut self, screen_point: Vec2, steps: f32) {
        let target = self.wheel_zoom_target(steps);
        trace!(steps, target, "wheel zoom");
        self.zoom_at(screen_point, target);
    }

    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.animation = None;
        let mut transform = self.transform;
        transform.pan += screen_delta;
        self.apply(transform);
    }

    // === Animated navigation ===

    fn canvas_center(&self) -> Vec2 {
        self.transform.screen_to_canvas(self.viewport * 0.5)
    }

    fn transform_for(&self, canvas_center: Vec2, zoom: f32) -> ViewTransform {
        ViewTransform::new(self.viewport * 0.5 - canvas_center * zoom, zoom)
    }

    /// Move so that `canvas_center` is shown at the viewport center with
    /// `zoom`. `duration < 0` uses the default duration, `0` is instant.
    pub fn animate_to(&mut self, canvas_center: Vec2, zoom: f32, duration: f32) {
        let zoom = self.clamp_zoom(zoom);
        let duration = if duration < 0.0 { self.default_duration } else { duration };
        if duration == 0.0 {
            self.animation = None;
            let target = self.transform_for(canvas_center, zoom);
            self.apply(target);
            return;
        }
        debug!(?canvas_center, zoom, duration, "view animation started");
        self.animation = Some(ViewAnimation {
            from_center: self.canvas_center(),
            from_zoom: self.transform.zoom,
            to_center: canvas_center,
            to_zoom: zoom,
            duration,
            elapsed: 0.0,
        });
    }

    /// Fit `rect` (canvas space) into the viewport minus `margin` pixels on
    /// every side. Without `zoom_in` the zoom only ever decreases.
    pub fn navigate_to_rect(&mut self, rect: Rect, duration: f32, zoom_in: bool, margin: f32) {
        let current = self.transform.zoom;
        let available = self.viewport - Vec2::splat(margin * 2.0);
        let fit = if rect.width() > 0.0 && rect.height() > 0.0 && available.x > 0.0 && available.y > 0.0 {
            (available.x / rect.width()).min(available.y / rect.height())
        } else {
            current
        };
        let zoom = if zoom_in { fit } else { fit.min(current) };
        self.animate_to(rect.center(), zoom, duration);
    }

    /// Recenter on `canvas_point` without changing zoom.
    pub fn center_on(&mut self, canvas_point: Vec2, duration: f32) {
        let zoom = self.transform.zoom;
        self.animate_to(canvas_point, zoom, duration);
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn stop_animation(&mut self) {
        self.animation = None;
    }

    /// Advance the active animation by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let Some(mut anim) = self.animation else {
            return;
        };
        anim.elapsed += dt.max(0.0);
        let t = if anim.duration > 0.0 { anim.elapsed / anim.duration } else { 1.0 };
        let e = ease_out_cubic(t);

        let target = self.transform_for(anim.to_center, anim.to_zoom);
        let zoom = anim.from_zoom + (anim.to_zoom - anim.from_zoom) * e;
        let center = anim.from_center.lerp(anim.to_center, e);
        let next = self.transform_for(center, zoom);

        let close = next.pan.abs_diff_eq(target.pan, SNAP_EPSILON)
            && (next.zoom - target.zoom).abs() < ZOOM_SNAP_EPSILON;
        if t >= 1.0 || close {
            self.animation = None;
            self.apply(target);
            debug!(pan = ?target.pan, zoom = target.zoom, "view animation finished");
        } else {
            self.animation = Some(anim);
            self.apply(next);
        }
    }

    // === Suspend ===

    pub fn suspend(&mut self) {
        self.suspend_depth += 1;
    }

    /// Returns false if there was no matching suspend.
    pub fn resume(&mut self) -> bool {
        if self.suspend_depth == 0 {
            return false;
        }
        self.suspend_depth -= 1;
        true
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend_depth > 0
    }
}
