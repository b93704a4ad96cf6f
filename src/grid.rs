use std::fmt::Write as _;

use crate::geometry::{Vec2, ViewTransform};

/// Grid lines closer than this on screen are not drawn.
const MIN_SCREEN_SPACING: f32 = 4.0;

/// Screen-space grid lines covering a viewport of `size`.
///
/// Lines sit on multiples of `spacing` in canvas space, so the grid moves
/// with pan and scales with zoom. Returns nothing when the lines would be
/// closer than 4 pixels.
pub fn grid_lines(size: Vec2, view: &ViewTransform, spacing: f32) -> Vec<(Vec2, Vec2)> {
    let step = spacing * view.zoom;

    if !step.is_finite() || step < MIN_SCREEN_SPACING {
        return Vec::new();
    }

    // First line at or after the viewport origin
    let offset_x = view.pan.x.rem_euclid(step);
    let offset_y = view.pan.y.rem_euclid(step);

    let mut lines = Vec::with_capacity(((size.x + size.y) / step) as usize + 2);

    let mut x = offset_x;
    while x <= size.x {
        lines.push((Vec2::new(x, 0.0), Vec2::new(x, size.y)));
        x += step;
    }

    let mut y = offset_y;
    while y <= size.y {
        lines.push((Vec2::new(0.0, y), Vec2::new(size.x, y)));
        y += step;
    }

    lines
}

/// The grid as SVG path text (e.g. "M 24 0 L 24 600 M 48 0 L 48 600 ...").
pub fn grid_svg_path(size: Vec2, view: &ViewTransform, spacing: f32) -> String {
    let lines = grid_lines(size, view, spacing);
    let mut path = String::with_capacity(lines.len() * 24);
    for (from, to) in lines {
        if !path.is_empty() {
            path.push(' ');
        }
        // Writing to a String cannot fail
        let _ = write!(path, "M {} {} L {} {}", from.x, from.y, to.x, to.y);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(pan_x: f32, pan_y: f32, zoom: f32) -> ViewTransform {
        ViewTransform::new(Vec2::new(pan_x, pan_y), zoom)
    }

    fn size() -> Vec2 {
        Vec2::new(100.0, 100.0)
    }

    // ========================================================================
    // Basic Grid Generation
    // ========================================================================

    #[test]
    fn test_grid_svg_path() {
        let path = grid_svg_path(size(), &view(0.0, 0.0, 1.0), 24.0);
        assert!(path.starts_with("M 0 0 L 0 100"));
        assert!(path.contains("M 24 0 L 24 100"));
        assert!(path.contains("M 0 24 L 100 24"));
        assert!(!path.ends_with(' '));
    }

    #[test]
    fn test_grid_line_count() {
        // 0, 25, 50, 75, 100 in both directions
        let lines = grid_lines(size(), &view(0.0, 0.0, 1.0), 25.0);
        assert_eq!(lines.len(), 10);
    }

    // ========================================================================
    // Zoom Behavior
    // ========================================================================

    #[test]
    fn test_zoom_widens_spacing() {
        let near = grid_lines(size(), &view(0.0, 0.0, 2.0), 20.0);
        let far = grid_lines(size(), &view(0.0, 0.0, 1.0), 20.0);
        assert!(far.len() > near.len());
        assert_eq!(near[1].0.x, 40.0);
    }

    #[test]
    fn test_too_dense_grid_is_hidden() {
        // 20 * 0.1 = 2 pixels
        assert!(grid_lines(size(), &view(0.0, 0.0, 0.1), 20.0).is_empty());
        // Exactly at the threshold still renders
        assert!(!grid_lines(size(), &view(0.0, 0.0, 1.0), 4.0).is_empty());
        assert!(grid_svg_path(size(), &view(0.0, 0.0, 1.0), 3.9).is_empty());
    }

    // ========================================================================
    // Pan Behavior
    // ========================================================================

    #[test]
    fn test_pan_offsets_lines() {
        let lines = grid_lines(size(), &view(10.0, 0.0, 1.0), 20.0);
        assert_eq!(lines[0].0, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_pan_by_whole_step_is_identical() {
        let a = grid_svg_path(size(), &view(0.0, 0.0, 1.0), 20.0);
        let b = grid_svg_path(size(), &view(20.0, 40.0, 1.0), 20.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_pan_wraps() {
        let lines = grid_lines(size(), &view(-10.0, -10.0, 1.0), 20.0);
        assert_eq!(lines[0].0, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_spacing_larger_than_viewport() {
        let lines = grid_lines(Vec2::new(50.0, 50.0), &view(0.0, 0.0, 1.0), 100.0);
        // Only the lines through the origin
        assert_eq!(lines.len(), 2);
    }
}
