//! Widget geometry: directional snapping, drag and resize with grid snapping
//!
//! Coordinates are screen pixels with the origin at the bottom-left corner and
//! y pointing up. A widget is centered on its anchor point plus its position.

use std::f32::consts::FRAC_PI_4;

use glam::Vec2;

use crate::config::button::ButtonConfig;
use crate::constants::input::{AXIS_EPSILON, SOFT_SNAP_RATIO};
use crate::constants::snap::{GRID_AT_1080P, MAX_SCALE, MIN_SCALE, REFERENCE_HEIGHT};
use crate::types::Anchor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Snap grid for this screen
    pub fn snap_grid(&self) -> f32 {
        snap_grid_for_screen(self.width, self.height)
    }
}

/// Axis-aligned rectangle in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn left(&self) -> f32 {
        self.min.x
    }

    pub fn right(&self) -> f32 {
        self.max.x
    }

    pub fn bottom(&self) -> f32 {
        self.min.y
    }

    pub fn top(&self) -> f32 {
        self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    fn fits_horizontally(&self, viewport: Viewport) -> bool {
        self.left() >= 0.0 && self.right() < viewport.width
    }

    fn fits_vertically(&self, viewport: Viewport) -> bool {
        self.bottom() >= 0.0 && self.top() < viewport.height
    }
}

/// Screen-space bounds of a widget anchored at `anchor` and offset by `position`
pub fn screen_rect(anchor: Anchor, position: Vec2, size: Vec2, viewport: Viewport) -> Rect {
    Rect::from_center(anchor.fraction() * viewport.size() + position, size)
}

/// 20px on a 1080p screen, scaled by the shorter screen edge, never below 1
pub fn snap_grid_for_screen(screen_width: f32, screen_height: f32) -> f32 {
    let shorter = screen_width.min(screen_height);
    (GRID_AT_1080P * shorter / REFERENCE_HEIGHT).round().max(1.0)
}

/// Quantize a stick vector to one of eight unit directions, or zero inside the deadzone
pub fn snap_to_8_directions(input: Vec2, deadzone: f32) -> Vec2 {
    if !input.is_finite() || input.length() < deadzone || input == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let angle = (input.y.atan2(input.x) / FRAC_PI_4).round() * FRAC_PI_4;
    let (sin, cos) = angle.sin_cos();
    Vec2::new(zero_if_tiny(cos), zero_if_tiny(sin))
}

/// Drop the minor axis when the stick is clearly pushed along the other one
pub fn snap_softly_to_8_directions(input: Vec2) -> Vec2 {
    let (ax, ay) = (input.x.abs(), input.y.abs());
    if ax > ay * SOFT_SNAP_RATIO {
        Vec2::new(input.x, 0.0)
    } else if ay > ax * SOFT_SNAP_RATIO {
        Vec2::new(0.0, input.y)
    } else {
        input
    }
}

fn zero_if_tiny(v: f32) -> f32 {
    if v.abs() < AXIS_EPSILON { 0.0 } else { v }
}

/// Round each axis to the nearest multiple of `grid`
pub fn round_to_grid(v: Vec2, grid: f32) -> Vec2 {
    if grid <= 0.0 || !grid.is_finite() {
        return v;
    }
    (v / grid).round() * grid
}

/// Snapshot of the part of a widget that drag and resize operate on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetTransform {
    pub anchor: Anchor,
    pub position: Vec2,
    pub default_position: Vec2,
    pub size: Vec2,
    pub default_size: Vec2,
}

impl From<&ButtonConfig> for WidgetTransform {
    fn from(button: &ButtonConfig) -> Self {
        Self {
            anchor: button.anchor,
            position: button.position,
            default_position: button.default_position,
            size: button.size,
            default_size: button.default_size,
        }
    }
}

impl WidgetTransform {
    pub fn rect(&self, viewport: Viewport) -> Rect {
        screen_rect(self.anchor, self.position, self.size, viewport)
    }
}

/// Position for a drag that started at `start` and has moved by `delta` so far.
///
/// The result is grid-rounded and pulled onto the default position when within
/// one grid cell of it. An axis on which the widget would leave the viewport
/// keeps its current value instead of being clamped to the edge.
pub fn drag_position(widget: &WidgetTransform, start: Vec2, delta: Vec2, grid: f32, viewport: Viewport) -> Vec2 {
    let mut proposed = round_to_grid(start + delta, grid);
    if proposed.distance(widget.default_position) < grid {
        proposed = widget.default_position;
    }

    let rect = screen_rect(widget.anchor, proposed, widget.size, viewport);
    if !rect.fits_horizontally(viewport) {
        proposed.x = widget.position.x;
    }
    if !rect.fits_vertically(viewport) {
        proposed.y = widget.position.y;
    }
    proposed
}

/// Size for a resize that started at `start_size` and has moved by `delta`.
///
/// Growth is proportional to the larger delta component on both sides of the
/// widget. The width decides the limits: below 0.5x or above 5x of the default
/// the whole size is replaced by that multiple. The limited size is then
/// grid-rounded, and a width within one grid cell of the default snaps back to
/// the default size.
pub fn resize(widget: &WidgetTransform, start_size: Vec2, delta: Vec2, grid: f32) -> Vec2 {
    let growth = delta.x.max(delta.y) * 2.0;
    let mut size = start_size + start_size.normalize_or_zero() * growth;

    let min = widget.default_size * MIN_SCALE;
    let max = widget.default_size * MAX_SCALE;
    if size.x < min.x {
        size = min;
    } else if size.x > max.x {
        size = max;
    }
    let size = round_to_grid(size, grid);

    if (size.x - widget.default_size.x).abs() < grid {
        widget.default_size
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HD: Viewport = Viewport { width: 1920.0, height: 1080.0 };

    fn widget(anchor: Anchor, position: Vec2, size: Vec2) -> WidgetTransform {
        WidgetTransform {
            anchor,
            position,
            default_position: Vec2::new(-5000.0, -5000.0),
            size,
            default_size: size,
        }
    }

    #[test]
    fn test_snap_to_8_directions_cleans_small_axis() {
        let v = snap_to_8_directions(Vec2::new(1.0, 0.05), 0.08);
        assert_relative_eq!(v.x, 1.0);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_snap_to_8_directions_deadzone() {
        assert_eq!(snap_to_8_directions(Vec2::new(0.03, 0.02), 0.08), Vec2::ZERO);
        assert_eq!(snap_to_8_directions(Vec2::ZERO, 0.0), Vec2::ZERO);
    }

    #[test]
    fn test_snap_to_8_directions_diagonals() {
        let v = snap_to_8_directions(Vec2::new(-0.6, 0.5), 0.08);
        assert_relative_eq!(v.x, -std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
        assert_relative_eq!(v.y, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);

        let down = snap_to_8_directions(Vec2::new(0.1, -0.9), 0.08);
        assert_eq!(down.x, 0.0);
        assert_relative_eq!(down.y, -1.0);
    }

    #[test]
    fn test_soft_snap_drops_minor_axis() {
        assert_eq!(snap_softly_to_8_directions(Vec2::new(1.0, 0.2)), Vec2::new(1.0, 0.0));
        assert_eq!(snap_softly_to_8_directions(Vec2::new(-0.1, 0.7)), Vec2::new(0.0, 0.7));
    }

    #[test]
    fn test_soft_snap_keeps_diagonal_input() {
        assert_eq!(snap_softly_to_8_directions(Vec2::new(1.0, 0.5)), Vec2::new(1.0, 0.5));
        assert_eq!(snap_softly_to_8_directions(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_screen_rect_uses_anchor() {
        let rect = screen_rect(Anchor::BottomRight, Vec2::new(-100.0, 100.0), Vec2::splat(50.0), HD);
        assert_relative_eq!(rect.center().x, 1820.0);
        assert_relative_eq!(rect.center().y, 100.0);
        assert_relative_eq!(rect.left(), 1795.0);
        assert_relative_eq!(rect.top(), 125.0);

        let centered = screen_rect(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::splat(10.0), HD);
        assert!(centered.contains(Vec2::new(960.0, 540.0)));
    }

    #[test]
    fn test_snap_grid_scales_with_screen() {
        assert_eq!(snap_grid_for_screen(1920.0, 1080.0), 20.0);
        assert_eq!(snap_grid_for_screen(1080.0, 2400.0), 20.0);
        assert_eq!(snap_grid_for_screen(2560.0, 1440.0), 27.0);
        assert_eq!(snap_grid_for_screen(10.0, 10.0), 1.0);
    }

    #[test]
    fn test_drag_rounds_to_grid() {
        let w = widget(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::splat(100.0));
        let p = drag_position(&w, Vec2::ZERO, Vec2::new(47.0, -33.0), 20.0, HD);
        assert_eq!(p, Vec2::new(40.0, -40.0));
    }

    #[test]
    fn test_drag_is_pulled_onto_default() {
        let mut w = widget(Anchor::MiddleMiddle, Vec2::new(200.0, 0.0), Vec2::splat(100.0));
        w.default_position = Vec2::new(105.0, 3.0);
        let p = drag_position(&w, Vec2::new(200.0, 0.0), Vec2::new(-92.0, 4.0), 20.0, HD);
        assert_eq!(p, Vec2::new(105.0, 3.0));
    }

    #[test]
    fn test_drag_past_right_edge_rejects_only_x() {
        let w = widget(Anchor::MiddleMiddle, Vec2::new(800.0, 0.0), Vec2::splat(100.0));
        let p = drag_position(&w, Vec2::new(800.0, 0.0), Vec2::new(140.0, 60.0), 20.0, HD);
        assert_eq!(p, Vec2::new(800.0, 60.0));
    }

    #[test]
    fn test_drag_past_bottom_edge_rejects_only_y() {
        let w = widget(Anchor::BottomLeft, Vec2::new(100.0, 100.0), Vec2::splat(100.0));
        let p = drag_position(&w, Vec2::new(100.0, 100.0), Vec2::new(40.0, -80.0), 20.0, HD);
        assert_eq!(p, Vec2::new(140.0, 100.0));
    }

    #[test]
    fn test_resize_grows_proportionally() {
        let w = widget(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::new(100.0, 100.0));
        let s = resize(&w, Vec2::new(100.0, 100.0), Vec2::new(50.0, 10.0), 10.0);
        let expected = 100.0 + std::f32::consts::FRAC_1_SQRT_2 * 100.0;
        assert_relative_eq!(s.x, (expected / 10.0).round() * 10.0);
        assert_eq!(s.x, s.y);
    }

    #[test]
    fn test_resize_clamps_to_default_multiples() {
        let w = widget(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::splat(100.0));
        assert_eq!(resize(&w, Vec2::splat(100.0), Vec2::splat(-500.0), 10.0), Vec2::splat(50.0));
        assert_eq!(resize(&w, Vec2::splat(100.0), Vec2::splat(5000.0), 10.0), Vec2::splat(500.0));
    }

    #[test]
    fn test_resize_limits_stay_on_grid() {
        let w = widget(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::splat(100.0));
        assert_eq!(resize(&w, Vec2::splat(100.0), Vec2::splat(-500.0), 30.0), Vec2::splat(60.0));
        assert_eq!(resize(&w, Vec2::splat(100.0), Vec2::splat(5000.0), 30.0), Vec2::splat(510.0));
    }

    #[test]
    fn test_resize_default_pull_compares_width() {
        let w = widget(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::new(100.0, 300.0));
        let s = resize(&w, Vec2::new(100.0, 300.0), Vec2::new(15.0, 0.0), 20.0);
        assert_eq!(s, Vec2::new(100.0, 300.0));
    }

    #[test]
    fn test_resize_is_pulled_onto_default() {
        let w = widget(Anchor::MiddleMiddle, Vec2::ZERO, Vec2::splat(100.0));
        assert_eq!(resize(&w, Vec2::splat(100.0), Vec2::new(3.0, 2.0), 20.0), Vec2::splat(100.0));
    }
}
