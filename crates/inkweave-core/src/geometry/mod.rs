//! Pure geometry helpers shared by every other module.
//!
//! Nothing in here holds state; all functions can be called from any thread.

mod bezier;
mod shape;

pub use bezier::{
    BEZIER_ACCURACY, bezier_curve_length, bezier_xy, control_points_for_segment,
    map_interval_to_bezier_t,
};
pub use shape::{DefaultShapeGenerator, ShapeGenerator};

use kurbo::{Point, Rect};

/// Distance (in scene units, scaled by zoom) under which the two ends of a
/// path are considered joined.
pub const LINE_CONFIRM_THRESHOLD: f64 = 8.0;

/// Rotate `(x, y)` around `(cx, cy)` by `angle` radians.
pub fn rotate(x: f64, y: f64, cx: f64, cy: f64, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (
        (x - cx) * cos - (y - cy) * sin + cx,
        (x - cx) * sin + (y - cy) * cos + cy,
    )
}

/// Rotate a point around a pivot.
pub fn rotate_point(point: Point, center: Point, angle: f64) -> Point {
    let (x, y) = rotate(point.x, point.y, center.x, center.y, angle);
    Point::new(x, y)
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).hypot()
}

/// Midpoint of the straight segment `a`-`b`.
pub fn center_point(a: Point, b: Point) -> Point {
    a.midpoint(b)
}

/// Exact point equality, matching how handles are compared by identity.
pub fn are_points_equal(a: Point, b: Point) -> bool {
    a.x == b.x && a.y == b.y
}

/// Whether `point` lies inside the box spanned by `a` and `b` (inclusive).
pub fn is_point_within_bounds(a: Point, point: Point, b: Point) -> bool {
    point.x >= a.x.min(b.x)
        && point.x <= a.x.max(b.x)
        && point.y >= a.y.min(b.y)
        && point.y <= a.y.max(b.y)
}

/// Snap a scene coordinate to the nearest grid line when a grid is active.
pub fn get_grid_point(x: f64, y: f64, grid_size: Option<f64>) -> Point {
    match grid_size {
        Some(size) if size > 0.0 => Point::new(
            (x / size).round() * size,
            (y / size).round() * size,
        ),
        _ => Point::new(x, y),
    }
}

/// A path of three or more points whose ends meet (on screen) is a loop.
pub fn is_path_a_loop(points: &[Point], zoom: f64) -> bool {
    if points.len() < 3 {
        return false;
    }
    let first = points[0];
    let last = points[points.len() - 1];
    distance(first, last) <= LINE_CONFIRM_THRESHOLD / zoom
}

/// Axis-aligned box around a set of points; `None` for an empty set.
pub fn points_bounds(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let mut rect = Rect::from_points(first, first);
    for p in iter {
        rect = rect.union_pt(p);
    }
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let (x, y) = rotate(10.0, 0.0, 0.0, 0.0, FRAC_PI_2);
        assert!(close(x, 0.0));
        assert!(close(y, 10.0));
    }

    #[test]
    fn test_rotate_about_pivot() {
        let p = rotate_point(Point::new(2.0, 1.0), Point::new(1.0, 1.0), PI);
        assert!(close(p.x, 0.0));
        assert!(close(p.y, 1.0));
    }

    #[test]
    fn test_grid_point() {
        assert_eq!(get_grid_point(14.0, 26.0, Some(20.0)), Point::new(20.0, 20.0));
        assert_eq!(get_grid_point(14.0, 26.0, None), Point::new(14.0, 26.0));
    }

    #[test]
    fn test_path_loop() {
        let open = [Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(50.0, 50.0)];
        assert!(!is_path_a_loop(&open, 1.0));

        let closed = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(3.0, 4.0),
        ];
        assert!(is_path_a_loop(&closed, 1.0));
        // zoomed in, the same gap covers more screen pixels
        assert!(!is_path_a_loop(&closed, 2.0));

        let two = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert!(!is_path_a_loop(&two, 1.0));
    }

    #[test]
    fn test_points_bounds() {
        assert!(points_bounds(std::iter::empty()).is_none());
        let rect = points_bounds([Point::new(3.0, -1.0), Point::new(-2.0, 5.0)]).unwrap();
        assert_eq!(rect, Rect::new(-2.0, -1.0, 3.0, 5.0));
    }

    #[test]
    fn test_point_within_bounds() {
        let a = Point::new(10.0, 10.0);
        let b = Point::new(0.0, 0.0);
        assert!(is_point_within_bounds(a, Point::new(5.0, 5.0), b));
        assert!(!is_point_within_bounds(a, Point::new(11.0, 5.0), b));
    }
}
