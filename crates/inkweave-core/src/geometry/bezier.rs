//! Bezier helpers used for midpoint handles on curved paths.

use super::ShapeGenerator;
use kurbo::{CubicBez, ParamCurve, ParamCurveArclen, Point};

/// Accuracy used for arc-length computations.
pub const BEZIER_ACCURACY: f64 = 1e-3;

/// The cubic of the segment that ends at `end_index` (so `end_index >= 1`).
pub fn control_points_for_segment(
    generator: &dyn ShapeGenerator,
    points: &[Point],
    rounded: bool,
    end_index: usize,
) -> Option<CubicBez> {
    if end_index == 0 || end_index >= points.len() {
        return None;
    }
    generator
        .curve_segments(points, rounded)
        .get(end_index - 1)
        .copied()
}

/// Map a fraction of the curve's arc length to its curve parameter `t`.
pub fn map_interval_to_bezier_t(curve: &CubicBez, interval: f64) -> f64 {
    let total = curve.arclen(BEZIER_ACCURACY);
    if total <= f64::EPSILON {
        return interval;
    }
    curve.inv_arclen(total * interval.clamp(0.0, 1.0), BEZIER_ACCURACY)
}

/// Point on the curve at parameter `t`.
pub fn bezier_xy(curve: &CubicBez, t: f64) -> Point {
    curve.eval(t)
}

/// Arc length of the curve.
pub fn bezier_curve_length(curve: &CubicBez) -> f64 {
    curve.arclen(BEZIER_ACCURACY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DefaultShapeGenerator;

    #[test]
    fn test_segment_lookup_bounds() {
        let generator = DefaultShapeGenerator::default();
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!(control_points_for_segment(&generator, &pts, false, 0).is_none());
        assert!(control_points_for_segment(&generator, &pts, false, 2).is_none());
        assert!(control_points_for_segment(&generator, &pts, false, 1).is_some());
    }

    #[test]
    fn test_half_arclen_on_straight_curve() {
        let curve = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        );
        let t = map_interval_to_bezier_t(&curve, 0.5);
        assert!((t - 0.5).abs() < 1e-3);
        assert!((bezier_curve_length(&curve) - 30.0).abs() < 1e-3);
        let mid = bezier_xy(&curve, t);
        assert!((mid.x - 15.0).abs() < 0.05);
    }

    #[test]
    fn test_half_arclen_splits_curve_evenly() {
        let curve = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 40.0),
            Point::new(60.0, 40.0),
            Point::new(60.0, 0.0),
        );
        let t = map_interval_to_bezier_t(&curve, 0.5);
        let first = curve.subsegment(0.0..t).arclen(BEZIER_ACCURACY);
        let total = bezier_curve_length(&curve);
        assert!((first - total / 2.0).abs() < 0.05);
    }
}
