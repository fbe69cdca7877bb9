//! Shape generation for multi-point elements.

use kurbo::{BezPath, CubicBez, Point};

/// Produces the drawable curve of a multi-point element.
///
/// Renderers can plug their own generator (e.g. a hand-drawn stroke library);
/// the core only relies on there being exactly one cubic segment per pair of
/// consecutive points, expressed in the element's local coordinates.
pub trait ShapeGenerator: std::fmt::Debug + Send + Sync {
    /// One cubic per consecutive pair of `points`.
    fn curve_segments(&self, points: &[Point], rounded: bool) -> Vec<CubicBez>;

    /// Path representation of the element outline.
    fn to_path(&self, points: &[Point], rounded: bool) -> BezPath {
        let mut path = BezPath::new();
        let segments = self.curve_segments(points, rounded);
        let Some(first) = segments.first() else {
            if let Some(&p) = points.first() {
                path.move_to(p);
            }
            return path;
        };
        path.move_to(first.p0);
        for seg in &segments {
            path.curve_to(seg.p1, seg.p2, seg.p3);
        }
        path
    }
}

/// Catmull–Rom spline through the points (curve tightness 0), or straight
/// cubics for sharp paths.
#[derive(Debug, Clone, Copy)]
pub struct DefaultShapeGenerator {
    /// 0 gives a classic Catmull–Rom curve, 1 collapses into straight lines.
    pub tightness: f64,
}

impl Default for DefaultShapeGenerator {
    fn default() -> Self {
        Self { tightness: 0.0 }
    }
}

impl ShapeGenerator for DefaultShapeGenerator {
    fn curve_segments(&self, points: &[Point], rounded: bool) -> Vec<CubicBez> {
        if points.len() < 2 {
            return Vec::new();
        }
        if !rounded || points.len() < 3 {
            return points
                .windows(2)
                .map(|w| {
                    let (a, b) = (w[0], w[1]);
                    CubicBez::new(a, a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b)
                })
                .collect();
        }

        let s = 1.0 - self.tightness;
        let last = points.len() - 1;
        (0..last)
            .map(|i| {
                let p0 = points[i.saturating_sub(1)];
                let p1 = points[i];
                let p2 = points[i + 1];
                let p3 = points[(i + 2).min(last)];
                let c1 = p1 + (p2 - p0) * (s / 6.0);
                let c2 = p2 - (p3 - p1) * (s / 6.0);
                CubicBez::new(p1, c1, c2, p2)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::ParamCurve;

    #[test]
    fn test_one_segment_per_pair() {
        let generator = DefaultShapeGenerator::default();
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 10.0), Point::new(20.0, 0.0)];
        assert_eq!(generator.curve_segments(&pts, true).len(), 2);
        assert_eq!(generator.curve_segments(&pts, false).len(), 2);
        assert!(generator.curve_segments(&pts[..1], true).is_empty());
    }

    #[test]
    fn test_curve_passes_through_points() {
        let generator = DefaultShapeGenerator::default();
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(40.0, 30.0),
            Point::new(80.0, -10.0),
            Point::new(120.0, 0.0),
        ];
        let segments = generator.curve_segments(&pts, true);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.eval(0.0), pts[i]);
            assert_eq!(seg.eval(1.0), pts[i + 1]);
        }
    }

    #[test]
    fn test_straight_segment_midpoint() {
        let generator = DefaultShapeGenerator::default();
        let pts = [Point::new(0.0, 0.0), Point::new(30.0, 0.0)];
        let seg = generator.curve_segments(&pts, false)[0];
        let mid = seg.eval(0.5);
        assert!((mid.x - 15.0).abs() < 1e-9);
        assert!(mid.y.abs() < 1e-9);
    }

    #[test]
    fn test_to_path_starts_at_first_point() {
        let generator = DefaultShapeGenerator::default();
        let pts = [Point::new(5.0, 5.0), Point::new(10.0, 0.0)];
        let path = generator.to_path(&pts, false);
        assert_eq!(path.elements().len(), 2);
    }
}
