//! Local/global coordinate helpers for lines and arrows.
//!
//! Points are stored relative to the element's `(x, y)`, with `points[0]`
//! pinned at the origin. Rotation is applied around the center of the
//! element's (unrotated) bounds.

use super::{Element, absolute_coords_with};
use crate::geometry::{
    ShapeGenerator, bezier_curve_length, bezier_xy, center_point, control_points_for_segment,
    distance, map_interval_to_bezier_t, points_bounds, rotate,
};
use kurbo::{ParamCurveExtrema, Point, Rect, Vec2};

/// Size of an editor point handle, in screen pixels.
pub const POINT_HANDLE_SIZE: f64 = 10.0;

/// Points shifted so that the first one sits at the origin, plus the `(x, y)`
/// that keeps them in place on the canvas.
pub fn normalized_points(element: &Element) -> Option<(Vec<Point>, f64, f64)> {
    let points = element.points()?;
    let offset = points.first().copied().unwrap_or(Point::ZERO).to_vec2();
    Some((
        points.iter().map(|&p| p - offset).collect(),
        element.x + offset.x,
        element.y + offset.y,
    ))
}

/// Enforce the first-point-at-origin invariant without bumping the version.
pub fn normalize_in_place(element: &mut Element) {
    if let Some((points, x, y)) = normalized_points(element) {
        element.x = x;
        element.y = y;
        if let Some(target) = element.points_mut() {
            *target = points;
        }
    }
}

/// Recompute `width`/`height` from the local points.
pub fn refresh_dimensions(element: &mut Element) {
    let Some(points) = element.points() else {
        return;
    };
    if let Some(rect) = points_bounds(points.iter().copied()) {
        element.width = rect.width();
        element.height = rect.height();
    }
}

fn is_rounded(element: &Element) -> bool {
    element.roundness.is_some()
}

/// Scene-space box (unrotated) of `points` placed at the element's origin.
///
/// Rounded paths use the bounds of the fitted curve, which can bulge past
/// the points themselves.
pub fn points_coords(
    element: &Element,
    points: &[Point],
    generator: &dyn ShapeGenerator,
) -> Rect {
    let origin = Vec2::new(element.x, element.y);
    let local = if points.len() >= 2 && is_rounded(element) {
        generator
            .curve_segments(points, true)
            .iter()
            .map(|seg| seg.bounding_box())
            .reduce(|a, b| a.union(b))
    } else {
        points_bounds(points.iter().copied())
    };
    local.map_or_else(|| Rect::from_origin_size(origin.to_point(), (0.0, 0.0)), |r| r + origin)
}

fn rotation_center(element: &Element, generator: &dyn ShapeGenerator) -> Point {
    absolute_coords_with(element, generator).center()
}

/// Scene coordinates of a local point.
pub fn point_global_coordinates(
    element: &Element,
    point: Point,
    generator: &dyn ShapeGenerator,
) -> Point {
    let c = rotation_center(element, generator);
    let (x, y) = rotate(element.x + point.x, element.y + point.y, c.x, c.y, element.angle);
    Point::new(x, y)
}

/// Scene coordinates of every local point.
pub fn points_global_coordinates(element: &Element, generator: &dyn ShapeGenerator) -> Vec<Point> {
    let Some(points) = element.points() else {
        return Vec::new();
    };
    let c = rotation_center(element, generator);
    points
        .iter()
        .map(|p| {
            let (x, y) = rotate(element.x + p.x, element.y + p.y, c.x, c.y, element.angle);
            Point::new(x, y)
        })
        .collect()
}

/// Scene coordinates of the point at `index`; negative indices count from
/// the end. A missing point resolves to the element origin.
pub fn point_at_index_global_coordinates(
    element: &Element,
    index: isize,
    generator: &dyn ShapeGenerator,
) -> Point {
    let points = element.points().unwrap_or_default();
    let resolved = if index < 0 { points.len() as isize + index } else { index };
    let local = usize::try_from(resolved)
        .ok()
        .and_then(|i| points.get(i).copied())
        .unwrap_or(Point::ZERO);
    point_global_coordinates(element, local, generator)
}

/// Inverse of [`point_global_coordinates`].
pub fn point_from_absolute_coords(
    element: &Element,
    absolute: Point,
    generator: &dyn ShapeGenerator,
) -> Point {
    let c = rotation_center(element, generator);
    let (x, y) = rotate(absolute.x, absolute.y, c.x, c.y, -element.angle);
    Point::new(x - element.x, y - element.y)
}

/// Visual midpoint of the segment ending at `end_index`, given the scene
/// coordinates of its ends. Curved paths sample the fitted curve at half its
/// arc length.
pub fn segment_mid_point(
    element: &Element,
    start: Point,
    end: Point,
    end_index: usize,
    generator: &dyn ShapeGenerator,
) -> Point {
    let points = element.points().unwrap_or_default();
    if points.len() > 2 && is_rounded(element) {
        if let Some(curve) = control_points_for_segment(generator, points, true, end_index) {
            let t = map_interval_to_bezier_t(&curve, 0.5);
            return point_global_coordinates(element, bezier_xy(&curve, t), generator);
        }
    }
    center_point(start, end)
}

/// Whether the segment ending at `end_index` is too short on screen to host
/// a midpoint handle. `start`/`end` are local points.
pub fn is_segment_too_short(
    element: &Element,
    start: Point,
    end: Point,
    end_index: usize,
    zoom: f64,
    generator: &dyn ShapeGenerator,
) -> bool {
    let points = element.points().unwrap_or_default();
    let mut length = distance(start, end);
    if points.len() > 2 && is_rounded(element) {
        if let Some(curve) = control_points_for_segment(generator, points, true, end_index) {
            length = bezier_curve_length(&curve);
        }
    }
    length * zoom < POINT_HANDLE_SIZE * 4.0
}

/// Where a bound text label sits on a line: centered on the middle point for
/// odd point counts, on the middle segment's midpoint otherwise.
pub fn bound_text_position(
    element: &Element,
    label_width: f64,
    label_height: f64,
    generator: &dyn ShapeGenerator,
) -> Point {
    let local = element.points().unwrap_or_default();
    let global = points_global_coordinates(element, generator);
    if global.len() < 2 {
        return Point::new(element.x - label_width / 2.0, element.y - label_height / 2.0);
    }
    let anchor = if local.len() % 2 == 1 {
        point_global_coordinates(element, local[local.len() / 2], generator)
    } else if local.len() == 2 {
        center_point(global[0], global[1])
    } else {
        let index = local.len() / 2 - 1;
        segment_mid_point(element, global[index], global[index + 1], index + 1, generator)
    };
    Point::new(anchor.x - label_width / 2.0, anchor.y - label_height / 2.0)
}
