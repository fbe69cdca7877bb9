//! Bounding boxes of elements, with and without rotation.

use super::linear::{bound_text_position, points_coords};
use super::{Element, ElementKind, ElementLookup, get_bound_text_element};
use crate::geometry::{DefaultShapeGenerator, ShapeGenerator, points_bounds, rotate_point};
use kurbo::{Affine, ParamCurveExtrema, Point, Rect};

/// Min/max corners of a set of elements plus the derived size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self {
            min_x: rect.x0,
            min_y: rect.y0,
            max_x: rect.x1,
            max_y: rect.y1,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

/// Scene-space box of the element before its rotation is applied.
pub fn absolute_coords(element: &Element) -> Rect {
    absolute_coords_with(element, &DefaultShapeGenerator::default())
}

/// [`absolute_coords`] with an explicit curve generator.
pub fn absolute_coords_with(element: &Element, generator: &dyn ShapeGenerator) -> Rect {
    match &element.kind {
        ElementKind::Arrow(data) | ElementKind::Line(data) => {
            points_coords(element, &data.points, generator)
        }
        ElementKind::Freedraw(data) => {
            let origin = Point::new(element.x, element.y);
            points_bounds(data.points.iter().copied())
                .map_or_else(|| Rect::from_points(origin, origin), |r| r + origin.to_vec2())
        }
        _ => Rect::new(
            element.x,
            element.y,
            element.x + element.width,
            element.y + element.height,
        ),
    }
}

/// Like [`absolute_coords_with`], but a line's box grows to cover its label.
/// Returns the box and the rotation center of the line itself.
pub fn absolute_coords_with_bound_text<L: ElementLookup + ?Sized>(
    element: &Element,
    elements: &L,
    generator: &dyn ShapeGenerator,
) -> (Rect, Point) {
    let bounds = absolute_coords_with(element, generator);
    if element.is_linear() {
        if let Some(label) = get_bound_text_element(element, elements) {
            return min_max_xy_with_bound_text(element, bounds, label, generator);
        }
    }
    (bounds, bounds.center())
}

/// Expand a line's unrotated box so that it covers its bound label.
///
/// The label is positioned in scene space (it never rotates with the line),
/// so it is counter-rotated into the line's frame first. Which label corners
/// extend which side depends on where the line's top edge ends up after
/// rotation; the four cases below cover the four quadrants of that edge.
pub fn min_max_xy_with_bound_text(
    element: &Element,
    bounds: Rect,
    label: &Element,
    generator: &dyn ShapeGenerator,
) -> (Rect, Point) {
    let Rect { mut x0, mut y0, mut x1, mut y1 } = bounds;
    let center = bounds.center();
    let angle = element.angle;

    let label_origin = bound_text_position(element, label.width, label.height, generator);
    let (lx1, ly1) = (label_origin.x, label_origin.y);
    let (lx2, ly2) = (lx1 + label.width, ly1 + label.height);

    let top_left = rotate_point(Point::new(x0, y0), center, angle);
    let top_right = rotate_point(Point::new(x1, y0), center, angle);

    let label_top_left = rotate_point(Point::new(lx1, ly1), center, -angle);
    let label_top_right = rotate_point(Point::new(lx2, ly1), center, -angle);
    let label_bottom_left = rotate_point(Point::new(lx1, ly2), center, -angle);
    let label_bottom_right = rotate_point(Point::new(lx2, ly2), center, -angle);

    if top_left.x < top_right.x && top_left.y >= top_right.y {
        x0 = x0.min(label_bottom_left.x);
        x1 = x1.max(label_top_right.x.max(label_bottom_right.x));
        y0 = y0.min(label_top_left.y);
        y1 = y1.max(label_bottom_right.y);
    } else if top_left.x >= top_right.x && top_left.y > top_right.y {
        x0 = x0.min(label_bottom_right.x);
        x1 = x1.max(label_top_left.x.max(label_top_right.x));
        y0 = y0.min(label_bottom_left.y);
        y1 = y1.max(label_top_right.y);
    } else if top_left.x >= top_right.x {
        x0 = x0.min(label_top_right.x);
        x1 = x1.max(label_bottom_left.x);
        y0 = y0.min(label_bottom_right.y);
        y1 = y1.max(label_top_left.y);
    } else if top_left.y <= top_right.y {
        x0 = x0.min(label_top_right.x.min(label_top_left.x));
        x1 = x1.max(label_bottom_right.x);
        y0 = y0.min(label_top_right.y);
        y1 = y1.max(label_bottom_left.y);
    }

    (Rect::new(x0, y0, x1, y1), center)
}

/// Axis-aligned box of the element after rotation.
pub fn element_bounds(element: &Element) -> Rect {
    element_bounds_with(element, &DefaultShapeGenerator::default())
}

/// [`element_bounds`] with an explicit curve generator.
pub fn element_bounds_with(element: &Element, generator: &dyn ShapeGenerator) -> Rect {
    let unrotated = absolute_coords_with(element, generator);
    let center = unrotated.center();
    let angle = element.angle;

    match &element.kind {
        ElementKind::Arrow(data) | ElementKind::Line(data) => {
            let origin = Affine::translate((element.x, element.y));
            let transform = Affine::rotate_about(angle, center) * origin;
            if data.points.len() >= 2 && element.roundness.is_some() {
                let boxes = generator
                    .curve_segments(&data.points, true)
                    .into_iter()
                    .map(|seg| (transform * seg).bounding_box());
                if let Some(rect) = boxes.reduce(|a, b| a.union(b)) {
                    return rect;
                }
            }
            points_bounds(data.points.iter().map(|&p| transform * p)).unwrap_or(unrotated)
        }
        ElementKind::Freedraw(data) => {
            let transform = Affine::rotate_about(angle, center)
                * Affine::translate((element.x, element.y));
            points_bounds(data.points.iter().map(|&p| transform * p)).unwrap_or(unrotated)
        }
        ElementKind::Ellipse => {
            let (a, b) = (element.width / 2.0, element.height / 2.0);
            let (sin, cos) = angle.sin_cos();
            let hw = ((a * cos).powi(2) + (b * sin).powi(2)).sqrt();
            let hh = ((a * sin).powi(2) + (b * cos).powi(2)).sqrt();
            Rect::new(center.x - hw, center.y - hh, center.x + hw, center.y + hh)
        }
        ElementKind::Diamond => {
            let Rect { x0, y0, x1, y1 } = unrotated;
            let corners = [
                Point::new(center.x, y0),
                Point::new(x1, center.y),
                Point::new(center.x, y1),
                Point::new(x0, center.y),
            ];
            points_bounds(corners.into_iter().map(|p| rotate_point(p, center, angle)))
                .unwrap_or(unrotated)
        }
        _ => {
            let Rect { x0, y0, x1, y1 } = unrotated;
            let corners = [
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ];
            points_bounds(corners.into_iter().map(|p| rotate_point(p, center, angle)))
                .unwrap_or(unrotated)
        }
    }
}

/// Union of the rotated bounds of all elements.
pub fn common_bounds<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Option<Rect> {
    elements
        .into_iter()
        .map(element_bounds)
        .reduce(|a, b| a.union(b))
}

/// [`common_bounds`] as min/max/size.
pub fn common_bounding_box<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
) -> Option<BoundingBox> {
    common_bounds(elements).map(BoundingBox::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Random;
    use crate::element::{BoundElement, ElementType};
    use std::collections::HashMap;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_box_shape_absolute_coords() {
        let mut rng = Random::new(1);
        let el = Element::new(ElementType::Rectangle, 10.0, 20.0, 30.0, 40.0, &mut rng);
        assert_eq!(absolute_coords(&el), Rect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_rotated_rectangle_bounds() {
        let mut rng = Random::new(1);
        let mut el = Element::new(ElementType::Rectangle, 0.0, 0.0, 100.0, 50.0, &mut rng);
        el.angle = FRAC_PI_2;
        let b = element_bounds(&el);
        assert!(close(b.width(), 50.0));
        assert!(close(b.height(), 100.0));
        assert!(close(b.center().x, 50.0));
        assert!(close(b.center().y, 25.0));
    }

    #[test]
    fn test_rotated_diamond_is_tighter_than_box() {
        let mut rng = Random::new(1);
        let mut diamond = Element::new(ElementType::Diamond, 0.0, 0.0, 100.0, 100.0, &mut rng);
        diamond.angle = FRAC_PI_4;
        let mut rect = diamond.clone();
        rect.kind = ElementKind::Rectangle;
        assert!(element_bounds(&diamond).width() < element_bounds(&rect).width());
    }

    #[test]
    fn test_line_coords_follow_points() {
        let mut rng = Random::new(1);
        let el = Element::new_linear(
            ElementType::Line,
            5.0,
            5.0,
            vec![Point::ZERO, Point::new(-10.0, 20.0), Point::new(30.0, 10.0)],
            &mut rng,
        );
        assert_eq!(absolute_coords(&el), Rect::new(-5.0, 5.0, 35.0, 25.0));
    }

    #[test]
    fn test_common_bounding_box() {
        let mut rng = Random::new(1);
        let a = Element::new(ElementType::Rectangle, 0.0, 0.0, 10.0, 10.0, &mut rng);
        let b = Element::new(ElementType::Rectangle, 20.0, 5.0, 10.0, 10.0, &mut rng);
        let bb = common_bounding_box([&a, &b]).unwrap();
        assert_eq!((bb.min_x, bb.min_y, bb.max_x, bb.max_y), (0.0, 0.0, 30.0, 15.0));
        assert_eq!((bb.width, bb.height), (30.0, 15.0));
        assert!(common_bounding_box(std::iter::empty()).is_none());
    }

    #[test]
    fn test_label_extends_line_box() {
        let mut rng = Random::new(2);
        let mut arrow = Element::new_linear(
            ElementType::Arrow,
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(100.0, 0.0)],
            &mut rng,
        );
        let mut label = Element::new_text(0.0, 0.0, "label", Some(arrow.id.clone()), &mut rng);
        label.width = 60.0;
        label.height = 20.0;
        arrow.bound_elements.push(BoundElement::text(label.id.clone()));

        let map: HashMap<_, _> = [(arrow.id.clone(), arrow.clone()), (label.id.clone(), label)]
            .into_iter()
            .collect();
        let generator = DefaultShapeGenerator::default();
        let (rect, center) = absolute_coords_with_bound_text(&arrow, &map, &generator);
        // label is centered on (50, 0)
        assert_eq!(rect, Rect::new(0.0, -10.0, 100.0, 10.0));
        assert_eq!(center, Point::new(50.0, 0.0));
    }

    #[test]
    fn test_label_box_independent_of_rotation_direction() {
        let mut rng = Random::new(2);
        let mut arrow = Element::new_linear(
            ElementType::Arrow,
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(100.0, 0.0)],
            &mut rng,
        );
        let mut label = Element::new_text(0.0, 0.0, "x", Some(arrow.id.clone()), &mut rng);
        label.width = 20.0;
        label.height = 20.0;
        let generator = DefaultShapeGenerator::default();
        let bounds = absolute_coords_with(&arrow, &generator);

        arrow.angle = FRAC_PI_2;
        let (cw, _) = min_max_xy_with_bound_text(&arrow, bounds, &label, &generator);
        arrow.angle = -FRAC_PI_2;
        let (ccw, _) = min_max_xy_with_bound_text(&arrow, bounds, &label, &generator);
        assert!(close(cw.width(), ccw.width()));
        assert!(close(cw.height(), ccw.height()));
    }
}
