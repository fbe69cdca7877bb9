//! Size math: degenerate elements, shift-locked sizes, creation drags.

use super::{Element, ElementType};
use crate::Random;
use kurbo::{Point, Vec2};
use std::f64::consts::{FRAC_PI_2, PI};

/// Angle step that lines snap to while shift is held.
pub const SHIFT_LOCKING_ANGLE: f64 = PI / 12.0;

/// Boxes with both sides under this size are treated as creation artifacts.
pub const INVISIBLY_SMALL_ELEMENT_SIZE: f64 = 0.1;

/// Whether the element is too small to be worth keeping on the canvas.
pub fn is_invisibly_small_element(element: &Element) -> bool {
    if let Some(points) = element.points() {
        if element.is_linear() {
            return points.len() < 2;
        }
    }
    element.width.abs() < INVISIBLY_SMALL_ELEMENT_SIZE
        && element.height.abs() < INVISIBLY_SMALL_ELEMENT_SIZE
}

/// Position and size with negative extents folded into the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewElementGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NewElementGeometry {
    /// Write the geometry into an element and bump its version.
    pub fn apply(self, element: &mut Element, rng: &mut Random) {
        element.mutate(rng, |el| {
            el.x = self.x;
            el.y = self.y;
            el.width = self.width;
            el.height = self.height;
        });
    }
}

/// Flip negative width/height so that the box is described by its top-left
/// corner.
pub fn get_normalized_dimensions(element: &Element) -> NewElementGeometry {
    let mut out = NewElementGeometry {
        x: element.x,
        y: element.y,
        width: element.width,
        height: element.height,
    };
    if element.width < 0.0 {
        out.width = element.width.abs();
        out.x = element.x - out.width;
    }
    if element.height < 0.0 {
        out.height = element.height.abs();
        out.y = element.y - out.height;
    }
    out
}

fn locked_angle(width: f64, height: f64) -> f64 {
    ((height / width).atan() / SHIFT_LOCKING_ANGLE).round() * SHIFT_LOCKING_ANGLE
}

fn is_right_angle(angle: f64) -> bool {
    (angle.abs() - FRAC_PI_2).abs() < 1e-9
}

/// Size under the shift modifier: squares for boxes, 15 degree steps for
/// lines, arrows and freehand strokes.
pub fn get_perfect_element_size(element_type: ElementType, width: f64, height: f64) -> (f64, f64) {
    let (mut width, mut height) = (width, height);
    let abs_width = width.abs();
    let abs_height = height.abs();

    match element_type {
        ElementType::Line | ElementType::Arrow | ElementType::Freedraw => {
            let angle = locked_angle(abs_width, abs_height);
            if angle == 0.0 {
                height = 0.0;
            } else if is_right_angle(angle) {
                width = 0.0;
            } else {
                let locked = abs_width * angle.tan() * height.signum();
                if locked != 0.0 && locked.is_finite() {
                    height = locked;
                }
            }
        }
        ElementType::Selection => {}
        _ => height = abs_width * height.signum(),
    }
    (width, height)
}

/// Offset from `origin` to the point of the shift-locked ray closest to the
/// cursor.
pub fn get_locked_linear_cursor_align_size(origin: Point, cursor: Point) -> Vec2 {
    let mut width = cursor.x - origin.x;
    let mut height = cursor.y - origin.y;
    if width == 0.0 && height == 0.0 {
        return Vec2::ZERO;
    }

    let angle = locked_angle(width, height);
    if angle == 0.0 {
        height = 0.0;
    } else if is_right_angle(angle) {
        width = 0.0;
    } else {
        // locked ray: a1*x - y + c1 = 0, and its perpendicular through the cursor
        let a1 = angle.tan();
        let b1 = -1.0;
        let c1 = origin.y - a1 * origin.x;
        let a2 = -1.0 / a1;
        let b2 = -1.0;
        let c2 = cursor.y - a2 * cursor.x;
        let det = a1 * b2 - a2 * b1;
        let ix = (b1 * c2 - b2 * c1) / det;
        let iy = (c1 * a2 - c2 * a1) / det;
        width = ix - origin.x;
        height = iy - origin.y;
    }
    Vec2::new(width, height)
}

/// Input of a creation drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewElementDrag {
    pub element_type: ElementType,
    /// Where the drag started.
    pub origin: Point,
    /// Current pointer position.
    pub pointer: Point,
    /// Absolute horizontal extent of the drag.
    pub width: f64,
    /// Absolute vertical extent of the drag.
    pub height: f64,
    pub maintain_aspect_ratio: bool,
    pub resize_from_center: bool,
    /// Fixed width/height ratio to keep when the aspect ratio is locked.
    pub width_aspect_ratio: Option<f64>,
    pub origin_offset: Option<Vec2>,
}

/// Geometry of an element being created by a drag, or `None` while either
/// side is still zero.
pub fn drag_new_element(drag: &NewElementDrag) -> Option<NewElementGeometry> {
    let NewElementDrag { element_type, origin, pointer, .. } = *drag;
    let (mut width, mut height) = (drag.width, drag.height);

    if drag.maintain_aspect_ratio && element_type != ElementType::Selection {
        match drag.width_aspect_ratio.filter(|r| *r != 0.0) {
            Some(ratio) => height = width / ratio,
            None => {
                // only one axis drives the size so the cursor sticks to a side
                (width, height) = if (pointer.y - origin.y).abs() > (pointer.x - origin.x).abs() {
                    let signed = if pointer.x < origin.x { -width } else { width };
                    get_perfect_element_size(element_type, height, signed)
                } else {
                    let signed = if pointer.y < origin.y { -height } else { height };
                    get_perfect_element_size(element_type, width, signed)
                };
                height = height.abs();
            }
        }
    }

    let mut x = if pointer.x < origin.x { origin.x - width } else { origin.x };
    let mut y = if pointer.y < origin.y { origin.y - height } else { origin.y };

    if drag.resize_from_center {
        width += width;
        height += height;
        x = origin.x - width / 2.0;
        y = origin.y - height / 2.0;
    }

    if width == 0.0 || height == 0.0 {
        return None;
    }
    let offset = drag.origin_offset.unwrap_or(Vec2::ZERO);
    Some(NewElementGeometry { x: x + offset.x, y: y + offset.y, width, height })
}
