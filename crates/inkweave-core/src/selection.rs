//! Selected elements and hit testing.

use crate::element::{Element, absolute_coords};
use crate::frame::get_frame_children;
use crate::geometry::rotate_point;
use crate::state::SelectionState;
use kurbo::Point;
use std::collections::HashSet;

/// What to pull in besides the selected elements themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectedElementsOptions {
    /// Labels of selected containers.
    pub include_bound_text: bool,
    /// Children of selected frames, placed right before their frame.
    pub include_elements_in_frames: bool,
}

/// Selected elements in z-order.
pub fn get_selected_elements<'a>(
    elements: &[&'a Element],
    state: &SelectionState,
    opts: SelectedElementsOptions,
) -> Vec<&'a Element> {
    let selected: Vec<&Element> = elements
        .iter()
        .copied()
        .filter(|el| {
            state.is_selected(&el.id)
                || (opts.include_bound_text && el.container_id().is_some_and(|c| state.is_selected(c)))
        })
        .collect();

    if !opts.include_elements_in_frames {
        return selected;
    }
    let mut out = Vec::with_capacity(selected.len());
    for el in selected {
        if el.is_frame_like() {
            out.extend(get_frame_children(elements.iter().copied(), &el.id));
        }
        out.push(el);
    }
    out
}

/// A frame and its children are never selected together: keep the frame.
pub fn exclude_elements_in_frames_from_selection<'a>(selected: &[&'a Element]) -> Vec<&'a Element> {
    let frames: HashSet<&str> = selected
        .iter()
        .filter(|el| el.is_frame_like())
        .map(|el| el.id.as_str())
        .collect();
    selected
        .iter()
        .copied()
        .filter(|el| el.frame_id.as_deref().is_none_or(|f| !frames.contains(f)))
        .collect()
}

/// The value of an attribute if every selected element has the same one.
pub fn get_common_attribute_of_selected_elements<T: PartialEq>(
    elements: &[&Element],
    state: &SelectionState,
    attribute: impl Fn(&Element) -> T,
) -> Option<T> {
    let mut values = get_selected_elements(elements, state, SelectedElementsOptions::default())
        .into_iter()
        .map(attribute);
    let first = values.next()?;
    values.all(|v| v == first).then_some(first)
}

pub fn is_some_element_selected(elements: &[&Element], state: &SelectionState) -> bool {
    elements.iter().any(|el| state.is_selected(&el.id))
}

/// Topmost non-deleted element accepted by `is_at_position`.
pub fn get_element_at_position<'a>(
    elements: impl DoubleEndedIterator<Item = &'a Element>,
    mut is_at_position: impl FnMut(&Element) -> bool,
) -> Option<&'a Element> {
    elements.rev().find(|el| !el.is_deleted && is_at_position(el))
}

/// Whether `point` falls inside the element's rotated box grown by
/// `tolerance`.
pub fn is_point_in_element(element: &Element, point: Point, tolerance: f64) -> bool {
    let bounds = absolute_coords(element);
    let local = rotate_point(point, bounds.center(), -element.angle);
    bounds.inflate(tolerance, tolerance).contains(local)
}
