//! Frame membership.
//!
//! An element belongs to a frame through its `frame_id`. In z-order, the
//! children of a frame sit right before the frame itself:
//! `[el, el, child, child, frame, el]`.

use crate::element::{
    Element, ElementId, ElementLookup, absolute_coords, common_bounds, get_bound_text_element,
};
use crate::geometry::is_point_within_bounds;
use crate::groups::get_elements_in_group;
use crate::scene::Scene;
use kurbo::Point;
use std::collections::{HashMap, HashSet};

/// Whether the combined bounds of `elements` fit inside the frame.
pub fn elements_are_in_frame_bounds(elements: &[&Element], frame: &Element) -> bool {
    let Some(bounds) = common_bounds(elements.iter().copied()) else {
        return false;
    };
    let f = absolute_coords(frame);
    f.x0 <= bounds.x0 && f.y0 <= bounds.y0 && f.x1 >= bounds.x1 && f.y1 >= bounds.y1
}

pub fn is_cursor_in_frame(cursor: Point, frame: &Element) -> bool {
    let f = absolute_coords(frame);
    is_point_within_bounds(Point::new(f.x0, f.y0), cursor, Point::new(f.x1, f.y1))
}

pub fn get_frame_children<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    frame_id: &str,
) -> Vec<&'a Element> {
    elements
        .into_iter()
        .filter(|el| el.frame_id.as_deref() == Some(frame_id))
        .collect()
}

pub fn get_frame_like_elements<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
) -> Vec<&'a Element> {
    elements.into_iter().filter(|el| el.is_frame_like()).collect()
}

/// Children grouped by frame, frames in order of first appearance (either
/// the frame itself or one of its children). Empty frames are included.
pub fn group_by_frame_likes<'a>(elements: &[&'a Element]) -> Vec<(&'a str, Vec<&'a Element>)> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();
    for el in elements {
        let frame_id = if el.is_frame_like() { Some(el.id.as_str()) } else { el.frame_id.as_deref() };
        if let Some(frame_id) = frame_id {
            if seen.insert(frame_id) {
                groups.push((frame_id, get_frame_children(elements.iter().copied(), frame_id)));
            }
        }
    }
    groups
}

/// Frames plus every element that is not inside one of them. Children of a
/// frame missing from `elements` count as roots.
pub fn get_root_elements<'a>(elements: &[&'a Element]) -> Vec<&'a Element> {
    let frames: HashSet<&str> = elements
        .iter()
        .filter(|el| el.is_frame_like())
        .map(|el| el.id.as_str())
        .collect();
    elements
        .iter()
        .copied()
        .filter(|el| {
            frames.contains(el.id.as_str())
                || el.frame_id.as_deref().is_none_or(|f| !frames.contains(f))
        })
        .collect()
}

/// The frame an element belongs to.
pub fn get_containing_frame<'a, L: ElementLookup + ?Sized>(
    element: &Element,
    elements: &'a L,
) -> Option<&'a Element> {
    elements
        .lookup(element.frame_id.as_deref()?)
        .filter(|f| f.is_frame_like())
}

/// Drop elements whose outermost group also holds a frame: such a group
/// cannot move into a frame piecemeal.
pub fn omit_groups_containing_frame_likes<'a>(
    all_elements: &[&'a Element],
    selected: &[&'a Element],
) -> Vec<&'a Element> {
    let top_groups: HashSet<&str> = selected
        .iter()
        .filter_map(|el| el.top_most_group_id())
        .collect();
    let rejected: HashSet<&str> = top_groups
        .into_iter()
        .filter(|group_id| {
            get_elements_in_group(all_elements.iter().copied(), group_id)
                .iter()
                .any(|el| el.is_frame_like())
        })
        .collect();
    selected
        .iter()
        .copied()
        .filter(|el| el.top_most_group_id().is_none_or(|g| !rejected.contains(g)))
        .collect()
}

/// Put elements (and their labels) into a frame.
///
/// Frames, children of other frames being added, and members of groups that
/// contain a frame are skipped. Changed elements get a version bump and the
/// z-order is fixed up afterwards.
pub fn add_elements_to_frame(scene: &mut Scene, ids: &[ElementId], frame_id: &str) {
    if !scene
        .get_non_deleted(frame_id)
        .is_some_and(Element::is_frame_like)
    {
        return;
    }

    let to_update: Vec<ElementId> = {
        let all: Vec<&Element> = scene.elements().collect();
        let current: HashSet<&str> = get_frame_children(all.iter().copied(), frame_id)
            .into_iter()
            .map(|el| el.id.as_str())
            .collect();
        let supplied: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let to_add: Vec<&Element> = ids.iter().filter_map(|id| scene.get_non_deleted(id)).collect();
        let other_frames: HashSet<&str> = to_add
            .iter()
            .filter(|el| el.is_frame_like() && el.id != frame_id)
            .map(|el| el.id.as_str())
            .collect();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for el in omit_groups_containing_frame_likes(&all, &to_add) {
            let in_other_frame = el
                .frame_id
                .as_deref()
                .is_some_and(|f| other_frames.contains(f));
            if el.is_frame_like() || in_other_frame {
                continue;
            }
            if !current.contains(el.id.as_str()) && seen.insert(el.id.as_str()) {
                out.push(el.id.clone());
            }
            if let Some(label) = get_bound_text_element(el, &*scene) {
                let id = label.id.as_str();
                if !supplied.contains(id) && !current.contains(id) && seen.insert(id) {
                    out.push(label.id.clone());
                }
            }
        }
        out
    };

    for id in &to_update {
        scene.mutate(id, |el| el.frame_id = Some(frame_id.to_string()));
    }
    log::debug!("added {} elements to frame {frame_id}", to_update.len());
    reorder_scene(scene);
}

/// Take elements (and their labels) out of whatever frame they are in.
pub fn remove_elements_from_frame(scene: &mut Scene, ids: &[ElementId]) {
    let mut to_update: Vec<ElementId> = Vec::new();
    for id in ids {
        let Some(el) = scene.get(id).filter(|el| el.frame_id.is_some()) else {
            continue;
        };
        to_update.push(el.id.clone());
        if let Some(label) = get_bound_text_element(el, &*scene) {
            to_update.push(label.id.clone());
        }
    }
    for id in &to_update {
        scene.mutate(id, |el| el.frame_id = None);
    }
}

/// Empty a frame.
pub fn remove_all_elements_from_frame(scene: &mut Scene, frame_id: &str) {
    let children: Vec<ElementId> = get_frame_children(scene.elements(), frame_id)
        .into_iter()
        .map(|el| el.id.clone())
        .collect();
    remove_elements_from_frame(scene, &children);
}

/// Indices of `elements` reordered so that the children of every frame sit
/// right before it. Frames never count as children.
fn frame_ordering<'a>(elements: &[&'a Element]) -> Vec<usize> {
    fn parent<'a>(el: &'a Element, frames: &HashSet<&str>) -> Option<&'a str> {
        if el.is_frame_like() {
            return None;
        }
        el.frame_id.as_deref().filter(|f| frames.contains(f))
    }

    let frames: HashSet<&str> = elements
        .iter()
        .filter(|el| el.is_frame_like())
        .map(|el| el.id.as_str())
        .collect();
    let parent_of = |el: &'a Element| parent(el, &frames);

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, el) in elements.iter().enumerate() {
        if let Some(frame_id) = parent_of(*el) {
            children.entry(frame_id).or_default().push(i);
        }
    }

    let mut order = Vec::with_capacity(elements.len());
    for (i, el) in elements.iter().enumerate() {
        if parent_of(*el).is_some() {
            continue;
        }
        if el.is_frame_like() {
            if let Some(kids) = children.remove(el.id.as_str()) {
                order.extend(kids);
            }
        }
        order.push(i);
    }
    order
}

/// Restore the children-before-frame z-order. Running it again is a no-op.
pub fn sync_frame_ordering(elements: Vec<Element>) -> Vec<Element> {
    let order = {
        let refs: Vec<&Element> = elements.iter().collect();
        frame_ordering(&refs)
    };
    let mut slots: Vec<Option<Element>> = elements.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Reorder a scene in place so that frame children precede their frames.
pub fn reorder_scene(scene: &mut Scene) {
    let order: Vec<ElementId> = {
        let refs: Vec<&Element> = scene.elements().collect();
        frame_ordering(&refs)
            .into_iter()
            .map(|i| refs[i].id.clone())
            .collect()
    };
    scene.set_z_order(&order);
}
