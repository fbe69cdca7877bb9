//! Bindings between elements: arrow endpoints to shapes, labels to their
//! containers. Also the whole-set reference repair run after restore and
//! collaboration merges.

use crate::element::{
    BoundElement, BoundElementType, Element, ElementId, PointBinding, absolute_coords,
};
use crate::geometry::rotate_point;
use crate::scene::Scene;
use kurbo::Point;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Smallest distance around a shape within which an arrow endpoint binds.
pub const MIN_BINDING_GAP: f64 = 16.0;
/// Largest such distance.
pub const MAX_BINDING_GAP: f64 = 32.0;

/// Which end of a line or arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

/// What to do with one endpoint's binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BindingChange {
    /// Leave the binding as it is.
    #[default]
    Keep,
    Unbind,
    Bind(ElementId),
}

/// Repair cross references across a whole element set, in place.
///
/// - `frame_id` pointing at a missing, deleted or non-frame element is cleared.
/// - A label whose container is missing loses its `container_id`. A live
///   label is listed in its container's `bound_elements`.
/// - `bound_elements` are deduplicated by id (first entry wins) and stripped
///   of missing or deleted targets. Listed labels without a container get
///   this one; an existing `container_id` is never overwritten.
///
/// Versions are not bumped: the repair is not an edit. Running it twice gives
/// the same result as running it once.
pub fn repair_relations(elements: &mut [Element]) {
    let index: HashMap<ElementId, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, el)| (el.id.clone(), i))
        .collect();

    repair_frame_membership(elements);
    repair_bound_text(elements, &index);
    repair_containers(elements, &index);
}

fn repair_frame_membership(elements: &mut [Element]) {
    let frames: HashSet<ElementId> = elements
        .iter()
        .filter(|el| el.is_frame_like() && !el.is_deleted)
        .map(|el| el.id.clone())
        .collect();
    for element in elements.iter_mut() {
        if element.frame_id.as_ref().is_some_and(|f| !frames.contains(f)) {
            debug!("dropping stale frame of {}", element.id);
            element.frame_id = None;
        }
    }
}

fn repair_bound_text(elements: &mut [Element], index: &HashMap<ElementId, usize>) {
    let mut listings: Vec<(usize, ElementId)> = Vec::new();
    for i in 0..elements.len() {
        let Some(container_id) = elements[i].container_id().map(str::to_owned) else {
            continue;
        };
        match index.get(&container_id) {
            None => {
                debug!("label {} lost its container {container_id}", elements[i].id);
                if let Some(data) = elements[i].text_data_mut() {
                    data.container_id = None;
                }
            }
            Some(&c) => {
                let label = &elements[i];
                let listed = elements[c].bound_elements.iter().any(|b| b.id == label.id);
                if !label.is_deleted && !listed {
                    listings.push((c, label.id.clone()));
                }
            }
        }
    }
    for (c, id) in listings {
        let container = &mut elements[c];
        if !container.bound_elements.iter().any(|b| b.id == id) {
            debug!("listing label {id} on {}", container.id);
            container.bound_elements.push(BoundElement::text(id));
        }
    }
}

fn repair_containers(elements: &mut [Element], index: &HashMap<ElementId, usize>) {
    let is_label: Vec<bool> = elements.iter().map(|el| el.container_id().is_some()).collect();
    let mut adoptions: Vec<(usize, ElementId)> = Vec::new();

    for i in 0..elements.len() {
        if is_label[i] || elements[i].bound_elements.is_empty() {
            continue;
        }
        let container_id = elements[i].id.clone();
        let entries = std::mem::take(&mut elements[i].bound_elements);
        let before = entries.len();
        let mut seen = HashSet::new();
        let kept: Vec<BoundElement> = entries
            .into_iter()
            .filter(|entry| {
                let Some(&j) = index.get(&entry.id) else {
                    return false;
                };
                if !seen.insert(entry.id.clone()) || elements[j].is_deleted {
                    return false;
                }
                if elements[j].is_text() && elements[j].container_id().is_none() {
                    adoptions.push((j, container_id.clone()));
                }
                true
            })
            .collect();
        if kept.len() != before {
            debug!("pruned {} bound elements of {container_id}", before - kept.len());
        }
        elements[i].bound_elements = kept;
    }

    for (j, container_id) in adoptions {
        if let Some(data) = elements[j].text_data_mut() {
            if data.container_id.is_none() {
                data.container_id = Some(container_id);
            }
        }
    }
}

/// Distance around a shape within which an endpoint binds to it: a quarter
/// of the smaller side, clamped to `[MIN_BINDING_GAP, MAX_BINDING_GAP]`.
pub fn max_binding_gap(width: f64, height: f64) -> f64 {
    let smaller = width.abs().min(height.abs());
    (0.25 * smaller).clamp(MIN_BINDING_GAP, MAX_BINDING_GAP)
}

/// `point` expressed in the unrotated frame of `element`.
fn unrotated(element: &Element, point: Point) -> Point {
    let center = absolute_coords(element).center();
    rotate_point(point, center, -element.angle)
}

/// Distance from `point` to the element's (rotated) box; 0 inside it.
pub fn distance_to_element(element: &Element, point: Point) -> f64 {
    let p = unrotated(element, point);
    let r = absolute_coords(element);
    let dx = (r.x0 - p.x).max(p.x - r.x1).max(0.0);
    let dy = (r.y0 - p.y).max(p.y - r.y1).max(0.0);
    dx.hypot(dy)
}

/// Whether `point` is close enough to `element` to bind to it.
pub fn is_hovering_element_for_binding(element: &Element, point: Point) -> bool {
    distance_to_element(element, point) <= max_binding_gap(element.width, element.height)
}

/// Topmost bindable element under `point`, ignoring `exclude` (usually the
/// arrow being edited).
pub fn get_hovered_element_for_binding<'a>(
    point: Point,
    elements: impl DoubleEndedIterator<Item = &'a Element>,
    exclude: Option<&str>,
) -> Option<&'a Element> {
    elements.rev().find(|el| {
        !el.is_deleted
            && el.is_bindable()
            && exclude != Some(el.id.as_str())
            && is_hovering_element_for_binding(el, point)
    })
}

/// Apply binding changes to both ends of a line or arrow. Every element
/// touched gets its version bumped.
pub fn bind_or_unbind_linear_element(
    scene: &mut Scene,
    linear_id: &str,
    start: BindingChange,
    end: BindingChange,
) {
    for (endpoint, change) in [(Endpoint::Start, start), (Endpoint::End, end)] {
        match change {
            BindingChange::Keep => {}
            BindingChange::Unbind => unbind_endpoint(scene, linear_id, endpoint),
            BindingChange::Bind(target) => bind_endpoint(scene, linear_id, endpoint, &target),
        }
    }
}

fn endpoint_binding(element: &Element, endpoint: Endpoint) -> Option<&PointBinding> {
    let data = element.linear_data()?;
    match endpoint {
        Endpoint::Start => data.start_binding.as_ref(),
        Endpoint::End => data.end_binding.as_ref(),
    }
}

fn set_endpoint_binding(element: &mut Element, endpoint: Endpoint, binding: Option<PointBinding>) {
    if let Some(data) = element.linear_data_mut() {
        match endpoint {
            Endpoint::Start => data.start_binding = binding,
            Endpoint::End => data.end_binding = binding,
        }
    }
}

/// Global position of an endpoint.
pub fn endpoint_coords(element: &Element, endpoint: Endpoint) -> Option<Point> {
    let points = element.points()?;
    let local = match endpoint {
        Endpoint::Start => points.first()?,
        Endpoint::End => points.last()?,
    };
    let bounds = absolute_coords(element);
    let global = Point::new(element.x + local.x, element.y + local.y);
    Some(rotate_point(global, bounds.center(), element.angle))
}

fn unbind_endpoint(scene: &mut Scene, linear_id: &str, endpoint: Endpoint) {
    let Some(linear) = scene.get(linear_id) else {
        return;
    };
    let Some(previous) = endpoint_binding(linear, endpoint).map(|b| b.element_id.clone()) else {
        return;
    };
    let other = match endpoint {
        Endpoint::Start => Endpoint::End,
        Endpoint::End => Endpoint::Start,
    };
    let still_bound = endpoint_binding(linear, other).is_some_and(|b| b.element_id == previous);

    scene.mutate(linear_id, |el| set_endpoint_binding(el, endpoint, None));
    if !still_bound {
        remove_bound_arrow(scene, &previous, linear_id);
    }
}

fn remove_bound_arrow(scene: &mut Scene, target_id: &str, linear_id: &str) {
    let listed = scene
        .get(target_id)
        .is_some_and(|t| t.bound_elements.iter().any(|b| b.id == linear_id));
    if listed {
        scene.mutate(target_id, |t| t.bound_elements.retain(|b| b.id != linear_id));
    }
}

fn bind_endpoint(scene: &mut Scene, linear_id: &str, endpoint: Endpoint, target_id: &str) {
    let (Some(linear), Some(target)) = (scene.get(linear_id), scene.get_non_deleted(target_id))
    else {
        return;
    };
    if !target.is_bindable() || target.id == linear.id {
        return;
    }
    let Some(point) = endpoint_coords(linear, endpoint) else {
        return;
    };
    let gap = distance_to_element(target, point);
    let previous = endpoint_binding(linear, endpoint).map(|b| b.element_id.clone());
    if previous.as_deref() == Some(target_id) {
        return;
    }
    if previous.is_some() {
        unbind_endpoint(scene, linear_id, endpoint);
    }

    let binding = PointBinding { element_id: target_id.to_string(), focus: 0.0, gap };
    scene.mutate(linear_id, |el| set_endpoint_binding(el, endpoint, Some(binding)));
    let listed = scene
        .get(target_id)
        .is_some_and(|t| t.bound_elements.iter().any(|b| b.id == linear_id));
    if !listed {
        scene.mutate(target_id, |t| t.bound_elements.push(BoundElement::arrow(linear_id)));
    }
}

/// Clear the bindings of arrows pointing at `deleted_ids` and drop the
/// arrows from the `bound_elements` of deleted shapes they were bound to.
pub fn fix_bindings_after_deletion(scene: &mut Scene, deleted_ids: &[ElementId]) {
    let deleted: HashSet<&str> = deleted_ids.iter().map(String::as_str).collect();
    let mut unbind: Vec<(ElementId, Endpoint)> = Vec::new();
    for el in scene.non_deleted_elements() {
        for endpoint in [Endpoint::Start, Endpoint::End] {
            if endpoint_binding(el, endpoint).is_some_and(|b| deleted.contains(b.element_id.as_str())) {
                unbind.push((el.id.clone(), endpoint));
            }
        }
    }
    for (id, endpoint) in unbind {
        unbind_endpoint(scene, &id, endpoint);
    }

    let mut detach: Vec<(ElementId, ElementId)> = Vec::new();
    for id in deleted_ids {
        let Some(el) = scene.get(id).filter(|el| el.is_linear()) else {
            continue;
        };
        for endpoint in [Endpoint::Start, Endpoint::End] {
            if let Some(binding) = endpoint_binding(el, endpoint) {
                detach.push((binding.element_id.clone(), id.clone()));
            }
        }
    }
    for (target, arrow) in detach {
        remove_bound_arrow(scene, &target, &arrow);
    }
}

/// Ids of arrows bound to `element`.
pub fn bound_arrow_ids(element: &Element) -> impl Iterator<Item = &str> {
    element
        .bound_elements
        .iter()
        .filter(|b| b.kind == BoundElementType::Arrow)
        .map(|b| b.id.as_str())
}
