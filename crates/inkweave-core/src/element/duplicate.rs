//! Copying elements with fresh identities.

use super::{BoundElement, Element, ElementId, GroupId, PointBinding, now_ms};
use crate::Random;
use crate::groups::get_new_group_ids_for_duplication;
use std::collections::HashMap;

/// Copy an element under a new id.
///
/// The copy starts a fresh history (version 1, new nonce and seed) and
/// drops back-references, since whatever was bound to the original is not
/// bound to the copy. Group ids inside `editing_group_id` are remapped
/// through `group_id_map`, so elements duplicated in one operation keep
/// sharing their (new) groups.
pub fn duplicate_element(
    editing_group_id: Option<&str>,
    group_id_map: &mut HashMap<GroupId, GroupId>,
    element: &Element,
    rng: &mut Random,
) -> Element {
    let mut copy = element.clone();
    copy.id = rng.random_id();
    copy.bound_elements.clear();
    copy.seed = rng.random_integer();
    copy.version = 1;
    copy.version_nonce = rng.random_integer();
    copy.updated = now_ms();
    copy.group_ids = get_new_group_ids_for_duplication(&element.group_ids, editing_group_id, |g| {
        group_id_map
            .entry(g.to_string())
            .or_insert_with(|| rng.random_id())
            .clone()
    });
    copy
}

/// Duplicate a set of elements as a unit.
///
/// References between members of the set (bindings, labels, frames) are
/// rewired to the copies. References to elements outside the set are dropped,
/// except frame membership, which the copies keep. Returns the copies in
/// input order plus the old → new id map.
pub fn duplicate_elements(
    elements: &[Element],
    rng: &mut Random,
) -> (Vec<Element>, HashMap<ElementId, ElementId>) {
    let mut group_id_map = HashMap::new();
    let mut copies: Vec<Element> = elements
        .iter()
        .map(|el| duplicate_element(None, &mut group_id_map, el, rng))
        .collect();
    let id_map: HashMap<ElementId, ElementId> = elements
        .iter()
        .zip(&copies)
        .map(|(old, new)| (old.id.clone(), new.id.clone()))
        .collect();

    for (original, copy) in elements.iter().zip(copies.iter_mut()) {
        copy.bound_elements = original
            .bound_elements
            .iter()
            .filter_map(|b| {
                id_map.get(&b.id).map(|id| BoundElement { id: id.clone(), kind: b.kind })
            })
            .collect();

        if let Some(data) = copy.text_data_mut() {
            data.container_id = data.container_id.as_ref().and_then(|id| id_map.get(id)).cloned();
        }

        if let Some(data) = copy.linear_data_mut() {
            for binding in [&mut data.start_binding, &mut data.end_binding] {
                let remapped = binding
                    .take()
                    .and_then(|b| id_map.get(&b.element_id).map(|id| PointBinding {
                        element_id: id.clone(),
                        ..b
                    }));
                *binding = remapped;
            }
        }
    }

    bind_elements_to_frames_after_duplication(&mut copies, elements, &id_map);
    (copies, id_map)
}

/// Point the copies' `frame_id` at the copied frame when the frame was
/// duplicated along with them, or at the original frame otherwise.
pub fn bind_elements_to_frames_after_duplication(
    next_elements: &mut [Element],
    old_elements: &[Element],
    old_id_to_duplicated_id: &HashMap<ElementId, ElementId>,
) {
    let positions: HashMap<ElementId, usize> = next_elements
        .iter()
        .enumerate()
        .map(|(i, el)| (el.id.clone(), i))
        .collect();

    for element in old_elements {
        let Some(frame_id) = &element.frame_id else {
            continue;
        };
        let Some(next_id) = old_id_to_duplicated_id.get(&element.id) else {
            continue;
        };
        if let Some(&idx) = positions.get(next_id) {
            let next_frame = old_id_to_duplicated_id
                .get(frame_id)
                .unwrap_or(frame_id)
                .clone();
            next_elements[idx].frame_id = Some(next_frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementType;
    use kurbo::Point;

    #[test]
    fn test_duplicate_gets_fresh_identity() {
        let mut rng = Random::new(31);
        let mut el = Element::new(ElementType::Rectangle, 0.0, 0.0, 10.0, 10.0, &mut rng);
        el.version = 7;
        el.bound_elements.push(BoundElement::arrow("elsewhere"));
        let mut map = HashMap::new();
        let copy = duplicate_element(None, &mut map, &el, &mut rng);
        assert_ne!(copy.id, el.id);
        assert_eq!(copy.version, 1);
        assert!(copy.bound_elements.is_empty());
        assert_eq!((copy.x, copy.width), (el.x, el.width));
    }

    #[test]
    fn test_shared_group_map_keeps_copies_together() {
        let mut rng = Random::new(31);
        let mut a = Element::new(ElementType::Rectangle, 0.0, 0.0, 10.0, 10.0, &mut rng);
        let mut b = a.clone();
        b.id = "b".into();
        a.group_ids = vec!["inner".into(), "outer".into()];
        b.group_ids = vec!["inner".into(), "outer".into()];

        let mut map = HashMap::new();
        let ca = duplicate_element(Some("outer"), &mut map, &a, &mut rng);
        let cb = duplicate_element(Some("outer"), &mut map, &b, &mut rng);
        assert_eq!(ca.group_ids, cb.group_ids);
        assert_ne!(ca.group_ids[0], "inner");
        assert_eq!(ca.group_ids[1], "outer");
    }

    #[test]
    fn test_duplicate_set_rewires_internal_references() {
        let mut rng = Random::new(32);
        let mut rect = Element::new(ElementType::Rectangle, 0.0, 0.0, 100.0, 50.0, &mut rng);
        let label = Element::new_text(0.0, 0.0, "hi", Some(rect.id.clone()), &mut rng);
        let mut arrow = Element::new_linear(
            ElementType::Arrow,
            200.0,
            0.0,
            vec![Point::ZERO, Point::new(-90.0, 0.0)],
            &mut rng,
        );
        let binding = |id: &str| PointBinding { element_id: id.to_string(), focus: 0.0, gap: 5.0 };
        if let Some(data) = arrow.linear_data_mut() {
            data.start_binding = Some(binding("outside"));
            data.end_binding = Some(binding(&rect.id));
        }
        rect.bound_elements = vec![BoundElement::text(label.id.clone()), BoundElement::arrow(arrow.id.clone())];

        let (copies, ids) = duplicate_elements(&[rect.clone(), label.clone(), arrow.clone()], &mut rng);
        let (c_rect, c_label, c_arrow) = (&copies[0], &copies[1], &copies[2]);

        assert_eq!(c_rect.bound_text_element_id(), Some(c_label.id.as_str()));
        assert_eq!(c_rect.bound_elements[1].id, c_arrow.id);
        assert_eq!(c_label.container_id(), Some(c_rect.id.as_str()));
        let data = c_arrow.linear_data().unwrap();
        assert!(data.start_binding.is_none());
        assert_eq!(data.end_binding.as_ref().unwrap().element_id, c_rect.id);
        assert_eq!(ids[&rect.id], c_rect.id);
    }

    #[test]
    fn test_frame_membership_after_duplication() {
        let mut rng = Random::new(33);
        let frame = Element::new(ElementType::Frame, 0.0, 0.0, 200.0, 200.0, &mut rng);
        let mut inside = Element::new(ElementType::Ellipse, 10.0, 10.0, 10.0, 10.0, &mut rng);
        inside.frame_id = Some(frame.id.clone());

        let (alone, _) = duplicate_elements(std::slice::from_ref(&inside), &mut rng);
        assert_eq!(alone[0].frame_id.as_deref(), Some(frame.id.as_str()));

        let (both, ids) = duplicate_elements(&[frame.clone(), inside.clone()], &mut rng);
        assert_eq!(both[1].frame_id.as_deref(), Some(ids[&frame.id].as_str()));
    }
}
