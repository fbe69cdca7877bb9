//! Ad-hoc groups.
//!
//! An element's `group_ids` is a stack: index 0 is the innermost group and
//! the last entry the outermost one. Entering a group for editing
//! (`editing_group_id`) hides every group from that level outwards.

use crate::element::{Element, ElementLookup, GroupId, get_bound_text_element};
use crate::state::SelectionState;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};

fn as_element<E: Borrow<Element>>(element: &E) -> &Element {
    element.borrow()
}

/// Select every element of `group_id`.
///
/// A group with fewer than two members is not a real group: the selection
/// is returned unchanged, except that the group is marked deselected and
/// editing is left if it was active.
pub fn select_group<E: Borrow<Element>>(
    group_id: &str,
    state: &SelectionState,
    elements: &[E],
) -> SelectionState {
    let members: Vec<&str> = elements
        .iter()
        .map(as_element)
        .filter(|el| el.group_ids.iter().any(|g| g == group_id))
        .map(|el| el.id.as_str())
        .collect();

    if members.len() < 2 {
        if state.is_group_selected(group_id) || state.editing_group_id.as_deref() == Some(group_id) {
            let mut next = state.clone();
            next.selected_group_ids.insert(group_id.to_string(), false);
            next.editing_group_id = None;
            return next;
        }
        return state.clone();
    }

    let mut next = state.clone();
    next.selected_group_ids.insert(group_id.to_string(), true);
    next.selected_element_ids
        .extend(members.into_iter().map(str::to_string));
    next
}

/// Whether the element shows up as part of a selected group rather than on
/// its own.
pub fn is_selected_via_group(state: &SelectionState, element: &Element) -> bool {
    get_selected_group_for_element(state, element).is_some()
}

/// First selected group of the element, skipping the group being edited.
pub fn get_selected_group_for_element<'a>(
    state: &SelectionState,
    element: &'a Element,
) -> Option<&'a str> {
    element
        .group_ids
        .iter()
        .filter(|g| state.editing_group_id.as_ref() != Some(*g))
        .find(|g| state.is_group_selected(g))
        .map(String::as_str)
}

pub fn get_selected_group_ids(state: &SelectionState) -> Vec<GroupId> {
    state
        .selected_group_ids
        .iter()
        .filter(|(_, selected)| **selected)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Group ids that should be active for a set of selected elements: for each
/// element, the outermost group below the one being edited.
pub fn select_groups_from_given_elements<E: Borrow<Element>>(
    elements: &[E],
    state: &SelectionState,
) -> BTreeMap<GroupId, bool> {
    let mut next = SelectionState { selected_group_ids: BTreeMap::new(), ..state.clone() };

    for element in elements.iter().map(as_element) {
        let mut group_ids = element.group_ids.as_slice();
        if let Some(editing) = &state.editing_group_id {
            if let Some(pos) = group_ids.iter().position(|g| g == editing) {
                group_ids = &group_ids[..pos];
            }
        }
        if let Some(group_id) = group_ids.last() {
            next = select_group(group_id, &next, elements);
        }
    }

    next.selected_group_ids
}

/// Enter the innermost group of `element` and select only it.
pub fn edit_group_for_selected_element(element: &Element) -> SelectionState {
    SelectionState {
        editing_group_id: element.group_ids.first().cloned(),
        selected_group_ids: BTreeMap::new(),
        selected_element_ids: [element.id.clone()].into_iter().collect(),
    }
}

pub fn is_element_in_group(element: &Element, group_id: &str) -> bool {
    element.group_ids.iter().any(|g| g == group_id)
}

pub fn get_elements_in_group<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    group_id: &str,
) -> Vec<&'a Element> {
    elements
        .into_iter()
        .filter(|el| is_element_in_group(el, group_id))
        .collect()
}

/// First of the element's groups that is selected.
pub fn get_selected_group_id_for_element<'a>(
    element: &'a Element,
    selected_group_ids: &BTreeMap<GroupId, bool>,
) -> Option<&'a str> {
    element
        .group_ids
        .iter()
        .find(|g| selected_group_ids.get(*g).copied().unwrap_or(false))
        .map(String::as_str)
}

/// Group stack of a duplicate: groups inside the edited one get fresh ids
/// from `mapper`, the edited group and everything outside it are shared with
/// the original.
pub fn get_new_group_ids_for_duplication(
    group_ids: &[GroupId],
    editing_group_id: Option<&str>,
    mut mapper: impl FnMut(&str) -> GroupId,
) -> Vec<GroupId> {
    let end = editing_group_id
        .and_then(|editing| group_ids.iter().position(|g| g == editing))
        .unwrap_or(group_ids.len());
    group_ids
        .iter()
        .enumerate()
        .map(|(i, g)| if i < end { mapper(g) } else { g.clone() })
        .collect()
}

/// Insert `new_group_id` just inside the edited group, or as the new
/// outermost group.
pub fn add_to_group(
    prev_group_ids: &[GroupId],
    new_group_id: GroupId,
    editing_group_id: Option<&str>,
) -> Vec<GroupId> {
    let mut group_ids = prev_group_ids.to_vec();
    let pos = editing_group_id
        .and_then(|editing| group_ids.iter().position(|g| g == editing))
        .unwrap_or(group_ids.len());
    group_ids.insert(pos, new_group_id);
    group_ids
}

pub fn remove_from_selected_groups(
    group_ids: &[GroupId],
    selected_group_ids: &BTreeMap<GroupId, bool>,
) -> Vec<GroupId> {
    group_ids
        .iter()
        .filter(|g| !selected_group_ids.get(*g).copied().unwrap_or(false))
        .cloned()
        .collect()
}

/// Partition elements by outermost group; ungrouped elements form their
/// own partition. Bound labels travel with their container. Partitions are
/// returned in order of first appearance.
pub fn get_maximum_groups<'a, L: ElementLookup + ?Sized>(
    elements: &[&'a Element],
    lookup: &'a L,
) -> Vec<Vec<&'a Element>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&'a Element>> = HashMap::new();

    for &element in elements {
        let key = element
            .top_most_group_id()
            .unwrap_or(element.id.as_str());
        let members = groups.entry(key).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        if let Some(label) = get_bound_text_element(element, lookup) {
            members.push(label);
        }
        members.push(element);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(key))
        .collect()
}

/// Whether some group is shared by every element.
pub fn elements_are_in_same_group(elements: &[&Element]) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut max = 0;
    for group in elements.iter().flat_map(|el| el.group_ids.iter()) {
        let count = counts.entry(group.as_str()).or_default();
        *count += 1;
        max = max.max(*count);
    }
    max == elements.len()
}
