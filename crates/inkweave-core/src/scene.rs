//! The element store: id-keyed arena plus z-order.

use crate::Random;
use crate::binding::repair_relations;
use crate::element::{Element, ElementId, ElementLookup, bump_version, is_invisibly_small_element};
use crate::frame::sync_frame_ordering;
use std::collections::{HashMap, HashSet};

/// Seed of the djb2 hash.
const HASH_SEED: u32 = 5381;

/// All elements of a drawing.
///
/// Relations between elements (bindings, labels, frames, groups) are ids,
/// resolved through this store. Elements are never removed, only soft
/// deleted, so that collaborators and history can still refer to them.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// All elements, keyed by id.
    elements: HashMap<ElementId, Element>,
    /// Z-order (back to front).
    z_order: Vec<ElementId>,
    /// Source of nonces and ids for edits made through the store.
    rng: Random,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(rng: Random) -> Self {
        Self {
            elements: HashMap::new(),
            z_order: Vec::new(),
            rng,
        }
    }

    /// Create a scene from elements in z-order. Later duplicates of an id
    /// replace earlier ones in place.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>, rng: Random) -> Self {
        let mut scene = Self::new(rng);
        scene.replace_all(elements);
        scene
    }

    /// Replace the whole content, keeping the random source.
    pub fn replace_all(&mut self, elements: impl IntoIterator<Item = Element>) {
        self.elements.clear();
        self.z_order.clear();
        for element in elements {
            self.insert(element);
        }
    }

    /// Random source used for edits made through the store.
    pub fn rng(&mut self) -> &mut Random {
        &mut self.rng
    }

    pub fn len(&self) -> usize {
        self.z_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Get an element by id, deleted or not.
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Get an element by id unless it is soft deleted.
    pub fn get_non_deleted(&self, id: &str) -> Option<&Element> {
        self.get(id).filter(|el| !el.is_deleted)
    }

    /// Z-index of an element.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.z_order.iter().position(|z| z == id)
    }

    /// Add or replace an element as is, without touching its version. New
    /// elements go on top.
    pub fn insert(&mut self, element: Element) {
        if !self.elements.contains_key(&element.id) {
            self.z_order.push(element.id.clone());
        }
        self.elements.insert(element.id.clone(), element);
    }

    /// Store an edited copy of an element.
    ///
    /// With `bump` the stored version becomes one past both the incoming and
    /// the previously stored version and a new nonce is drawn, so the write
    /// is visible to collaborators. Without it the element is stored as is,
    /// which is meant for reference repairs only.
    pub fn set(&mut self, mut element: Element, bump: bool) {
        if bump {
            let previous = self.get(&element.id).map_or(0, |el| el.version);
            element.version = element.version.max(previous);
            bump_version(&mut element, &mut self.rng);
        }
        self.insert(element);
    }

    /// Edit an element in place and bump its version. Returns false if there
    /// is no such element.
    pub fn mutate(&mut self, id: &str, f: impl FnOnce(&mut Element)) -> bool {
        match self.elements.get_mut(id) {
            Some(element) => {
                element.mutate(&mut self.rng, f);
                true
            }
            None => false,
        }
    }

    /// Soft delete an element.
    pub fn delete(&mut self, id: &str) -> bool {
        self.mutate(id, |el| el.is_deleted = true)
    }

    /// All elements in z-order, including deleted ones.
    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &Element> + '_ {
        self.z_order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Non-deleted elements in z-order.
    pub fn non_deleted_elements(&self) -> impl DoubleEndedIterator<Item = &Element> + '_ {
        self.elements().filter(|el| !el.is_deleted)
    }

    /// Owned copy of all elements in z-order.
    pub fn to_vec(&self) -> Vec<Element> {
        self.elements().cloned().collect()
    }

    /// Z-order ids.
    pub fn z_order(&self) -> &[ElementId] {
        &self.z_order
    }

    /// Reorder the scene. Ids not present are ignored; elements missing from
    /// `order` keep their relative order at the end.
    pub fn set_z_order(&mut self, order: &[ElementId]) {
        let mut seen = HashSet::new();
        let mut next: Vec<ElementId> = order
            .iter()
            .filter(|id| self.elements.contains_key(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect();
        next.extend(self.z_order.iter().filter(|id| !seen.contains(*id)).cloned());
        self.z_order = next;
    }

    /// Change detection hash over the current z-order.
    pub fn version_hash(&self) -> u32 {
        hash_elements_version(self.elements())
    }

    /// Run the reference repair and frame ordering passes. Versions are left
    /// untouched.
    pub fn repair(&mut self) {
        let mut elements = self.to_vec();
        repair_relations(&mut elements);
        let elements = sync_frame_ordering(elements);
        self.replace_all(elements);
    }

    /// Merge elements coming from another session.
    pub fn merge_remote(&mut self, remote: &[Element]) {
        let merged = reconcile_elements(&self.to_vec(), remote);
        self.replace_all(merged);
    }
}

impl ElementLookup for Scene {
    fn lookup(&self, id: &str) -> Option<&Element> {
        self.get(id)
    }
}

/// Order-sensitive djb2 hash over version nonces.
pub fn hash_elements_version<'a>(elements: impl IntoIterator<Item = &'a Element>) -> u32 {
    elements.into_iter().fold(HASH_SEED, |hash, el| {
        hash.wrapping_mul(33).wrapping_add(el.version_nonce as u32)
    })
}

/// djb2 over the UTF-16 code units of a string.
pub fn hash_string(s: &str) -> u32 {
    s.encode_utf16()
        .fold(HASH_SEED, |hash, unit| hash.wrapping_mul(33).wrapping_add(u32::from(unit)))
}

/// Sum of element versions.
#[deprecated(note = "order-insensitive and collision prone; use hash_elements_version")]
pub fn get_scene_version<'a>(elements: impl IntoIterator<Item = &'a Element>) -> u64 {
    elements.into_iter().map(|el| el.version).sum()
}

/// Elements worth rendering: not deleted and not degenerate.
pub fn visible_elements<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Vec<&'a Element> {
    elements
        .into_iter()
        .filter(|el| !el.is_deleted && !is_invisibly_small_element(el))
        .collect()
}

/// Whether `remote` should replace `local`: higher version wins, equal
/// versions fall back to the lower nonce so that every peer picks the same
/// element.
pub fn should_discard_local(local: &Element, remote: &Element) -> bool {
    remote.version > local.version
        || (remote.version == local.version && remote.version_nonce < local.version_nonce)
}

/// Last-writer-wins merge of two element lists, per element.
///
/// The result keeps the local order, with remote-only elements appended in
/// remote order, and has the reference repairs applied. No element is merged
/// field by field: the winning record replaces the other one as a whole.
pub fn reconcile_elements(local: &[Element], remote: &[Element]) -> Vec<Element> {
    let remote_by_id: HashMap<&str, &Element> =
        remote.iter().map(|el| (el.id.as_str(), el)).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(local.len() + remote.len());

    for el in local {
        if !seen.insert(el.id.as_str()) {
            continue;
        }
        match remote_by_id.get(el.id.as_str()) {
            Some(&theirs) if should_discard_local(el, theirs) => merged.push(theirs.clone()),
            _ => merged.push(el.clone()),
        }
    }
    for el in remote {
        if seen.insert(el.id.as_str()) {
            merged.push(el.clone());
        }
    }

    repair_relations(&mut merged);
    sync_frame_ordering(merged)
}
