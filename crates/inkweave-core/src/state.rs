//! Editor configuration and selection state shared by the relationship
//! operations.

use crate::element::{ElementId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which elements and groups are selected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionState {
    /// Selected element ids.
    pub selected_element_ids: BTreeSet<ElementId>,
    /// Group ids touched by the selection. `false` entries mark groups that
    /// were explicitly deselected.
    pub selected_group_ids: BTreeMap<GroupId, bool>,
    /// Group currently entered for editing its members individually.
    pub editing_group_id: Option<GroupId>,
}

impl SelectionState {
    /// Select exactly the given elements, with no group context.
    pub fn with_elements<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ElementId>,
    {
        Self {
            selected_element_ids: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_element_ids.contains(id)
    }

    pub fn is_group_selected(&self, group_id: &str) -> bool {
        self.selected_group_ids.get(group_id).copied().unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.selected_element_ids.clear();
        self.selected_group_ids.clear();
    }
}

fn default_zoom() -> f64 {
    1.0
}

fn default_binding_enabled() -> bool {
    true
}

/// Editor-wide settings consulted by geometry and editing operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    /// Canvas zoom factor; screen size = scene size * zoom.
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Snap grid spacing, if the grid is on.
    #[serde(default)]
    pub grid_size: Option<f64>,
    /// Whether arrow endpoints bind to shapes.
    #[serde(default = "default_binding_enabled")]
    pub is_binding_enabled: bool,
    #[serde(flatten)]
    pub selection: SelectionState,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            grid_size: None,
            is_binding_enabled: default_binding_enabled(),
            selection: SelectionState::default(),
        }
    }
}

impl EditorState {
    /// Grid size to snap to for this interaction.
    pub fn snap_grid(&self, snap: bool) -> Option<f64> {
        if snap { self.grid_size } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let state: EditorState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, EditorState::default());
        assert_eq!(state.zoom, 1.0);
        assert!(state.is_binding_enabled);
    }

    #[test]
    fn test_selection_fields_are_flat() {
        let state: EditorState = serde_json::from_value(serde_json::json!({
            "zoom": 2.0,
            "selectedElementIds": ["a", "b"],
            "selectedGroupIds": { "g": true },
            "editingGroupId": "g"
        }))
        .unwrap();
        assert!(state.selection.is_selected("a"));
        assert!(state.selection.is_group_selected("g"));
        assert_eq!(state.selection.editing_group_id.as_deref(), Some("g"));
    }

    #[test]
    fn test_snap_grid() {
        let state = EditorState { grid_size: Some(20.0), ..Default::default() };
        assert_eq!(state.snap_grid(true), Some(20.0));
        assert_eq!(state.snap_grid(false), None);
    }
}
