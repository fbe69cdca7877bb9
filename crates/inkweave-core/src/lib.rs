//! InkWeave Core Library
//!
//! Element model, geometry and relationship maintenance for the InkWeave
//! diagram surface. Rendering, input plumbing and transport live elsewhere.

pub mod binding;
pub mod element;
pub mod frame;
pub mod geometry;
pub mod groups;
pub mod library;
pub mod linear_editor;
pub mod random;
pub mod restore;
pub mod scene;
pub mod selection;
pub mod state;

pub use binding::{BindingChange, Endpoint, bind_or_unbind_linear_element, repair_relations};
pub use element::{
    BoundElement, BoundElementType, Element, ElementId, ElementKind, ElementLookup, ElementType,
    GroupId, PointBinding, Roundness, RoundnessType,
};
pub use geometry::{DefaultShapeGenerator, ShapeGenerator};
pub use library::{LibraryError, LibraryItem, LibraryItemStatus, merge_library_items};
pub use linear_editor::{LinearElementEditor, PointUpdate};
pub use random::Random;
pub use restore::{RestoreError, RestoreOptions, restore_elements};
pub use scene::{Scene, hash_elements_version, reconcile_elements};
pub use state::{EditorState, SelectionState};
