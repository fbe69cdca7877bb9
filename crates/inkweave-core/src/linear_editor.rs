//! Interactive editing of a single line or arrow.
//!
//! The editor is a small state machine driven by pointer events:
//!
//! ```text
//! idle ──pointer_down on a point──▶ pressed ──pointer_drag──▶ dragging
//!   ▲                                  │                         │
//!   └──────────────pointer_up──────────┴─────────────────────────┘
//! ```
//!
//! Pressing on a segment midpoint and dragging past [`DRAGGING_THRESHOLD`]
//! inserts a real point there, which is then dragged like any other.

use crate::binding::{BindingChange, bind_or_unbind_linear_element, get_hovered_element_for_binding};
use crate::element::linear::{
    POINT_HANDLE_SIZE, is_segment_too_short, normalize_in_place, point_at_index_global_coordinates,
    point_global_coordinates, points_coords, points_global_coordinates, refresh_dimensions,
    segment_mid_point,
};
use crate::element::{
    Element, ElementId, ElementLookup, absolute_coords_with, get_bound_text_element,
    get_locked_linear_cursor_align_size,
};
use crate::geometry::{
    DefaultShapeGenerator, ShapeGenerator, are_points_equal, distance, get_grid_point,
    is_path_a_loop, rotate, rotate_point,
};
use crate::scene::Scene;
use crate::state::EditorState;
use kurbo::{Point, Vec2};
use std::sync::{Arc, RwLock};

/// Pointer travel (screen pixels) before pressing a midpoint turns into
/// inserting a point.
pub const DRAGGING_THRESHOLD: f64 = 10.0;

/// How far a point duplicated at the end of a line is pushed out.
pub const DUPLICATE_END_OFFSET: f64 = 30.0;

/// New position for the point at `index`, in local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointUpdate {
    pub index: usize,
    pub point: Point,
}

/// Midpoint pressed at pointer down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentMidpointState {
    /// Scene position of the midpoint handle.
    pub value: Option<Point>,
    /// Index the inserted point will get (the segment's end index).
    pub index: Option<usize>,
    /// Whether the point has been inserted already.
    pub added: bool,
}

/// Snapshot taken at pointer down, dropped again at pointer up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerDownState {
    pub prev_selected_points_indices: Option<Vec<usize>>,
    pub last_clicked_point: Option<usize>,
    /// Scene position of the pointer down.
    pub origin: Option<Point>,
    pub segment_midpoint: SegmentMidpointState,
}

#[derive(Debug, Clone, PartialEq)]
struct MidpointCache {
    element_id: ElementId,
    version: u64,
    zoom: f64,
    points: Vec<Option<Point>>,
}

/// Editing session of one line or arrow.
#[derive(Debug)]
pub struct LinearElementEditor {
    pub element_id: ElementId,
    /// Whether the element is in full point-editing mode, as opposed to only
    /// being selected (where just the midpoints of short lines are offered).
    pub editing: bool,
    pub selected_points_indices: Option<Vec<usize>>,
    pub pointer_down_state: PointerDownState,
    /// Whether points are being dragged.
    pub is_dragging: bool,
    /// Pointer position relative to the pressed point.
    pub pointer_offset: Vec2,
    /// Binding decided for the start point at the last pointer up.
    pub start_binding_element: BindingChange,
    pub end_binding_element: BindingChange,
    pub hover_point_index: Option<usize>,
    pub segment_mid_point_hovered_coords: Option<Point>,
    generator: Arc<dyn ShapeGenerator>,
    midpoints: RwLock<Option<MidpointCache>>,
}

impl Clone for LinearElementEditor {
    fn clone(&self) -> Self {
        Self {
            element_id: self.element_id.clone(),
            editing: self.editing,
            selected_points_indices: self.selected_points_indices.clone(),
            pointer_down_state: self.pointer_down_state.clone(),
            is_dragging: self.is_dragging,
            pointer_offset: self.pointer_offset,
            start_binding_element: self.start_binding_element.clone(),
            end_binding_element: self.end_binding_element.clone(),
            hover_point_index: self.hover_point_index,
            segment_mid_point_hovered_coords: self.segment_mid_point_hovered_coords,
            generator: Arc::clone(&self.generator),
            midpoints: RwLock::new(self.midpoints.read().ok().and_then(|guard| (*guard).clone())),
        }
    }
}

impl LinearElementEditor {
    /// Start editing a line or arrow of `scene`. The element's points are
    /// normalized first. `None` if there is no such non-deleted element.
    pub fn new(scene: &mut Scene, element_id: &str) -> Option<Self> {
        Self::with_generator(scene, element_id, Arc::new(DefaultShapeGenerator::default()))
    }

    /// [`LinearElementEditor::new`] with a custom curve generator.
    pub fn with_generator(
        scene: &mut Scene,
        element_id: &str,
        generator: Arc<dyn ShapeGenerator>,
    ) -> Option<Self> {
        let element = scene.get_non_deleted(element_id).filter(|el| el.is_linear())?;
        let needs_normalizing = element
            .points()
            .and_then(|p| p.first())
            .is_some_and(|first| *first != Point::ZERO);
        if needs_normalizing {
            scene.mutate(element_id, normalize_in_place);
        }
        Some(Self {
            element_id: element_id.to_string(),
            editing: false,
            selected_points_indices: None,
            pointer_down_state: PointerDownState::default(),
            is_dragging: false,
            pointer_offset: Vec2::ZERO,
            start_binding_element: BindingChange::Keep,
            end_binding_element: BindingChange::Keep,
            hover_point_index: None,
            segment_mid_point_hovered_coords: None,
            generator,
            midpoints: RwLock::new(None),
        })
    }

    pub fn generator(&self) -> &dyn ShapeGenerator {
        &*self.generator
    }

    /// The edited element, unless it was deleted in the meantime.
    pub fn element<'a>(&self, scene: &'a Scene) -> Option<&'a Element> {
        scene
            .get_non_deleted(&self.element_id)
            .filter(|el| el.is_linear())
    }

    // Element-mutating operations. Each one bumps the element's version.

    /// Move points to new local positions.
    ///
    /// Point 0 never leaves the origin: when it is among the targets, the
    /// other points shift the opposite way and the element's position
    /// absorbs the move.
    pub fn move_points(&self, scene: &mut Scene, targets: &[PointUpdate]) {
        let generator = Arc::clone(&self.generator);
        scene.mutate(&self.element_id, |el| apply_move_points(el, targets, &*generator));
    }

    /// Append points.
    pub fn add_points(&self, scene: &mut Scene, points: &[Point]) {
        let generator = Arc::clone(&self.generator);
        scene.mutate(&self.element_id, |el| {
            let mut next = el.points().map(<[Point]>::to_vec).unwrap_or_default();
            next.extend_from_slice(points);
            update_points(el, next, Vec2::ZERO, &*generator);
        });
    }

    /// Remove points. Removing point 0 makes the first remaining point the
    /// new origin.
    pub fn delete_points(&self, scene: &mut Scene, indices: &[usize]) {
        let generator = Arc::clone(&self.generator);
        scene.mutate(&self.element_id, |el| apply_delete_points(el, indices, &*generator));
    }

    /// Insert a point after every selected point, halfway to the next one.
    /// A point after the last one is pushed out by [`DUPLICATE_END_OFFSET`]
    /// so that it does not sit on top of its original. The new points become
    /// the selection. Returns false when there is nothing to duplicate.
    pub fn duplicate_selected_points(&mut self, scene: &mut Scene) -> bool {
        let Some(selected) = self.selected_points_indices.clone() else {
            return false;
        };
        let Some(points) = self.element(scene).and_then(Element::points).map(<[Point]>::to_vec)
        else {
            return false;
        };

        let mut next_points = Vec::with_capacity(points.len() + selected.len());
        let mut next_selected = Vec::new();
        let mut added_to_end = false;
        for (index, &point) in points.iter().enumerate() {
            next_points.push(point);
            if selected.contains(&index) {
                let duplicate = match points.get(index + 1) {
                    Some(&next) => point.midpoint(next),
                    None => {
                        added_to_end = true;
                        point
                    }
                };
                next_points.push(duplicate);
                next_selected.push(next_points.len() - 1);
            }
        }

        scene.mutate(&self.element_id, |el| {
            if let Some(target) = el.points_mut() {
                *target = next_points;
            }
            refresh_dimensions(el);
        });

        let end = self
            .element(scene)
            .and_then(Element::points)
            .and_then(|p| p.last().map(|&last| (p.len() - 1, last)));
        if let (true, Some((index, last))) = (added_to_end, end) {
            let offset = Vec2::new(DUPLICATE_END_OFFSET, DUPLICATE_END_OFFSET);
            self.move_points(scene, &[PointUpdate { index, point: last + offset }]);
        }

        self.selected_points_indices = Some(next_selected);
        true
    }

    // Geometry queries.

    /// Index of the topmost point handle under `pointer` (scene coords).
    pub fn point_index_under_cursor(&self, element: &Element, zoom: f64, pointer: Point) -> Option<usize> {
        points_global_coordinates(element, self.generator())
            .iter()
            .rposition(|&p| distance(pointer, p) * zoom < POINT_HANDLE_SIZE + 1.0)
    }

    /// Local point under a scene position, snapped to the grid if one is given.
    pub fn create_point_at(&self, element: &Element, pointer: Point, grid_size: Option<f64>) -> Point {
        let on_grid = get_grid_point(pointer.x, pointer.y, grid_size);
        let center = absolute_coords_with(element, self.generator()).center();
        let (x, y) = rotate(on_grid.x, on_grid.y, center.x, center.y, -element.angle);
        Point::new(x - element.x, y - element.y)
    }

    /// One midpoint handle per segment, `None` for segments too short to
    /// host one at this zoom.
    ///
    /// Outside of full editing, only two-point lines and labelled lines get
    /// midpoints. Results are cached until the element's version or the
    /// zoom changes.
    pub fn editor_mid_points<L: ElementLookup + ?Sized>(
        &self,
        element: &Element,
        elements: &L,
        zoom: f64,
    ) -> Vec<Option<Point>> {
        let point_count = element.points().map_or(0, <[Point]>::len);
        if !self.editing && point_count > 2 && get_bound_text_element(element, elements).is_none() {
            return Vec::new();
        }

        if let Some(cached) = self.midpoints.read().ok().and_then(|guard| {
            guard
                .as_ref()
                .filter(|c| c.element_id == element.id && c.version == element.version && c.zoom == zoom)
                .map(|c| c.points.clone())
        }) {
            return cached;
        }

        log::trace!("recomputing midpoints of {} (v{}, zoom {zoom})", element.id, element.version);
        let points = compute_mid_points(element, zoom, self.generator());
        if let Ok(mut cache) = self.midpoints.write() {
            *cache = Some(MidpointCache {
                element_id: element.id.clone(),
                version: element.version,
                zoom,
                points: points.clone(),
            });
        }
        points
    }

    /// Midpoint handle under `pointer`, if no point handle is there.
    pub fn segment_midpoint_hit_coords(&self, scene: &Scene, zoom: f64, pointer: Point) -> Option<Point> {
        let element = self.element(scene)?;
        if self.point_index_under_cursor(element, zoom, pointer).is_some() {
            return None;
        }
        if element.points().map_or(0, <[Point]>::len) >= 3 && !self.editing {
            return None;
        }

        let threshold = POINT_HANDLE_SIZE / zoom;
        if let Some(hovered) = self.segment_mid_point_hovered_coords {
            if distance(hovered, pointer) <= threshold {
                return Some(hovered);
            }
        }
        self.editor_mid_points(element, scene, zoom)
            .into_iter()
            .flatten()
            .find(|&mid| distance(mid, pointer) <= threshold)
    }

    /// Index at which a point inserted at `midpoint` lands.
    pub fn segment_mid_point_index(&self, scene: &Scene, zoom: f64, midpoint: Point) -> Option<usize> {
        let element = self.element(scene)?;
        self.editor_mid_points(element, scene, zoom)
            .iter()
            .position(|m| m.is_some_and(|m| are_points_equal(m, midpoint)))
            .map(|i| i + 1)
    }

    // Pointer handling.

    /// Track which handle the pointer is over.
    pub fn handle_hover(&mut self, scene: &Scene, zoom: f64, pointer: Point) {
        let Some(element) = self.element(scene) else {
            return;
        };
        self.hover_point_index = self.point_index_under_cursor(element, zoom, pointer);
        self.segment_mid_point_hovered_coords = if self.hover_point_index.is_some() {
            None
        } else {
            self.segment_midpoint_hit_coords(scene, zoom, pointer)
        };
    }

    /// Press at `pointer`. Returns whether a point or midpoint was hit.
    pub fn pointer_down(&mut self, scene: &Scene, state: &EditorState, pointer: Point, shift: bool) -> bool {
        let Some(element) = self.element(scene) else {
            return false;
        };
        let zoom = state.zoom;
        let midpoint = self.segment_midpoint_hit_coords(scene, zoom, pointer);
        let midpoint_index = midpoint.and_then(|m| self.segment_mid_point_index(scene, zoom, m));
        let clicked = self.point_index_under_cursor(element, zoom, pointer);

        self.pointer_down_state = PointerDownState {
            prev_selected_points_indices: self.selected_points_indices.clone(),
            last_clicked_point: clicked,
            origin: Some(pointer),
            segment_midpoint: SegmentMidpointState {
                value: midpoint,
                index: midpoint_index,
                added: false,
            },
        };
        self.is_dragging = false;

        self.pointer_offset = match clicked {
            Some(index) => {
                let target = point_at_index_global_coordinates(element, index as isize, self.generator());
                pointer - target
            }
            None => Vec2::ZERO,
        };

        self.selected_points_indices = match clicked {
            Some(index) => {
                let already = self
                    .selected_points_indices
                    .as_ref()
                    .is_some_and(|s| s.contains(&index));
                if shift || already {
                    let mut next = self.selected_points_indices.clone().unwrap_or_default();
                    next.push(index);
                    normalize_selected_points(next)
                } else {
                    Some(vec![index])
                }
            }
            None if shift => self
                .selected_points_indices
                .clone()
                .and_then(normalize_selected_points),
            None => None,
        };

        clicked.is_some() || midpoint.is_some()
    }

    /// Whether the pressed midpoint should now turn into a real point.
    pub fn should_add_midpoint(&self, scene: &Scene, state: &EditorState, pointer: Point) -> bool {
        if self.element(scene).is_none() {
            return false;
        }
        let mid = &self.pointer_down_state.segment_midpoint;
        if mid.added || mid.value.is_none() || mid.index.is_none() {
            return false;
        }
        let Some(origin) = self.pointer_down_state.origin else {
            return false;
        };
        self.editing || distance(origin, pointer) >= DRAGGING_THRESHOLD / state.zoom
    }

    /// Insert the pressed midpoint as a real point under `pointer` and
    /// select it.
    pub fn add_midpoint(&mut self, scene: &mut Scene, state: &EditorState, pointer: Point, snap_to_grid: bool) {
        let Some(index) = self.pointer_down_state.segment_midpoint.index else {
            return;
        };
        let Some(element) = self.element(scene) else {
            return;
        };
        let midpoint = self.create_point_at(element, pointer, state.snap_grid(snap_to_grid));
        scene.mutate(&self.element_id, |el| {
            if let Some(points) = el.points_mut() {
                let at = index.min(points.len());
                points.insert(at, midpoint);
            }
            refresh_dimensions(el);
        });

        self.pointer_down_state.segment_midpoint.added = true;
        self.pointer_down_state.last_clicked_point = Some(index);
        self.selected_points_indices = Some(vec![index]);
    }

    /// Drag the selected points so that the pressed one follows `pointer`.
    /// With `shift`, a single point is locked to 15 degree steps around its
    /// neighbour. Returns whether anything was dragged.
    pub fn pointer_drag(
        &mut self,
        scene: &mut Scene,
        state: &EditorState,
        pointer: Point,
        shift: bool,
        snap_to_grid: bool,
    ) -> bool {
        if self.should_add_midpoint(scene, state, pointer) {
            self.add_midpoint(scene, state, pointer, snap_to_grid);
        }
        let Some(selected) = self.selected_points_indices.clone().filter(|s| !s.is_empty()) else {
            return false;
        };
        let Some(element) = self.element(scene) else {
            return false;
        };
        let points = element.points().map(<[Point]>::to_vec).unwrap_or_default();
        let grid = state.snap_grid(snap_to_grid);
        let Some(clicked) = self.pointer_down_state.last_clicked_point else {
            return false;
        };
        let Some(&clicked_point) = points.get(clicked) else {
            return false;
        };

        let targets = if shift && selected.len() == 1 && points.len() > 1 {
            let index = selected[0];
            let reference_index = if index == 0 { 1 } else { index - 1 };
            let Some(&reference) = points.get(reference_index) else {
                return false;
            };
            let delta = self.shift_locked_delta(element, reference, pointer, grid);
            vec![PointUpdate { index, point: reference + delta }]
        } else {
            let dragged_to = self.create_point_at(element, pointer - self.pointer_offset, grid);
            let delta = dragged_to - clicked_point;
            selected
                .iter()
                .filter_map(|&index| {
                    let point = if index == clicked { dragged_to } else { *points.get(index)? + delta };
                    Some(PointUpdate { index, point })
                })
                .collect()
        };

        self.move_points(scene, &targets);
        self.is_dragging = true;
        true
    }

    /// Release the pointer.
    ///
    /// A dragged endpoint that lands on the other end closes the path. When
    /// binding is enabled, dragged endpoints bind to the shape under them
    /// (or unbind when there is none).
    pub fn pointer_up(&mut self, scene: &mut Scene, state: &EditorState, shift: bool) {
        let Some(element) = self.element(scene) else {
            return;
        };
        let point_count = element.points().map_or(0, <[Point]>::len);

        if self.is_dragging {
            let mut start = BindingChange::Keep;
            let mut end = BindingChange::Keep;
            let endpoints: Vec<usize> = self
                .selected_points_indices
                .iter()
                .flatten()
                .copied()
                .filter(|&i| point_count > 0 && (i == 0 || i == point_count - 1))
                .collect();

            for index in endpoints {
                self.snap_loop(scene, state.zoom, index);
                if !state.is_binding_enabled {
                    continue;
                }
                let Some(element) = self.element(scene) else {
                    return;
                };
                let at = point_at_index_global_coordinates(element, index as isize, self.generator());
                let change = match get_hovered_element_for_binding(
                    at,
                    scene.non_deleted_elements(),
                    Some(self.element_id.as_str()),
                ) {
                    Some(target) => BindingChange::Bind(target.id.clone()),
                    None => BindingChange::Unbind,
                };
                if index == 0 {
                    start = change;
                } else {
                    end = change;
                }
            }
            self.start_binding_element = start.clone();
            self.end_binding_element = end.clone();
            bind_or_unbind_linear_element(scene, &self.element_id, start, end);
        }

        let clicked = self.pointer_down_state.last_clicked_point;
        let was_selected = clicked.is_some_and(|c| {
            self.pointer_down_state
                .prev_selected_points_indices
                .as_ref()
                .is_some_and(|prev| prev.contains(&c))
        });
        self.selected_points_indices = if self.is_dragging || shift {
            match (self.selected_points_indices.take(), clicked) {
                (Some(selected), Some(c)) if !self.is_dragging && shift && was_selected => {
                    Some(selected.into_iter().filter(|&i| i != c).collect())
                }
                (selected, _) => selected,
            }
        } else {
            match (self.selected_points_indices.take(), clicked) {
                (Some(selected), Some(c)) if selected.contains(&c) => Some(vec![c]),
                (selected, _) => selected,
            }
        };

        self.is_dragging = false;
        self.pointer_offset = Vec2::ZERO;
        self.pointer_down_state = PointerDownState::default();
    }

    /// Snap a dragged endpoint onto the other end when they (almost) meet.
    fn snap_loop(&self, scene: &mut Scene, zoom: f64, index: usize) {
        let Some(points) = self.element(scene).and_then(Element::points) else {
            return;
        };
        if !is_path_a_loop(points, zoom) {
            return;
        }
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            return;
        };
        let target = if index == 0 { last } else { first };
        self.move_points(scene, &[PointUpdate { index, point: target }]);
    }

    /// Local offset from `reference` to the shift-locked pointer position.
    fn shift_locked_delta(&self, element: &Element, reference: Point, pointer: Point, grid: Option<f64>) -> Vec2 {
        let reference_global = point_global_coordinates(element, reference, self.generator());
        let on_grid = get_grid_point(pointer.x, pointer.y, grid);
        let size = get_locked_linear_cursor_align_size(reference_global, on_grid);
        rotate_point(size.to_point(), Point::ZERO, -element.angle).to_vec2()
    }
}

/// Sort and dedupe selected point indices; an empty selection is no selection.
fn normalize_selected_points(mut indices: Vec<usize>) -> Option<Vec<usize>> {
    indices.sort_unstable();
    indices.dedup();
    (!indices.is_empty()).then_some(indices)
}

/// Midpoint handles of every segment, uncached.
pub(crate) fn compute_mid_points(element: &Element, zoom: f64, generator: &dyn ShapeGenerator) -> Vec<Option<Point>> {
    let local = element.points().unwrap_or_default();
    let global = points_global_coordinates(element, generator);
    (1..local.len())
        .map(|end| {
            if is_segment_too_short(element, local[end - 1], local[end], end, zoom, generator) {
                None
            } else {
                Some(segment_mid_point(element, global[end - 1], global[end], end, generator))
            }
        })
        .collect()
}

/// Replace the points, compensating `x`/`y` for `offset` (the move of point
/// 0) and for the shift of the rotation center.
fn update_points(element: &mut Element, next: Vec<Point>, offset: Vec2, generator: &dyn ShapeGenerator) {
    let prev = element.points().map(<[Point]>::to_vec).unwrap_or_default();
    let prev_center = points_coords(element, &prev, generator).center();
    let next_center = points_coords(element, &next, generator).center();
    let d = prev_center - next_center;
    let (dx, dy) = rotate(offset.x, offset.y, d.x, d.y, element.angle);

    if let Some(points) = element.points_mut() {
        *points = next;
    }
    element.x += dx;
    element.y += dy;
    refresh_dimensions(element);
}

fn apply_move_points(element: &mut Element, targets: &[PointUpdate], generator: &dyn ShapeGenerator) {
    let Some(points) = element.points().map(<[Point]>::to_vec) else {
        return;
    };
    debug_assert!(
        targets.iter().all(|t| t.index < points.len()),
        "point index out of range: {targets:?} for {} points",
        points.len()
    );

    let origin_target = targets.iter().find(|t| t.index == 0 && !points.is_empty());
    let offset = origin_target.map_or(Vec2::ZERO, |t| t.point.to_vec2() + points[0].to_vec2());

    let next: Vec<Point> = points
        .iter()
        .enumerate()
        .map(|(index, &point)| match targets.iter().find(|t| t.index == index) {
            Some(_) if origin_target.is_some() => point,
            Some(target) => point + (target.point - points[index]),
            None if offset != Vec2::ZERO => point - offset,
            None => point,
        })
        .collect();

    update_points(element, next, offset, generator);
}

fn apply_delete_points(element: &mut Element, indices: &[usize], generator: &dyn ShapeGenerator) {
    let Some(points) = element.points().map(<[Point]>::to_vec) else {
        return;
    };
    debug_assert!(
        indices.iter().all(|&i| i < points.len()),
        "point index out of range: {indices:?} for {} points",
        points.len()
    );

    let offset = if indices.contains(&0) {
        points
            .iter()
            .enumerate()
            .find(|(i, _)| !indices.contains(i))
            .map_or(Vec2::ZERO, |(_, p)| p.to_vec2())
    } else {
        Vec2::ZERO
    };

    let mut next = Vec::with_capacity(points.len());
    for (index, &point) in points.iter().enumerate() {
        if indices.contains(&index) {
            continue;
        }
        next.push(if next.is_empty() { Point::ZERO } else { point - offset });
    }

    update_points(element, next, offset, generator);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Random;
    use crate::element::{ElementType, Roundness, RoundnessType};
    use proptest::prelude::*;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-6
    }

    fn line_scene(x: f64, y: f64, points: Vec<Point>) -> (Scene, ElementId) {
        let mut rng = Random::new(1);
        let line = Element::new_linear(ElementType::Line, x, y, points, &mut rng);
        let id = line.id.clone();
        (Scene::from_elements([line], Random::new(2)), id)
    }

    fn points(scene: &Scene, id: &str) -> Vec<Point> {
        scene.get(id).unwrap().points().unwrap().to_vec()
    }

    #[test]
    fn test_new_normalizes_points() {
        let mut rng = Random::new(3);
        let mut line = Element::new(ElementType::Line, 10.0, 10.0, 0.0, 0.0, &mut rng);
        *line.points_mut().unwrap() = vec![Point::new(5.0, 5.0), Point::new(15.0, 5.0)];
        let id = line.id.clone();
        let mut scene = Scene::from_elements([line], Random::new(4));

        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let el = scene.get(&editor.element_id).unwrap();
        assert_eq!(el.points().unwrap()[0], Point::ZERO);
        assert_eq!((el.x, el.y), (15.0, 15.0));
        assert_eq!(el.version, 2);
    }

    #[test]
    fn test_rejects_non_linear() {
        let mut rng = Random::new(3);
        let rect = Element::new(ElementType::Rectangle, 0.0, 0.0, 10.0, 10.0, &mut rng);
        let id = rect.id.clone();
        let mut scene = Scene::from_elements([rect], Random::new(4));
        assert!(LinearElementEditor::new(&mut scene, &id).is_none());
        assert!(LinearElementEditor::new(&mut scene, "missing").is_none());
    }

    #[test]
    fn test_delete_origin_point_rebases() {
        let (mut scene, id) = line_scene(
            100.0,
            100.0,
            vec![Point::ZERO, Point::new(10.0, 0.0), Point::new(20.0, 10.0)],
        );
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        editor.delete_points(&mut scene, &[0]);

        let el = scene.get(&id).unwrap();
        assert_eq!(points(&scene, &id), vec![Point::ZERO, Point::new(10.0, 10.0)]);
        assert!(close(Point::new(el.x, el.y), Point::new(110.0, 100.0)));
    }

    #[test]
    fn test_delete_origin_point_on_rotated_line_keeps_globals() {
        let (mut scene, id) = line_scene(
            100.0,
            100.0,
            vec![Point::ZERO, Point::new(30.0, 10.0), Point::new(60.0, 40.0)],
        );
        scene.mutate(&id, |el| el.angle = 0.7);
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let before = points_global_coordinates(scene.get(&id).unwrap(), editor.generator());

        editor.delete_points(&mut scene, &[0]);

        let after = points_global_coordinates(scene.get(&id).unwrap(), editor.generator());
        assert_eq!(after.len(), 2);
        assert!(close(after[0], before[1]));
        assert!(close(after[1], before[2]));
        assert_eq!(points(&scene, &id)[0], Point::ZERO);
    }

    #[test]
    fn test_move_origin_keeps_other_points_in_place() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(10.0, 0.0)]);
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        editor.move_points(&mut scene, &[PointUpdate { index: 0, point: Point::new(5.0, 5.0) }]);

        let el = scene.get(&id).unwrap();
        assert_eq!(points(&scene, &id), vec![Point::ZERO, Point::new(5.0, -5.0)]);
        assert!(close(Point::new(el.x, el.y), Point::new(5.0, 5.0)));
        let far_end = point_at_index_global_coordinates(el, -1, editor.generator());
        assert!(close(far_end, Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_move_other_point() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(10.0, 0.0)]);
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let before = scene.get(&id).unwrap().version;
        editor.move_points(&mut scene, &[PointUpdate { index: 1, point: Point::new(10.0, 10.0) }]);
        let el = scene.get(&id).unwrap();
        assert_eq!(points(&scene, &id)[1], Point::new(10.0, 10.0));
        assert_eq!((el.x, el.y, el.height), (0.0, 0.0, 10.0));
        assert_eq!(el.version, before + 1);
    }

    #[test]
    fn test_add_points() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(10.0, 0.0)]);
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        editor.add_points(&mut scene, &[Point::new(10.0, 10.0)]);
        assert_eq!(points(&scene, &id).len(), 3);
        assert_eq!(scene.get(&id).unwrap().x, 0.0);
    }

    #[test]
    fn test_duplicate_selected_points() {
        let (mut scene, id) = line_scene(
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(10.0, 0.0), Point::new(20.0, 0.0)],
        );
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        assert!(!editor.duplicate_selected_points(&mut scene));

        editor.selected_points_indices = Some(vec![0, 2]);
        assert!(editor.duplicate_selected_points(&mut scene));
        assert_eq!(
            points(&scene, &id),
            vec![
                Point::ZERO,
                Point::new(5.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(20.0, 0.0),
                Point::new(50.0, 30.0),
            ]
        );
        assert_eq!(editor.selected_points_indices, Some(vec![1, 4]));
    }

    #[test]
    fn test_drag_endpoint() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(100.0, 0.0)]);
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let state = EditorState::default();

        assert!(editor.pointer_down(&scene, &state, Point::new(100.0, 1.0), false));
        assert_eq!(editor.selected_points_indices, Some(vec![1]));
        assert_eq!(editor.pointer_offset, Vec2::new(0.0, 1.0));

        assert!(editor.pointer_drag(&mut scene, &state, Point::new(150.0, 51.0), false, false));
        assert!(editor.is_dragging);
        editor.pointer_up(&mut scene, &state, false);

        assert!(!editor.is_dragging);
        assert_eq!(editor.selected_points_indices, Some(vec![1]));
        assert!(close(points(&scene, &id)[1], Point::new(150.0, 50.0)));
    }

    #[test]
    fn test_shift_click_toggles_point() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(100.0, 0.0)]);
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let state = EditorState::default();

        editor.pointer_down(&scene, &state, Point::ZERO, false);
        editor.pointer_up(&mut scene, &state, false);
        editor.pointer_down(&scene, &state, Point::new(100.0, 0.0), true);
        editor.pointer_up(&mut scene, &state, true);
        assert_eq!(editor.selected_points_indices, Some(vec![0, 1]));

        editor.pointer_down(&scene, &state, Point::ZERO, true);
        editor.pointer_up(&mut scene, &state, true);
        assert_eq!(editor.selected_points_indices, Some(vec![1]));

        // plain click on empty canvas clears the selection
        editor.pointer_down(&scene, &state, Point::new(50.0, 80.0), false);
        editor.pointer_up(&mut scene, &state, false);
        assert_eq!(editor.selected_points_indices, None);
    }

    #[test]
    fn test_shift_drag_locks_angle() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(100.0, 0.0)]);
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let state = EditorState::default();
        editor.pointer_down(&scene, &state, Point::new(100.0, 0.0), false);
        editor.pointer_drag(&mut scene, &state, Point::new(100.0, 3.0), true, false);
        let end = points(&scene, &id)[1];
        assert!(end.y.abs() < 1e-9);
        assert!((end.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_endpoint_snaps_to_close_loop() {
        let (mut scene, id) = line_scene(
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(100.0, 0.0), Point::new(100.0, 100.0), Point::new(3.0, 4.0)],
        );
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        editor.selected_points_indices = Some(vec![3]);
        editor.is_dragging = true;
        editor.pointer_up(&mut scene, &EditorState::default(), false);
        assert_eq!(points(&scene, &id)[3], Point::ZERO);
    }

    #[test]
    fn test_dragged_endpoint_binds() {
        let mut rng = Random::new(5);
        let target = Element::new(ElementType::Rectangle, 200.0, -50.0, 100.0, 100.0, &mut rng);
        let arrow = Element::new_linear(
            ElementType::Arrow,
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(100.0, 0.0)],
            &mut rng,
        );
        let arrow_id = arrow.id.clone();
        let mut scene = Scene::from_elements([target.clone(), arrow], Random::new(6));
        let mut editor = LinearElementEditor::new(&mut scene, &arrow_id).unwrap();
        let state = EditorState::default();

        editor.pointer_down(&scene, &state, Point::new(100.0, 0.0), false);
        editor.pointer_drag(&mut scene, &state, Point::new(195.0, 0.0), false, false);
        editor.pointer_up(&mut scene, &state, false);

        let binding = scene.get(&arrow_id).unwrap().linear_data().unwrap().end_binding.clone();
        assert_eq!(binding.map(|b| b.element_id), Some(target.id.clone()));
        assert_eq!(editor.end_binding_element, BindingChange::Bind(target.id.clone()));
        assert_eq!(editor.start_binding_element, BindingChange::Keep);
    }

    #[test]
    fn test_binding_disabled_keeps_bindings() {
        let mut rng = Random::new(5);
        let target = Element::new(ElementType::Rectangle, 200.0, -50.0, 100.0, 100.0, &mut rng);
        let arrow = Element::new_linear(
            ElementType::Arrow,
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(100.0, 0.0)],
            &mut rng,
        );
        let arrow_id = arrow.id.clone();
        let mut scene = Scene::from_elements([target, arrow], Random::new(6));
        let mut editor = LinearElementEditor::new(&mut scene, &arrow_id).unwrap();
        let state = EditorState { is_binding_enabled: false, ..Default::default() };

        editor.pointer_down(&scene, &state, Point::new(100.0, 0.0), false);
        editor.pointer_drag(&mut scene, &state, Point::new(195.0, 0.0), false, false);
        editor.pointer_up(&mut scene, &state, false);
        assert!(scene.get(&arrow_id).unwrap().linear_data().unwrap().end_binding.is_none());
        assert_eq!(editor.end_binding_element, BindingChange::Keep);
    }

    #[test]
    fn test_drag_midpoint_inserts_point() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(100.0, 0.0)]);
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let state = EditorState::default();

        editor.handle_hover(&scene, 1.0, Point::new(50.0, 2.0));
        assert_eq!(editor.segment_mid_point_hovered_coords, Some(Point::new(50.0, 0.0)));

        assert!(editor.pointer_down(&scene, &state, Point::new(50.0, 0.0), false));
        assert_eq!(editor.pointer_down_state.segment_midpoint.index, Some(1));
        // below the threshold nothing happens yet
        assert!(!editor.should_add_midpoint(&scene, &state, Point::new(52.0, 0.0)));

        editor.pointer_drag(&mut scene, &state, Point::new(50.0, 30.0), false, false);
        assert_eq!(points(&scene, &id), vec![Point::ZERO, Point::new(50.0, 30.0), Point::new(100.0, 0.0)]);
        assert_eq!(editor.selected_points_indices, Some(vec![1]));
        assert!(editor.pointer_down_state.segment_midpoint.added);
    }

    #[test]
    fn test_short_segments_have_no_midpoint() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(20.0, 0.0)]);
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let el = scene.get(&id).unwrap();
        assert_eq!(editor.editor_mid_points(el, &scene, 1.0), vec![None]);
        assert_eq!(editor.editor_mid_points(el, &scene, 3.0), vec![Some(Point::new(10.0, 0.0))]);
    }

    #[test]
    fn test_long_lines_need_editing_mode() {
        let (mut scene, id) = line_scene(
            0.0,
            0.0,
            vec![Point::ZERO, Point::new(100.0, 0.0), Point::new(200.0, 0.0)],
        );
        let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let el = scene.get(&id).unwrap().clone();
        assert!(editor.editor_mid_points(&el, &scene, 1.0).is_empty());
        editor.editing = true;
        assert_eq!(editor.editor_mid_points(&el, &scene, 1.0).len(), 2);
    }

    #[test]
    fn test_clone_keeps_cache() {
        let (mut scene, id) = line_scene(0.0, 0.0, vec![Point::ZERO, Point::new(100.0, 0.0)]);
        let editor = LinearElementEditor::new(&mut scene, &id).unwrap();
        let el = scene.get(&id).unwrap();
        let mids = editor.editor_mid_points(el, &scene, 1.0);
        let copy = editor.clone();
        assert_eq!(copy.editor_mid_points(el, &scene, 1.0), mids);
    }

    proptest! {
        #[test]
        fn prop_midpoint_cache_matches_fresh_computation(
            raw in proptest::collection::vec((-200.0f64..200.0, -200.0f64..200.0), 2..6),
            zoom in 0.25f64..4.0,
            rounded in any::<bool>(),
            moved in (-50.0f64..50.0, -50.0f64..50.0),
        ) {
            let pts: Vec<Point> = raw.iter().map(|&(x, y)| Point::new(x, y)).collect();
            let mut rng = Random::new(9);
            let mut line = Element::new_linear(ElementType::Line, 0.0, 0.0, pts, &mut rng);
            if rounded {
                line.roundness = Some(Roundness::new(RoundnessType::ProportionalRadius));
            }
            let id = line.id.clone();
            let mut scene = Scene::from_elements([line], Random::new(10));
            let mut editor = LinearElementEditor::new(&mut scene, &id).unwrap();
            editor.editing = true;

            let el = scene.get(&id).unwrap().clone();
            let fresh = compute_mid_points(&el, zoom, editor.generator());
            prop_assert_eq!(&editor.editor_mid_points(&el, &scene, zoom), &fresh);
            prop_assert_eq!(&editor.editor_mid_points(&el, &scene, zoom), &fresh);

            let last = el.points().unwrap().len() - 1;
            let target = el.points().unwrap()[last] + Vec2::new(moved.0, moved.1);
            editor.move_points(&mut scene, &[PointUpdate { index: last, point: target }]);
            let el = scene.get(&id).unwrap().clone();
            let fresh = compute_mid_points(&el, zoom, editor.generator());
            prop_assert_eq!(editor.editor_mid_points(&el, &scene, zoom), fresh);
        }
    }
}
