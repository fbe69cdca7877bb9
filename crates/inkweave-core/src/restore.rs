//! Turning untrusted element data into canonical elements.
//!
//! Input may come from disk, an import or an older version of the format.
//! Everything is read field by field out of a [`serde_json::Value`]; missing
//! or malformed fields get defaults instead of failing the whole load.
//! Elements of unknown type are dropped.

use crate::Random;
use crate::binding::repair_relations;
use crate::element::linear::{normalize_in_place, refresh_dimensions};
use crate::element::{
    Arrowhead, BoundElement, DEFAULT_BACKGROUND_COLOR, DEFAULT_FONT_SIZE, DEFAULT_OPACITY,
    DEFAULT_ROUGHNESS, DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH, Element, ElementKind,
    ElementType, FillStyle, FontFamily, FrameData, FreedrawData, ImageData, ImageStatus, LinearData,
    PointBinding, Roundness, RoundnessType, StrokeStyle, TextAlign, TextData, VerticalAlign,
    bump_version, default_line_height, detect_line_height, get_normalized_dimensions,
    measure_baseline, now_ms, parse_font_string,
};
use crate::library::{LibraryItem, LibraryItemStatus};
use kurbo::Point;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Failures of a restore. Problems with single elements are never errors.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected an array of elements")]
    NotAnElementArray,
    #[error("Expected a scene object")]
    NotAScene,
}

/// Options of [`restore_elements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Run the binding/frame/label repair over the restored set.
    pub repair_bindings: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self { repair_bindings: true }
    }
}

/// Restore an array of raw elements.
///
/// `null` is treated as an empty array. When `local_elements` are given, a
/// restored element that is not newer than the local copy with the same id
/// gets the local version plus one, so it wins the next merge.
pub fn restore_elements(
    value: &Value,
    local_elements: Option<&[Element]>,
    opts: RestoreOptions,
    rng: &mut Random,
) -> Result<Vec<Element>, RestoreError> {
    let raw = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(raw) => raw,
        _ => return Err(RestoreError::NotAnElementArray),
    };

    let local: HashMap<&str, &Element> = local_elements
        .unwrap_or_default()
        .iter()
        .map(|el| (el.id.as_str(), el))
        .collect();

    let mut restored = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(mut el) = restore_element(entry, rng) else {
            continue;
        };
        if let Some(existing) = local.get(el.id.as_str()) {
            if existing.version >= el.version {
                el.version = existing.version;
                bump_version(&mut el, rng);
            }
        }
        restored.push(el);
    }

    if opts.repair_bindings {
        repair_relations(&mut restored);
    }
    Ok(restored)
}

/// [`restore_elements`] on a JSON document.
pub fn restore_elements_from_str(
    json: &str,
    local_elements: Option<&[Element]>,
    opts: RestoreOptions,
    rng: &mut Random,
) -> Result<Vec<Element>, RestoreError> {
    let value: Value = serde_json::from_str(json)?;
    restore_elements(&value, local_elements, opts, rng)
}

/// Restore the elements of a scene document (`{"elements": [...], ...}`).
pub fn restore_scene(
    value: &Value,
    local_elements: Option<&[Element]>,
    opts: RestoreOptions,
    rng: &mut Random,
) -> Result<Vec<Element>, RestoreError> {
    let scene = value.as_object().ok_or(RestoreError::NotAScene)?;
    let elements = scene.get("elements").unwrap_or(&Value::Null);
    restore_elements(elements, local_elements, opts, rng)
}

/// Restore a single raw element. `None` for unknown types and non-objects.
pub fn restore_element(raw: &Value, rng: &mut Random) -> Option<Element> {
    if !raw.is_object() {
        log::debug!("dropping non-object element entry");
        return None;
    }
    let type_name = str_field(raw, "type").unwrap_or_default();
    let element_type = match type_name {
        // freehand lines of old documents
        "draw" => ElementType::Line,
        name => match ElementType::parse(name) {
            Some(ElementType::Selection) | None => {
                log::debug!("dropping element of unsupported type {type_name:?}");
                return None;
            }
            Some(t) => t,
        },
    };

    let mut element = restore_base(raw, element_type, rng);
    match element_type {
        ElementType::Text => restore_text(raw, &mut element, rng),
        ElementType::Freedraw => {
            element.kind = ElementKind::Freedraw(FreedrawData {
                points: parse_points(raw.get("points")),
                pressures: raw
                    .get("pressures")
                    .and_then(Value::as_array)
                    .map(|p| p.iter().filter_map(Value::as_f64).collect())
                    .unwrap_or_default(),
                simulate_pressure: bool_field(raw, "simulatePressure").unwrap_or(false),
                last_committed_point: None,
            });
        }
        ElementType::Image => {
            element.kind = ElementKind::Image(ImageData {
                status: raw
                    .get("status")
                    .and_then(|v| serde_json::from_value::<ImageStatus>(v.clone()).ok())
                    .unwrap_or_default(),
                file_id: str_field(raw, "fileId").map(str::to_string),
                scale: match raw.get("scale").and_then(Value::as_array).map(Vec::as_slice) {
                    Some([sx, sy]) => [sx.as_f64().unwrap_or(1.0), sy.as_f64().unwrap_or(1.0)],
                    _ => [1.0, 1.0],
                },
            });
        }
        ElementType::Line | ElementType::Arrow => restore_linear(raw, &mut element),
        ElementType::Frame | ElementType::Magicframe => {
            let data = FrameData { name: str_field(raw, "name").map(str::to_string) };
            element.kind = if element_type == ElementType::Frame {
                ElementKind::Frame(data)
            } else {
                ElementKind::Magicframe(data)
            };
        }
        ElementType::Rectangle
        | ElementType::Ellipse
        | ElementType::Diamond
        | ElementType::Embeddable
        | ElementType::Selection => {}
    }
    Some(element)
}

/// Restore library items: v1 items are bare element arrays, v2 items are
/// objects. Deleted elements are left out; items left empty are dropped.
pub fn restore_library_items(
    value: &Value,
    default_status: LibraryItemStatus,
    rng: &mut Random,
) -> Vec<LibraryItem> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let (mut restored, raw_elements) = match item {
                Value::Array(_) => (
                    LibraryItem {
                        id: rng.random_id(),
                        status: default_status,
                        elements: Vec::new(),
                        created: now_ms(),
                        name: None,
                    },
                    item,
                ),
                Value::Object(_) => (
                    LibraryItem {
                        id: non_empty_str(item, "id").map_or_else(|| rng.random_id(), str::to_string),
                        status: item
                            .get("status")
                            .and_then(|v| serde_json::from_value(v.clone()).ok())
                            .unwrap_or(default_status),
                        elements: Vec::new(),
                        created: item
                            .get("created")
                            .and_then(Value::as_i64)
                            .filter(|c| *c != 0)
                            .unwrap_or_else(now_ms),
                        name: str_field(item, "name").map(str::to_string),
                    },
                    item.get("elements").unwrap_or(&Value::Null),
                ),
                _ => return None,
            };
            let live: Vec<Value> = raw_elements
                .as_array()?
                .iter()
                .filter(|el| !bool_field(el, "isDeleted").unwrap_or(false))
                .cloned()
                .collect();
            restored.elements =
                restore_elements(&Value::Array(live), None, RestoreOptions::default(), rng).ok()?;
            (!restored.elements.is_empty()).then_some(restored)
        })
        .collect()
}

fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn non_empty_str<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    str_field(raw, key).filter(|s| !s.is_empty())
}

fn f64_field(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

/// Number that is present, non-zero and not NaN.
fn truthy_f64(raw: &Value, key: &str) -> Option<f64> {
    f64_field(raw, key).filter(|v| *v != 0.0 && !v.is_nan())
}

fn bool_field(raw: &Value, key: &str) -> Option<bool> {
    raw.get(key).and_then(Value::as_bool)
}

fn parse_points(value: Option<&Value>) -> Vec<Point> {
    value
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(|p| match p.as_array().map(Vec::as_slice) {
                    Some([x, y]) => Some(Point::new(x.as_f64()?, y.as_f64()?)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_binding(value: Option<&Value>) -> Option<PointBinding> {
    let raw = value?;
    let focus = f64_field(raw, "focus").filter(|f| !f.is_nan()).unwrap_or(0.0);
    Some(PointBinding {
        element_id: non_empty_str(raw, "elementId")?.to_string(),
        focus,
        gap: f64_field(raw, "gap").unwrap_or(0.0),
    })
}

fn parse_arrowhead(raw: &Value, key: &str, default: Option<Arrowhead>) -> Option<Arrowhead> {
    match raw.get(key) {
        None => default,
        Some(v) => v.as_str().and_then(Arrowhead::parse),
    }
}

/// Links with a script scheme are neutralized.
fn normalize_link(link: &str) -> String {
    let trimmed = link.trim();
    let scheme: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take_while(|c| *c != ':')
        .collect();
    if scheme.eq_ignore_ascii_case("javascript") && trimmed.contains(':') {
        "about:blank".to_string()
    } else {
        trimmed.to_string()
    }
}

fn restore_roundness(raw: &Value, element_type: ElementType) -> Option<Roundness> {
    if let Some(roundness) = raw
        .get("roundness")
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value::<Roundness>(v.clone()).ok())
    {
        return Some(roundness);
    }
    // legacy sharpness flag
    (str_field(raw, "strokeSharpness") == Some("round")).then(|| {
        Roundness::new(if element_type.uses_adaptive_radius() {
            RoundnessType::Legacy
        } else {
            RoundnessType::ProportionalRadius
        })
    })
}

fn restore_bound_elements(raw: &Value) -> Vec<BoundElement> {
    if let Some(ids) = raw.get("boundElementIds").and_then(Value::as_array) {
        return ids.iter().filter_map(Value::as_str).map(BoundElement::arrow).collect();
    }
    raw.get("boundElements")
        .and_then(Value::as_array)
        .map(|bound| {
            bound
                .iter()
                .filter_map(|b| serde_json::from_value::<BoundElement>(b.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Fields shared by every element type. The type-specific data starts out
/// at its defaults.
fn restore_base(raw: &Value, element_type: ElementType, rng: &mut Random) -> Element {
    let mut element = Element {
        id: non_empty_str(raw, "id").map_or_else(|| rng.random_id(), str::to_string),
        kind: ElementKind::default_for(element_type),
        x: f64_field(raw, "x").unwrap_or(0.0),
        y: f64_field(raw, "y").unwrap_or(0.0),
        width: truthy_f64(raw, "width").unwrap_or(0.0),
        height: truthy_f64(raw, "height").unwrap_or(0.0),
        angle: truthy_f64(raw, "angle").unwrap_or(0.0),
        stroke_color: non_empty_str(raw, "strokeColor")
            .unwrap_or(DEFAULT_STROKE_COLOR)
            .to_string(),
        background_color: non_empty_str(raw, "backgroundColor")
            .unwrap_or(DEFAULT_BACKGROUND_COLOR)
            .to_string(),
        fill_style: str_field(raw, "fillStyle").and_then(FillStyle::parse).unwrap_or_default(),
        stroke_width: truthy_f64(raw, "strokeWidth").unwrap_or(DEFAULT_STROKE_WIDTH),
        stroke_style: str_field(raw, "strokeStyle").and_then(StrokeStyle::parse).unwrap_or_default(),
        roughness: f64_field(raw, "roughness").unwrap_or(DEFAULT_ROUGHNESS),
        opacity: f64_field(raw, "opacity").unwrap_or(DEFAULT_OPACITY),
        seed: raw.get("seed").and_then(Value::as_i64).unwrap_or(1),
        group_ids: raw
            .get("groupIds")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        frame_id: non_empty_str(raw, "frameId").map(str::to_string),
        roundness: restore_roundness(raw, element_type),
        bound_elements: restore_bound_elements(raw),
        version: raw.get("version").and_then(Value::as_u64).filter(|v| *v > 0).unwrap_or(1),
        version_nonce: raw.get("versionNonce").and_then(Value::as_i64).unwrap_or(0),
        is_deleted: bool_field(raw, "isDeleted").unwrap_or(false),
        locked: bool_field(raw, "locked").unwrap_or(false),
        link: non_empty_str(raw, "link").map(normalize_link),
        updated: raw.get("updated").and_then(Value::as_i64).unwrap_or_else(now_ms),
        custom_data: raw.get("customData").filter(|v| !v.is_null()).cloned(),
    };

    let dims = get_normalized_dimensions(&element);
    element.x = dims.x;
    element.y = dims.y;
    element.width = dims.width;
    element.height = dims.height;
    element
}

fn restore_text(raw: &Value, element: &mut Element, rng: &mut Random) {
    let legacy_font = str_field(raw, "font").and_then(parse_font_string);
    let font_size = truthy_f64(raw, "fontSize")
        .or(legacy_font.map(|(size, _)| size))
        .unwrap_or(DEFAULT_FONT_SIZE);
    let font_family = raw
        .get("fontFamily")
        .and_then(Value::as_u64)
        .and_then(|f| u8::try_from(f).ok())
        .and_then(|f| FontFamily::try_from(f).ok())
        .or(legacy_font.map(|(_, family)| family))
        .unwrap_or_default();
    let text = str_field(raw, "text").unwrap_or_default().to_string();

    let line_height = truthy_f64(raw, "lineHeight").unwrap_or_else(|| {
        // documents that predate stored line heights still carry the laid
        // out height
        if element.height != 0.0 {
            detect_line_height(&text, element.height, font_size)
        } else {
            default_line_height(font_family)
        }
    });

    element.kind = ElementKind::Text(TextData {
        baseline: measure_baseline(&text, font_size, font_family, line_height),
        font_size,
        font_family,
        text_align: str_field(raw, "textAlign").and_then(TextAlign::parse).unwrap_or_default(),
        vertical_align: str_field(raw, "verticalAlign")
            .and_then(VerticalAlign::parse)
            .unwrap_or_default(),
        container_id: non_empty_str(raw, "containerId").map(str::to_string),
        original_text: non_empty_str(raw, "originalText").unwrap_or(&text).to_string(),
        line_height,
        text,
    });

    // Empty text is kept as a deleted row so collaborators see the removal.
    let is_empty = element.text_data().is_some_and(|d| d.text.is_empty());
    if is_empty && !element.is_deleted {
        if let Some(data) = element.text_data_mut() {
            data.original_text.clear();
        }
        element.is_deleted = true;
        bump_version(element, rng);
    }
}

fn restore_linear(raw: &Value, element: &mut Element) {
    let is_arrow = element.element_type() == ElementType::Arrow;
    let mut points = parse_points(raw.get("points"));
    if points.len() < 2 {
        // old arrows only had a box
        points = vec![
            Point::ZERO,
            Point::new(
                truthy_f64(raw, "width").unwrap_or(0.0),
                truthy_f64(raw, "height").unwrap_or(0.0),
            ),
        ];
    }
    // points are relative to the raw position, not the normalized box
    element.x = f64_field(raw, "x").unwrap_or(0.0);
    element.y = f64_field(raw, "y").unwrap_or(0.0);

    let data = LinearData {
        points,
        start_binding: parse_binding(raw.get("startBinding")),
        end_binding: parse_binding(raw.get("endBinding")),
        start_arrowhead: parse_arrowhead(raw, "startArrowhead", None),
        end_arrowhead: parse_arrowhead(raw, "endArrowhead", is_arrow.then_some(Arrowhead::Arrow)),
        last_committed_point: None,
    };
    element.kind = if is_arrow { ElementKind::Arrow(data) } else { ElementKind::Line(data) };
    normalize_in_place(element);
    refresh_dimensions(element);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::BoundElementType;
    use proptest::prelude::*;
    use serde_json::json;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn restore(value: Value) -> Vec<Element> {
        init();
        let mut rng = Random::new(7);
        restore_elements(&value, None, RestoreOptions::default(), &mut rng).unwrap()
    }

    #[test]
    fn test_defaults_for_bare_rectangle() {
        let out = restore(json!([{ "type": "rectangle" }]));
        let el = &out[0];
        assert!(!el.id.is_empty());
        assert_eq!(el.version, 1);
        assert_eq!(el.version_nonce, 0);
        assert_eq!(el.seed, 1);
        assert_eq!(el.opacity, DEFAULT_OPACITY);
        assert_eq!(el.stroke_width, DEFAULT_STROKE_WIDTH);
        assert_eq!(el.stroke_color, DEFAULT_STROKE_COLOR);
        assert!(el.roundness.is_none());
        assert!(el.bound_elements.is_empty());
    }

    #[test]
    fn test_null_opacity_and_zero_version() {
        let out = restore(json!([{ "type": "ellipse", "id": "e", "opacity": null, "version": 0 }]));
        assert_eq!(out[0].opacity, 100.0);
        assert_eq!(out[0].version, 1);
    }

    #[test]
    fn test_negative_dimensions_are_normalized() {
        let out = restore(json!([{ "type": "rectangle", "x": 100, "y": 100, "width": -40, "height": -20 }]));
        let el = &out[0];
        assert_eq!((el.x, el.y, el.width, el.height), (60.0, 80.0, 40.0, 20.0));
    }

    #[test]
    fn test_unknown_types_are_dropped() {
        let out = restore(json!([
            { "type": "hexagon", "id": "h" },
            { "type": "selection", "id": "s" },
            42,
            { "type": "diamond", "id": "d" },
        ]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "d");
    }

    #[test]
    fn test_not_an_array() {
        let mut rng = Random::new(1);
        let err = restore_elements(&json!({ "type": "rectangle" }), None, RestoreOptions::default(), &mut rng);
        assert!(matches!(err, Err(RestoreError::NotAnElementArray)));
        assert!(restore_elements(&Value::Null, None, RestoreOptions::default(), &mut rng).unwrap().is_empty());
        let err = restore_elements_from_str("{not json", None, RestoreOptions::default(), &mut rng);
        assert!(matches!(err, Err(RestoreError::Json(_))));
        let err = restore_scene(&json!([]), None, RestoreOptions::default(), &mut rng);
        assert!(matches!(err, Err(RestoreError::NotAScene)));
    }

    #[test]
    fn test_restore_scene_object() {
        let mut rng = Random::new(1);
        let scene = json!({ "type": "inkweave", "elements": [{ "type": "rectangle", "id": "r" }] });
        let out = restore_scene(&scene, None, RestoreOptions::default(), &mut rng).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_legacy_stroke_sharpness() {
        let out = restore(json!([
            { "type": "rectangle", "id": "r", "strokeSharpness": "round" },
            { "type": "line", "id": "l", "strokeSharpness": "round", "points": [[0, 0], [10, 10]] },
            { "type": "diamond", "id": "d", "strokeSharpness": "sharp" },
        ]));
        assert_eq!(out[0].roundness, Some(Roundness::new(RoundnessType::Legacy)));
        assert_eq!(out[1].roundness, Some(Roundness::new(RoundnessType::ProportionalRadius)));
        assert_eq!(out[2].roundness, None);
    }

    #[test]
    fn test_bound_element_ids_become_arrow_entries() {
        let out = restore(json!([
            { "type": "rectangle", "id": "r", "boundElementIds": ["a"] },
            { "type": "arrow", "id": "a", "points": [[0, 0], [10, 0]],
              "endBinding": { "elementId": "r", "gap": 4 } },
        ]));
        assert_eq!(out[0].bound_elements, vec![BoundElement::arrow("a")]);
        assert_eq!(out[0].bound_elements[0].kind, BoundElementType::Arrow);
        let binding = out[1].linear_data().unwrap().end_binding.clone().unwrap();
        assert_eq!(binding.focus, 0.0);
        assert_eq!(binding.gap, 4.0);
    }

    #[test]
    fn test_empty_text_is_deleted_with_one_bump() {
        let out = restore(json!([{ "type": "text", "id": "t", "text": "", "isDeleted": false, "version": 5 }]));
        assert!(out[0].is_deleted);
        assert_eq!(out[0].version, 6);

        let out = restore(json!([{ "type": "text", "id": "t", "text": "", "isDeleted": true, "version": 5 }]));
        assert_eq!(out[0].version, 5);
    }

    #[test]
    fn test_legacy_font_string() {
        let out = restore(json!([{ "type": "text", "id": "t", "text": "hi", "font": "36px Cascadia" }]));
        let data = out[0].text_data().unwrap();
        assert_eq!(data.font_size, 36.0);
        assert_eq!(data.font_family, FontFamily::Cascadia);
        assert_eq!(data.original_text, "hi");
        assert_eq!(data.line_height, default_line_height(FontFamily::Cascadia));
        assert_eq!(data.text_align, TextAlign::Left);
    }

    #[test]
    fn test_line_height_detected_from_height() {
        let out = restore(json!([
            { "type": "text", "id": "t", "text": "a\nb", "fontSize": 20, "fontFamily": 2, "height": 60 }
        ]));
        assert_eq!(out[0].text_data().unwrap().line_height, 1.5);
    }

    #[test]
    fn test_legacy_draw_and_missing_points() {
        let out = restore(json!([
            { "type": "draw", "id": "d", "points": [[0, 0], [5, 5]] },
            { "type": "arrow", "id": "a", "x": 10, "y": 10, "width": 30, "height": 40 },
        ]));
        assert_eq!(out[0].element_type(), ElementType::Line);
        assert_eq!(out[0].linear_data().unwrap().end_arrowhead, None);

        let arrow = out[1].linear_data().unwrap();
        assert_eq!(arrow.points, vec![Point::ZERO, Point::new(30.0, 40.0)]);
        assert_eq!(arrow.end_arrowhead, Some(Arrowhead::Arrow));
        assert_eq!(arrow.start_arrowhead, None);
    }

    #[test]
    fn test_explicit_null_arrowhead_is_kept() {
        let out = restore(json!([{ "type": "arrow", "id": "a", "points": [[0, 0], [5, 5]], "endArrowhead": null }]));
        assert_eq!(out[0].linear_data().unwrap().end_arrowhead, None);
    }

    #[test]
    fn test_offset_points_are_normalized() {
        let out = restore(json!([{ "type": "line", "id": "l", "x": 10, "y": 20, "points": [[5, 5], [15, 5]] }]));
        let el = &out[0];
        assert_eq!(el.points().unwrap(), &[Point::ZERO, Point::new(10.0, 0.0)]);
        assert_eq!((el.x, el.y), (15.0, 25.0));
    }

    #[test]
    fn test_image_and_frame_defaults() {
        let out = restore(json!([
            { "type": "image", "id": "i" },
            { "type": "frame", "id": "f" },
            { "type": "magicframe", "id": "m", "name": "Ideas" },
        ]));
        assert!(matches!(&out[0].kind, ElementKind::Image(d) if d.status == ImageStatus::Pending && d.scale == [1.0, 1.0]));
        assert!(matches!(&out[1].kind, ElementKind::Frame(d) if d.name.is_none()));
        assert!(matches!(&out[2].kind, ElementKind::Magicframe(d) if d.name.as_deref() == Some("Ideas")));
    }

    #[test]
    fn test_freedraw_keeps_pressures() {
        let out = restore(json!([{
            "type": "freedraw", "id": "f", "points": [[0, 0], [1, 1]],
            "pressures": [0.5, 0.7], "simulatePressure": true, "lastCommittedPoint": [1, 1]
        }]));
        let ElementKind::Freedraw(data) = &out[0].kind else { panic!("not freedraw") };
        assert_eq!(data.pressures, vec![0.5, 0.7]);
        assert!(data.simulate_pressure);
        assert_eq!(data.last_committed_point, None);
    }

    #[test]
    fn test_script_links_are_neutralized() {
        let out = restore(json!([
            { "type": "rectangle", "id": "a", "link": " https://example.com " },
            { "type": "rectangle", "id": "b", "link": "java\tscript:alert(1)" },
        ]));
        assert_eq!(out[0].link.as_deref(), Some("https://example.com"));
        assert_eq!(out[1].link.as_deref(), Some("about:blank"));
    }

    #[test]
    fn test_local_version_bump() {
        let mut rng = Random::new(3);
        let local = restore(json!([{ "type": "rectangle", "id": "r", "version": 7 }]));
        let incoming = json!([
            { "type": "rectangle", "id": "r", "version": 3 },
            { "type": "rectangle", "id": "other", "version": 3 },
        ]);
        let out = restore_elements(&incoming, Some(&local), RestoreOptions::default(), &mut rng).unwrap();
        assert_eq!(out[0].version, 8);
        assert_eq!(out[1].version, 3);
    }

    #[test]
    fn test_whole_set_repair() {
        let raw = json!([
            { "type": "rectangle", "id": "r", "frameId": "gone",
              "boundElements": [{ "id": "t", "type": "text" }, { "id": "t", "type": "text" }, { "id": "x", "type": "arrow" }] },
            { "type": "text", "id": "t", "text": "label" },
        ]);
        let out = restore(raw.clone());
        assert_eq!(out[0].frame_id, None);
        assert_eq!(out[0].bound_elements, vec![BoundElement::text("t")]);
        assert_eq!(out[1].container_id(), Some("r"));

        let mut rng = Random::new(7);
        let untouched = restore_elements(&raw, None, RestoreOptions { repair_bindings: false }, &mut rng).unwrap();
        assert_eq!(untouched[0].frame_id.as_deref(), Some("gone"));
    }

    #[test]
    fn test_restore_library_items_v1_and_v2() {
        let mut rng = Random::new(11);
        let items = json!([
            [{ "type": "rectangle", "id": "a" }],
            { "id": "item", "status": "published", "created": 5,
              "elements": [{ "type": "ellipse", "id": "b" }, { "type": "ellipse", "id": "c", "isDeleted": true }] },
            { "elements": [{ "type": "ellipse", "id": "d", "isDeleted": true }] },
            "junk",
        ]);
        let out = restore_library_items(&items, LibraryItemStatus::Unpublished, &mut rng);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].status, LibraryItemStatus::Unpublished);
        assert_eq!(out[0].elements[0].id, "a");
        assert_eq!(out[1].id, "item");
        assert_eq!(out[1].status, LibraryItemStatus::Published);
        assert_eq!(out[1].created, 5);
        assert_eq!(out[1].elements.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_restored_lines_start_at_origin(
            raw in proptest::collection::vec((-1e4f64..1e4, -1e4f64..1e4), 0..8),
            x in -1e4f64..1e4,
            y in -1e4f64..1e4,
            arrow in any::<bool>(),
        ) {
            let points: Vec<[f64; 2]> = raw.iter().map(|&(px, py)| [px, py]).collect();
            let value = json!([{
                "type": if arrow { "arrow" } else { "line" },
                "id": "l", "x": x, "y": y, "width": 10, "height": 10, "points": points,
            }]);
            let mut rng = Random::new(5);
            let out = restore_elements(&value, None, RestoreOptions::default(), &mut rng).unwrap();
            let el = &out[0];
            let restored = el.points().unwrap();
            prop_assert_eq!(restored[0], Point::ZERO);
            if raw.len() >= 2 {
                prop_assert_eq!(restored.len(), raw.len());
                // every point keeps its scene position
                for (p, &(px, py)) in restored.iter().zip(&raw) {
                    prop_assert!((el.x + p.x - (x + px)).abs() < 1e-6);
                    prop_assert!((el.y + p.y - (y + py)).abs() < 1e-6);
                }
            }
        }
    }
}
