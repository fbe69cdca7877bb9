//! Element definitions for the diagram surface.

mod bounds;
mod duplicate;
pub mod linear;
mod mutate;
mod points;
mod size;
mod text;

pub use bounds::{
    BoundingBox, absolute_coords, absolute_coords_with, absolute_coords_with_bound_text,
    common_bounding_box, common_bounds, element_bounds, element_bounds_with,
    min_max_xy_with_bound_text,
};
pub use duplicate::{
    bind_elements_to_frames_after_duplication, duplicate_element, duplicate_elements,
};
pub use mutate::{bump_version, now_ms};
pub use size::{
    INVISIBLY_SMALL_ELEMENT_SIZE, NewElementDrag, NewElementGeometry, SHIFT_LOCKING_ANGLE,
    drag_new_element, get_locked_linear_cursor_align_size, get_normalized_dimensions,
    get_perfect_element_size, is_invisibly_small_element,
};
pub use text::{
    DEFAULT_FONT_SIZE, FontFamily, TextAlign, VerticalAlign, default_line_height,
    detect_line_height, get_bound_text_element, get_container_element, get_font_string,
    measure_baseline, parse_font_string,
};

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for elements. Ids come from foreign data too, so they
/// are opaque strings rather than UUIDs.
pub type ElementId = String;

/// Identifier of an ad-hoc group.
pub type GroupId = String;

/// Closed set of element discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Rectangle,
    Ellipse,
    Diamond,
    Arrow,
    Line,
    Freedraw,
    Text,
    Image,
    Frame,
    Embeddable,
    Magicframe,
    Selection,
}

impl ElementType {
    /// Parse the wire name of a type.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "rectangle" => Self::Rectangle,
            "ellipse" => Self::Ellipse,
            "diamond" => Self::Diamond,
            "arrow" => Self::Arrow,
            "line" => Self::Line,
            "freedraw" => Self::Freedraw,
            "text" => Self::Text,
            "image" => Self::Image,
            "frame" => Self::Frame,
            "embeddable" => Self::Embeddable,
            "magicframe" => Self::Magicframe,
            "selection" => Self::Selection,
            _ => return None,
        })
    }

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Diamond => "diamond",
            Self::Arrow => "arrow",
            Self::Line => "line",
            Self::Freedraw => "freedraw",
            Self::Text => "text",
            Self::Image => "image",
            Self::Frame => "frame",
            Self::Embeddable => "embeddable",
            Self::Magicframe => "magicframe",
            Self::Selection => "selection",
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Arrow | Self::Line)
    }

    pub fn is_frame_like(&self) -> bool {
        matches!(self, Self::Frame | Self::Magicframe)
    }

    /// Types that switch to the adaptive corner radius when rounded.
    pub fn uses_adaptive_radius(&self) -> bool {
        matches!(self, Self::Rectangle | Self::Embeddable | Self::Image)
    }

    /// Types an arrow endpoint may bind to.
    pub fn is_bindable(&self) -> bool {
        matches!(
            self,
            Self::Rectangle
                | Self::Diamond
                | Self::Ellipse
                | Self::Image
                | Self::Frame
                | Self::Magicframe
                | Self::Embeddable
                | Self::Text
        )
    }

    /// Types that can host a bound text label.
    pub fn is_text_container(&self) -> bool {
        matches!(
            self,
            Self::Rectangle | Self::Diamond | Self::Ellipse | Self::Arrow
        )
    }

    pub fn has_background(&self) -> bool {
        matches!(
            self,
            Self::Rectangle
                | Self::Embeddable
                | Self::Ellipse
                | Self::Diamond
                | Self::Line
                | Self::Freedraw
        )
    }

    pub fn has_stroke_style(&self) -> bool {
        matches!(
            self,
            Self::Rectangle
                | Self::Embeddable
                | Self::Ellipse
                | Self::Diamond
                | Self::Arrow
                | Self::Line
        )
    }

    pub fn can_change_roundness(&self) -> bool {
        matches!(
            self,
            Self::Rectangle
                | Self::Embeddable
                | Self::Arrow
                | Self::Line
                | Self::Diamond
                | Self::Image
        )
    }

    pub fn can_have_arrowheads(&self) -> bool {
        matches!(self, Self::Arrow)
    }
}

/// Fill style of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillStyle {
    #[default]
    Solid,
    Hachure,
    CrossHatch,
    Zigzag,
}

impl FillStyle {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "solid" => Self::Solid,
            "hachure" => Self::Hachure,
            "cross-hatch" => Self::CrossHatch,
            "zigzag" => Self::Zigzag,
            _ => return None,
        })
    }
}

/// Stroke style for outlines, lines and arrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "solid" => Self::Solid,
            "dashed" => Self::Dashed,
            "dotted" => Self::Dotted,
            _ => return None,
        })
    }
}

/// Corner rounding algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RoundnessType {
    /// Fixed algorithm used by old documents.
    Legacy = 1,
    /// Radius proportional to the shorter side.
    ProportionalRadius = 2,
    /// Radius that stays constant until the shape gets too small.
    AdaptiveRadius = 3,
}

impl TryFrom<u8> for RoundnessType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Legacy),
            2 => Ok(Self::ProportionalRadius),
            3 => Ok(Self::AdaptiveRadius),
            other => Err(format!("unknown roundness type {other}")),
        }
    }
}

impl From<RoundnessType> for u8 {
    fn from(value: RoundnessType) -> Self {
        value as u8
    }
}

/// Corner rounding descriptor. `None` on the element means sharp corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Roundness {
    #[serde(rename = "type")]
    pub kind: RoundnessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Roundness {
    pub fn new(kind: RoundnessType) -> Self {
        Self { kind, value: None }
    }
}

/// Kind of element referenced from `boundElements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundElementType {
    Arrow,
    Text,
}

/// Back-reference from a shape to an element bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: BoundElementType,
}

impl BoundElement {
    pub fn text(id: impl Into<ElementId>) -> Self {
        Self { id: id.into(), kind: BoundElementType::Text }
    }

    pub fn arrow(id: impl Into<ElementId>) -> Self {
        Self { id: id.into(), kind: BoundElementType::Arrow }
    }
}

/// Binding of one arrow endpoint to a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointBinding {
    pub element_id: ElementId,
    #[serde(default)]
    pub focus: f64,
    #[serde(default)]
    pub gap: f64,
}

/// Arrowhead decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arrowhead {
    Arrow,
    Bar,
    Dot,
    Triangle,
}

impl Arrowhead {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "arrow" => Self::Arrow,
            "bar" => Self::Bar,
            "dot" => Self::Dot,
            "triangle" => Self::Triangle,
            _ => return None,
        })
    }
}

/// Data of a line or arrow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearData {
    /// Local points; `points[0]` is always the origin.
    #[serde(with = "points::list")]
    pub points: Vec<Point>,
    #[serde(default)]
    pub start_binding: Option<PointBinding>,
    #[serde(default)]
    pub end_binding: Option<PointBinding>,
    #[serde(default)]
    pub start_arrowhead: Option<Arrowhead>,
    #[serde(default)]
    pub end_arrowhead: Option<Arrowhead>,
    #[serde(default, with = "points::optional")]
    pub last_committed_point: Option<Point>,
}

/// Data of a freehand stroke.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreedrawData {
    #[serde(with = "points::list")]
    pub points: Vec<Point>,
    #[serde(default)]
    pub pressures: Vec<f64>,
    #[serde(default)]
    pub simulate_pressure: bool,
    #[serde(default, with = "points::optional")]
    pub last_committed_point: Option<Point>,
}

/// Data of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub text: String,
    pub font_size: f64,
    pub font_family: FontFamily,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub vertical_align: VerticalAlign,
    /// Shape (or arrow) owning this label.
    #[serde(default)]
    pub container_id: Option<ElementId>,
    #[serde(default)]
    pub original_text: String,
    /// Unitless multiple of the font size.
    pub line_height: f64,
    #[serde(default)]
    pub baseline: f64,
}

impl Default for TextData {
    fn default() -> Self {
        let font_family = FontFamily::default();
        Self {
            text: String::new(),
            font_size: text::DEFAULT_FONT_SIZE,
            font_family,
            text_align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
            container_id: None,
            original_text: String::new(),
            line_height: default_line_height(font_family),
            baseline: 0.0,
        }
    }
}

/// Loading state of an image's binary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Pending,
    Saved,
    Error,
}

/// Data of an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    #[serde(default)]
    pub status: ImageStatus,
    #[serde(default)]
    pub file_id: Option<String>,
    pub scale: [f64; 2],
}

impl Default for ImageData {
    fn default() -> Self {
        Self { status: ImageStatus::Pending, file_id: None, scale: [1.0, 1.0] }
    }
}

/// Data of a frame-like element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(default)]
    pub name: Option<String>,
}

/// Type discriminant plus type-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Rectangle,
    Ellipse,
    Diamond,
    Embeddable,
    Selection,
    Arrow(LinearData),
    Line(LinearData),
    Freedraw(FreedrawData),
    Text(TextData),
    Image(ImageData),
    Frame(FrameData),
    Magicframe(FrameData),
}

impl ElementKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Rectangle => ElementType::Rectangle,
            Self::Ellipse => ElementType::Ellipse,
            Self::Diamond => ElementType::Diamond,
            Self::Embeddable => ElementType::Embeddable,
            Self::Selection => ElementType::Selection,
            Self::Arrow(_) => ElementType::Arrow,
            Self::Line(_) => ElementType::Line,
            Self::Freedraw(_) => ElementType::Freedraw,
            Self::Text(_) => ElementType::Text,
            Self::Image(_) => ElementType::Image,
            Self::Frame(_) => ElementType::Frame,
            Self::Magicframe(_) => ElementType::Magicframe,
        }
    }

    /// Default data for a type.
    pub fn default_for(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Rectangle => Self::Rectangle,
            ElementType::Ellipse => Self::Ellipse,
            ElementType::Diamond => Self::Diamond,
            ElementType::Embeddable => Self::Embeddable,
            ElementType::Selection => Self::Selection,
            ElementType::Arrow => Self::Arrow(LinearData {
                points: vec![Point::ZERO],
                end_arrowhead: Some(Arrowhead::Arrow),
                ..Default::default()
            }),
            ElementType::Line => Self::Line(LinearData {
                points: vec![Point::ZERO],
                ..Default::default()
            }),
            ElementType::Freedraw => Self::Freedraw(FreedrawData::default()),
            ElementType::Text => Self::Text(TextData::default()),
            ElementType::Image => Self::Image(ImageData::default()),
            ElementType::Frame => Self::Frame(FrameData::default()),
            ElementType::Magicframe => Self::Magicframe(FrameData::default()),
        }
    }
}

fn default_opacity() -> f64 {
    100.0
}

fn default_version() -> u64 {
    1
}

/// The fundamental drawable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(flatten)]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians around the element's center.
    #[serde(default)]
    pub angle: f64,
    pub stroke_color: String,
    pub background_color: String,
    #[serde(default)]
    pub fill_style: FillStyle,
    pub stroke_width: f64,
    #[serde(default)]
    pub stroke_style: StrokeStyle,
    #[serde(default)]
    pub roughness: f64,
    /// 0..=100.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub seed: i64,
    /// Innermost group first, outermost last. This is the order saved files
    /// and library payloads already use, so `groupIds` round-trips unchanged.
    #[serde(default)]
    pub group_ids: Vec<GroupId>,
    #[serde(default)]
    pub frame_id: Option<ElementId>,
    #[serde(default)]
    pub roundness: Option<Roundness>,
    #[serde(default)]
    pub bound_elements: Vec<BoundElement>,
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default)]
    pub version_nonce: i64,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub link: Option<String>,
    /// Epoch milliseconds of the last mutation.
    #[serde(default)]
    pub updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

/// Default stroke color for new elements.
pub const DEFAULT_STROKE_COLOR: &str = "#1e1e1e";
/// Default background color for new elements.
pub const DEFAULT_BACKGROUND_COLOR: &str = "transparent";
/// Default stroke width.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
/// Default roughness (the "artist" level).
pub const DEFAULT_ROUGHNESS: f64 = 1.0;
/// Default opacity, in percent.
pub const DEFAULT_OPACITY: f64 = 100.0;

impl Element {
    /// Create a new element of the given type with default styling,
    /// version 1 and a fresh nonce/seed from `rng`.
    pub fn new(
        element_type: ElementType,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rng: &mut crate::Random,
    ) -> Self {
        Self {
            id: rng.random_id(),
            kind: ElementKind::default_for(element_type),
            x,
            y,
            width,
            height,
            angle: 0.0,
            stroke_color: DEFAULT_STROKE_COLOR.to_string(),
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            fill_style: FillStyle::default(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            stroke_style: StrokeStyle::default(),
            roughness: DEFAULT_ROUGHNESS,
            opacity: DEFAULT_OPACITY,
            seed: rng.random_integer(),
            group_ids: Vec::new(),
            frame_id: None,
            roundness: None,
            bound_elements: Vec::new(),
            version: 1,
            version_nonce: rng.random_integer(),
            is_deleted: false,
            locked: false,
            link: None,
            updated: now_ms(),
            custom_data: None,
        }
    }

    /// Create a line or arrow through the given local points. The points are
    /// normalized so the first one sits at the origin.
    pub fn new_linear(
        element_type: ElementType,
        x: f64,
        y: f64,
        points: Vec<Point>,
        rng: &mut crate::Random,
    ) -> Self {
        debug_assert!(element_type.is_linear(), "not a linear type: {element_type:?}");
        let mut element = Self::new(element_type, x, y, 0.0, 0.0, rng);
        if let Some(data) = element.linear_data_mut() {
            data.points = points;
        }
        linear::normalize_in_place(&mut element);
        linear::refresh_dimensions(&mut element);
        element
    }

    /// Create a text element, optionally bound to a container.
    pub fn new_text(
        x: f64,
        y: f64,
        content: &str,
        container_id: Option<ElementId>,
        rng: &mut crate::Random,
    ) -> Self {
        let mut element = Self::new(ElementType::Text, x, y, 0.0, 0.0, rng);
        if let ElementKind::Text(data) = &mut element.kind {
            data.text = content.to_string();
            data.original_text = content.to_string();
            data.container_id = container_id;
            let lines = content.split('\n').count().max(1) as f64;
            element.height = lines * data.font_size * data.line_height;
            element.width = content
                .split('\n')
                .map(|l| l.chars().count())
                .max()
                .unwrap_or(0) as f64
                * data.font_size
                * text::AVERAGE_CHAR_WIDTH_RATIO;
            data.baseline = measure_baseline(content, data.font_size, data.font_family, data.line_height);
        }
        element
    }

    pub fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    pub fn is_linear(&self) -> bool {
        self.element_type().is_linear()
    }

    pub fn is_frame_like(&self) -> bool {
        self.element_type().is_frame_like()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text(_))
    }

    pub fn is_bindable(&self) -> bool {
        match &self.kind {
            // labels of containers are not binding targets themselves
            ElementKind::Text(data) => data.container_id.is_none(),
            kind => kind.element_type().is_bindable(),
        }
    }

    /// Local points for lines, arrows and freehand strokes.
    pub fn points(&self) -> Option<&[Point]> {
        match &self.kind {
            ElementKind::Arrow(d) | ElementKind::Line(d) => Some(&d.points),
            ElementKind::Freedraw(d) => Some(&d.points),
            _ => None,
        }
    }

    pub fn points_mut(&mut self) -> Option<&mut Vec<Point>> {
        match &mut self.kind {
            ElementKind::Arrow(d) | ElementKind::Line(d) => Some(&mut d.points),
            ElementKind::Freedraw(d) => Some(&mut d.points),
            _ => None,
        }
    }

    pub fn linear_data(&self) -> Option<&LinearData> {
        match &self.kind {
            ElementKind::Arrow(d) | ElementKind::Line(d) => Some(d),
            _ => None,
        }
    }

    pub fn linear_data_mut(&mut self) -> Option<&mut LinearData> {
        match &mut self.kind {
            ElementKind::Arrow(d) | ElementKind::Line(d) => Some(d),
            _ => None,
        }
    }

    pub fn text_data(&self) -> Option<&TextData> {
        match &self.kind {
            ElementKind::Text(d) => Some(d),
            _ => None,
        }
    }

    pub fn text_data_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.kind {
            ElementKind::Text(d) => Some(d),
            _ => None,
        }
    }

    /// Container of a bound text element.
    pub fn container_id(&self) -> Option<&str> {
        self.text_data().and_then(|d| d.container_id.as_deref())
    }

    /// Id of the text label bound to this element, if any.
    pub fn bound_text_element_id(&self) -> Option<&str> {
        self.bound_elements
            .iter()
            .find(|b| b.kind == BoundElementType::Text)
            .map(|b| b.id.as_str())
    }

    /// The outermost group the element belongs to.
    pub fn top_most_group_id(&self) -> Option<&str> {
        self.group_ids.last().map(String::as_str)
    }
}

/// Resolves element ids to elements.
///
/// Every relation in the element graph is an id; this is how it gets
/// dereferenced.
pub trait ElementLookup {
    fn lookup(&self, id: &str) -> Option<&Element>;

    /// Same as [`ElementLookup::lookup`] but skips soft-deleted elements.
    fn lookup_non_deleted(&self, id: &str) -> Option<&Element> {
        self.lookup(id).filter(|el| !el.is_deleted)
    }
}

impl ElementLookup for HashMap<ElementId, Element> {
    fn lookup(&self, id: &str) -> Option<&Element> {
        self.get(id)
    }
}

impl ElementLookup for HashMap<&str, &Element> {
    fn lookup(&self, id: &str) -> Option<&Element> {
        self.get(id).copied()
    }
}

impl ElementLookup for [Element] {
    fn lookup(&self, id: &str) -> Option<&Element> {
        self.iter().find(|el| el.id == id)
    }
}

impl ElementLookup for Vec<Element> {
    fn lookup(&self, id: &str) -> Option<&Element> {
        self.as_slice().lookup(id)
    }
}

/// Index elements by id.
pub fn elements_map(elements: &[Element]) -> HashMap<&str, &Element> {
    elements.iter().map(|el| (el.id.as_str(), el)).collect()
}

/// Elements that are not soft-deleted.
pub fn get_non_deleted_elements<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
) -> Vec<&'a Element> {
    elements.into_iter().filter(|el| !el.is_deleted).collect()
}

/// Non-deleted elements with transient editing state stripped, ready to be
/// persisted or exported.
pub fn clear_elements_for_export(elements: &[Element]) -> Vec<Element> {
    elements
        .iter()
        .filter(|el| !el.is_deleted)
        .cloned()
        .map(|mut el| {
            match &mut el.kind {
                ElementKind::Arrow(d) | ElementKind::Line(d) => d.last_committed_point = None,
                ElementKind::Freedraw(d) => d.last_committed_point = None,
                _ => {}
            }
            el
        })
        .collect()
}
