//! Text metrics and the text ↔ container relation.

use super::{Element, ElementLookup};
use serde::{Deserialize, Serialize};

/// Font size of new text elements.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// Rough advance width of a glyph, as a fraction of the font size. Only used
/// to give freshly created text a plausible box before a renderer measures it.
pub(crate) const AVERAGE_CHAR_WIDTH_RATIO: f64 = 0.55;

/// Share of the font size below the baseline.
const DESCENT_RATIO: f64 = 0.2;

/// Font families known to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FontFamily {
    /// Hand-drawn font.
    #[default]
    Virgil = 1,
    Helvetica = 2,
    Cascadia = 3,
}

impl TryFrom<u8> for FontFamily {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Virgil),
            2 => Ok(Self::Helvetica),
            3 => Ok(Self::Cascadia),
            other => Err(format!("unknown font family {other}")),
        }
    }
}

impl From<FontFamily> for u8 {
    fn from(value: FontFamily) -> Self {
        value as u8
    }
}

impl FontFamily {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Virgil => "Virgil",
            Self::Helvetica => "Helvetica",
            Self::Cascadia => "Cascadia",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Virgil" => Some(Self::Virgil),
            "Helvetica" => Some(Self::Helvetica),
            "Cascadia" => Some(Self::Cascadia),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "top" => Some(Self::Top),
            "middle" => Some(Self::Middle),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Unitless line height each family is laid out with.
pub fn default_line_height(family: FontFamily) -> f64 {
    match family {
        FontFamily::Virgil => 1.25,
        FontFamily::Helvetica => 1.15,
        FontFamily::Cascadia => 1.2,
    }
}

fn line_count(text: &str) -> usize {
    text.split('\n').count().max(1)
}

/// Line height recovered from an already laid out element, for documents
/// saved before line height was persisted.
pub fn detect_line_height(text: &str, height: f64, font_size: f64) -> f64 {
    if font_size <= 0.0 {
        return default_line_height(FontFamily::default());
    }
    height / line_count(text) as f64 / font_size
}

/// Distance from the top of the box to the baseline of the last line.
///
/// Approximates the metrics a renderer would report, so stored documents get
/// a usable value even without font data.
pub fn measure_baseline(text: &str, font_size: f64, _family: FontFamily, line_height: f64) -> f64 {
    let line_px = font_size * line_height;
    let height = line_count(text) as f64 * line_px;
    height - (line_px - font_size) / 2.0 - font_size * DESCENT_RATIO
}

/// CSS font shorthand for a size and family.
pub fn get_font_string(font_size: f64, family: FontFamily) -> String {
    format!("{font_size}px {}, Segoe UI Emoji", family.name())
}

/// Decode the legacy `"20px Virgil"` shorthand.
pub fn parse_font_string(font: &str) -> Option<(f64, FontFamily)> {
    let (size, rest) = font.trim().split_once("px")?;
    let size: f64 = size.trim().parse().ok()?;
    let family_name = rest.split(',').next().unwrap_or_default();
    let family = FontFamily::from_name(family_name).unwrap_or_default();
    Some((size, family))
}

/// Label bound to `container`, if it exists and is not deleted.
pub fn get_bound_text_element<'a, L: ElementLookup + ?Sized>(
    container: &Element,
    elements: &'a L,
) -> Option<&'a Element> {
    let id = container.bound_text_element_id()?;
    elements.lookup_non_deleted(id).filter(|el| el.is_text())
}

/// Container owning a bound text element.
pub fn get_container_element<'a, L: ElementLookup + ?Sized>(
    text: &Element,
    elements: &'a L,
) -> Option<&'a Element> {
    elements.lookup(text.container_id()?)
}
