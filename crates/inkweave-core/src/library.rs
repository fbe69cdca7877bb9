//! Reusable element collections ("library items"): payload parsing, merging,
//! export and the URL parameters that trigger an import.

use crate::Random;
use crate::element::{BoundingBox, Element, common_bounding_box};
use crate::restore::restore_library_items;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

/// `type` of a library payload.
pub const LIBRARY_TYPE: &str = "inkweave/library";
/// Version written by [`serialize_library_as_json`].
pub const LIBRARY_VERSION: u64 = 2;
/// `source` written by [`serialize_library_as_json`].
pub const LIBRARY_SOURCE: &str = "inkweave";
/// Space between items laid out by [`distribute_library_items_on_square_grid`].
pub const LIBRARY_GRID_PADDING: f64 = 50.0;
/// URL key (hash, or query for old links) naming a library to import.
pub const ADD_LIBRARY_KEY: &str = "addLibrary";
/// Hash key carrying the token that goes with the library URL.
pub const LIBRARY_TOKEN_KEY: &str = "token";

/// Library errors.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a library payload: {0}")]
    WrongType(String),
    #[error("Unsupported library version: {0}")]
    UnsupportedVersion(String),
    #[error("Library payload has no items")]
    MissingItems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryItemStatus {
    Published,
    #[default]
    Unpublished,
}

/// A named group of elements that can be inserted as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    #[serde(default)]
    pub status: LibraryItemStatus,
    pub elements: Vec<Element>,
    /// Epoch milliseconds.
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Library reference found in an import URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTokens {
    pub library_url: String,
    pub id_token: Option<String>,
}

/// Parse a library file. Version 1 files list their items under `library`,
/// version 2 files under `libraryItems`.
pub fn parse_library_payload(
    json: &str,
    default_status: LibraryItemStatus,
    rng: &mut Random,
) -> Result<Vec<LibraryItem>, LibraryError> {
    let data: Value = serde_json::from_str(json)?;

    let kind = data.get("type").and_then(Value::as_str).unwrap_or_default();
    if kind != LIBRARY_TYPE {
        log::warn!("rejecting library payload of type {kind:?}");
        return Err(LibraryError::WrongType(kind.to_string()));
    }
    match data.get("version").and_then(Value::as_u64) {
        Some(1 | 2) => {}
        other => {
            let version = other.map_or_else(|| "missing".to_string(), |v| v.to_string());
            log::warn!("rejecting library payload of version {version}");
            return Err(LibraryError::UnsupportedVersion(version));
        }
    }

    let items = data
        .get("libraryItems")
        .or_else(|| data.get("library"))
        .filter(|items| items.is_array())
        .ok_or_else(|| {
            log::warn!("library payload has no items");
            LibraryError::MissingItems
        })?;
    Ok(restore_library_items(items, default_status, rng))
}

/// Serialize items as a version 2 library file.
pub fn serialize_library_as_json(items: &[LibraryItem]) -> Result<String, LibraryError> {
    let data = json!({
        "type": LIBRARY_TYPE,
        "version": LIBRARY_VERSION,
        "source": LIBRARY_SOURCE,
        "libraryItems": items,
    });
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Whether `candidate` holds the same elements, in the same order, as an
/// item already in `existing`.
fn is_duplicate_item(existing: &[LibraryItem], candidate: &LibraryItem) -> bool {
    existing.iter().any(|item| {
        item.elements.len() == candidate.elements.len()
            && item
                .elements
                .iter()
                .zip(&candidate.elements)
                .all(|(a, b)| a.id == b.id && a.version_nonce == b.version_nonce)
    })
}

/// Merge `incoming` into `local`. New items go first, in their incoming
/// order; items whose elements match a local item are skipped.
pub fn merge_library_items(local: &[LibraryItem], incoming: &[LibraryItem]) -> Vec<LibraryItem> {
    incoming
        .iter()
        .filter(|item| !is_duplicate_item(local, item))
        .chain(local)
        .cloned()
        .collect()
}

fn item_bounds(item: &LibraryItem) -> BoundingBox {
    common_bounding_box(&item.elements).unwrap_or_default()
}

/// Lay out the elements of all items on a square grid, each item centered
/// in its cell, for placing a whole library onto the canvas.
pub fn distribute_library_items_on_square_grid(items: &[LibraryItem]) -> Vec<Element> {
    if items.is_empty() {
        return Vec::new();
    }
    let per_row = (items.len() as f64).sqrt().ceil() as usize;
    let bounds: Vec<BoundingBox> = items.iter().map(item_bounds).collect();

    let row_heights: Vec<f64> = bounds
        .chunks(per_row)
        .map(|row| row.iter().map(|b| b.height).fold(0.0, f64::max))
        .collect();
    let col_widths: Vec<f64> = (0..per_row)
        .map(|col| {
            bounds
                .iter()
                .skip(col)
                .step_by(per_row)
                .map(|b| b.width)
                .fold(0.0, f64::max)
        })
        .collect();

    let mut out = Vec::new();
    let mut row_offset_y = 0.0;
    for (row, (row_items, row_bounds)) in items.chunks(per_row).zip(bounds.chunks(per_row)).enumerate() {
        let row_height = row_heights[row];
        let mut col_offset_x = 0.0;
        for (col, (item, b)) in row_items.iter().zip(row_bounds).enumerate() {
            let col_width = col_widths[col];
            let dx = col_offset_x + (col_width - b.width) / 2.0 - b.min_x;
            let dy = row_offset_y + (row_height - b.height) / 2.0 - b.min_y;
            out.extend(item.elements.iter().cloned().map(|mut el| {
                el.x += dx;
                el.y += dy;
                el
            }));
            col_offset_x += col_width + LIBRARY_GRID_PADDING;
        }
        row_offset_y += row_height + LIBRARY_GRID_PADDING;
    }
    out
}

/// Library import parameters of a page URL.
///
/// The library URL is read from the hash (`#addLibrary=...`), falling back to
/// the query string of old links. The token is only read from the hash.
pub fn parse_library_tokens_from_url(page_url: &str) -> Option<LibraryTokens> {
    let url = match Url::parse(page_url) {
        Ok(url) => url,
        Err(err) => {
            log::warn!("ignoring unparsable page url: {err}");
            return None;
        }
    };
    let hash_value = |key: &str| {
        url.fragment().and_then(|fragment| {
            url::form_urlencoded::parse(fragment.as_bytes())
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        })
    };

    let library_url = hash_value(ADD_LIBRARY_KEY)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            url.query_pairs()
                .find(|(k, _)| k == ADD_LIBRARY_KEY)
                .map(|(_, v)| v.into_owned())
        })
        .filter(|v| !v.is_empty())?;
    Some(LibraryTokens {
        library_url,
        id_token: hash_value(LIBRARY_TOKEN_KEY),
    })
}
