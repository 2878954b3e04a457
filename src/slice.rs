//! Crop requests addressed to the external image-slicing service.
//!
//! The engine never fetches or decodes pixels. Creating a tile emits a
//! [`SliceRequest`] into the spread's outbox; the render host drains the
//! outbox, performs the fetches, and reports completions back through
//! the viewer.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::geometry::FracRect;
use crate::tile::{Tile, TileKey};

static LEFTOVER_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[a-z]+\}").expect("placeholder pattern compiles"));

/// One crop request for the slicing service.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceRequest {
    /// Index of the page the tile belongs to.
    pub page: usize,
    /// Identity of the tile within that page.
    pub key: TileKey,
    /// Fully substituted request URL.
    pub url: String,
    /// Requested crop width in whole pixels.
    pub width: u32,
    /// Requested crop height in whole pixels.
    pub height: u32,
}

impl SliceRequest {
    pub(crate) fn for_tile(
        template: &str,
        source: &str,
        page: usize,
        key: TileKey,
        tile: &Tile,
    ) -> Self {
        let width = tile.width.round() as u32;
        let height = tile.height.round() as u32;
        let url = fill_template(template, source, width, height, &tile.rect);
        if let Some(m) = LEFTOVER_PLACEHOLDER.find(&url) {
            warn!("slice template leaves placeholder {} unreplaced", m.as_str());
        }
        Self {
            page,
            key,
            url,
            width,
            height,
        }
    }
}

/// Substitute the crop parameters into a slice-URL template.
///
/// Recognized placeholders: `{src}`, `{width}`, `{height}`, `{left}`,
/// `{top}`, `{right}`, `{bottom}`. Every occurrence is replaced.
#[must_use]
pub fn fill_template(
    template: &str,
    src: &str,
    width: u32,
    height: u32,
    rect: &FracRect,
) -> String {
    template
        .replace("{src}", src)
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string())
        .replace("{left}", &rect.left.to_string())
        .replace("{top}", &rect.top.to_string())
        .replace("{right}", &rect.right.to_string())
        .replace("{bottom}", &rect.bottom.to_string())
}
