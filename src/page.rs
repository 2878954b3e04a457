//! One document page: preview, tile grid, and render state.
//!
//! A page owns its tiles and nothing else. Everything it needs from the
//! spread (the visible window for its spine side, the current
//! magnification, its rendered size, the tile and cache settings)
//! arrives in a [`PageContext`] per call, and tile creation stamps come
//! from the spread's counter passed alongside.

use std::collections::HashMap;

use log::debug;

use crate::geometry::{FracRect, PixelSize};
use crate::manifest::PageSource;
use crate::slice::SliceRequest;
use crate::spread::TileCounter;
use crate::tile::{Tile, TileKey};

/// Spine side of a page within a spread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Even,
    Odd,
}

impl Side {
    /// Fixed at construction from the page index and split factor.
    #[must_use]
    pub fn from_index(index: usize, split: usize) -> Self {
        if index % split == 0 { Self::Even } else { Self::Odd }
    }
}

/// Direction of a page turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnDirection {
    Increasing,
    Decreasing,
}

/// Render-state tag issued by the spread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PageState {
    #[default]
    Closed,
    Open,
    /// Kept laid out and updating underneath a turn animation, but not
    /// the primary open page.
    Staying,
}

/// The canonical four-state view of a page, for render hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagePhase {
    /// Not laid out at all.
    Hidden,
    Closed,
    Open,
    Staying,
}

/// Per-update context handed down by the spread.
#[derive(Clone, Copy, Debug)]
pub struct PageContext<'a> {
    /// Visible-area window for this page's spine side.
    pub window: &'a FracRect,
    /// Current magnification.
    pub magnification: f64,
    /// This page's current rendered size in pixels.
    pub render_size: PixelSize,
    /// Target tile size in pixels.
    pub tile_size: u32,
    /// Tile retention horizon in tile creations.
    pub cache_horizon: u64,
    /// Slice-URL template.
    pub template: &'a str,
}

/// One document page.
#[derive(Debug)]
pub struct Page {
    /// Position in the document, fixed for the page's lifetime.
    pub index: usize,
    /// Full-resolution source identifier.
    pub source: String,
    /// Native pixel width of the source.
    pub width: u32,
    /// Native pixel height of the source.
    pub height: u32,
    /// Crop-fraction bleed bounds of the source within the page box.
    pub bounds: FracRect,
    /// Preview image reference; always rendered, independent of zoom.
    pub preview: String,
    /// Spine side, fixed at construction from `index % split`.
    pub bound: Side,

    state: PageState,
    direction: Option<TurnDirection>,
    displayed: bool,
    tiles: HashMap<TileKey, Tile>,
}

impl Page {
    #[must_use]
    pub fn new(index: usize, source: &PageSource, split: usize) -> Self {
        Self {
            index,
            source: source.href.clone(),
            width: source.width,
            height: source.height,
            bounds: source.bounds,
            preview: source.preview.clone(),
            bound: Side::from_index(index, split),
            state: PageState::Closed,
            direction: None,
            displayed: true,
            tiles: HashMap::new(),
        }
    }

    /// Regenerate and redraw tiles against the current window.
    pub fn update(
        &mut self,
        ctx: &PageContext<'_>,
        counter: &mut TileCounter,
        outbox: &mut Vec<SliceRequest>,
    ) {
        self.generate(ctx, counter, outbox);
        self.redraw(ctx, counter);
    }

    /// Materialize tiles for every visible grid cell that has none yet.
    ///
    /// The grid adapts to the current render size: cell counts are
    /// re-derived on every call, so tile geometry is recomputed rather
    /// than cached across zoom levels.
    fn generate(
        &mut self,
        ctx: &PageContext<'_>,
        counter: &mut TileCounter,
        outbox: &mut Vec<SliceRequest>,
    ) {
        let tile_size = f64::from(ctx.tile_size);
        let rows = ((ctx.render_size.height / tile_size).round() as u32).max(1);
        let cols = ((ctx.render_size.width / tile_size).round() as u32).max(1);

        for row in 0..rows {
            let top = f64::from(row) / f64::from(rows);
            let bottom = f64::from(row + 1) / f64::from(rows);
            let height = (bottom - top) * ctx.render_size.height;

            for col in 0..cols {
                let left = f64::from(col) / f64::from(cols);
                let right = f64::from(col + 1) / f64::from(cols);
                let width = (right - left) * ctx.render_size.width;

                let key = TileKey::new(col, row, ctx.magnification);
                let cell = FracRect::new(left, top, right, bottom);
                if !self.tiles.contains_key(&key) && cell.overlaps(ctx.window) {
                    let stamp = counter.advance();
                    let tile = Tile::new(cell, width, height, ctx.magnification, stamp);
                    outbox.push(SliceRequest::for_tile(
                        ctx.template,
                        &self.source,
                        self.index,
                        key,
                        &tile,
                    ));
                    debug!(
                        "page {}: tile ({}, {}) @x{} created, stamp {stamp}",
                        self.index, col, row, ctx.magnification
                    );
                    self.tiles.insert(key, tile);
                }
            }
        }
    }

    /// Keep fresh tiles and refresh their visibility; evict the rest.
    ///
    /// The horizon is pure creation order: a tile whose stamp has fallen
    /// more than `cache_horizon` creations behind the counter is evicted
    /// even if it is still on screen, and will be regenerated on the
    /// next pass if its cell is visible.
    fn redraw(&mut self, ctx: &PageContext<'_>, counter: &TileCounter) {
        let horizon = counter.count().saturating_sub(ctx.cache_horizon);
        let page_index = self.index;
        self.tiles.retain(|key, tile| {
            if tile.index > horizon {
                tile.update_visibility(ctx.window, ctx.magnification);
                true
            } else {
                debug!(
                    "page {page_index}: tile ({}, {}) stamp {} evicted (horizon {horizon})",
                    key.col, key.row, tile.index
                );
                false
            }
        });
    }

    /// Become the primary page of a turn.
    pub fn open(
        &mut self,
        direction: TurnDirection,
        ctx: &PageContext<'_>,
        counter: &mut TileCounter,
        outbox: &mut Vec<SliceRequest>,
    ) {
        self.state = PageState::Open;
        self.direction = Some(direction);
        self.update(ctx, counter, outbox);
    }

    /// Turn away; no tile work, the page is leaving the screen.
    pub fn close(&mut self, direction: TurnDirection) {
        self.state = PageState::Closed;
        self.direction = Some(direction);
    }

    /// Stay laid out underneath the turn animation.
    pub fn stay(
        &mut self,
        direction: TurnDirection,
        ctx: &PageContext<'_>,
        counter: &mut TileCounter,
        outbox: &mut Vec<SliceRequest>,
    ) {
        self.displayed = true;
        self.state = PageState::Staying;
        self.direction = Some(direction);
        self.update(ctx, counter, outbox);
    }

    /// Present as the open page outside of any turn.
    pub fn show(
        &mut self,
        ctx: &PageContext<'_>,
        counter: &mut TileCounter,
        outbox: &mut Vec<SliceRequest>,
    ) {
        self.displayed = true;
        self.state = PageState::Open;
        self.direction = None;
        self.update(ctx, counter, outbox);
    }

    /// Close, and stop rendering entirely unless near the open anchor.
    ///
    /// Pages within ±3 positions of the anchor stay laid out but
    /// visually closed, so the next turn finds them ready.
    pub fn hide(&mut self, anchor: usize) {
        self.displayed = self.index + 4 > anchor && self.index < anchor + 4;
        self.state = PageState::Closed;
        self.direction = None;
    }

    /// Current render-state tag.
    #[must_use]
    pub fn state(&self) -> PageState {
        self.state
    }

    /// Turn direction associated with the current state, if any.
    #[must_use]
    pub fn direction(&self) -> Option<TurnDirection> {
        self.direction
    }

    /// Whether the page participates in layout at all.
    #[must_use]
    pub fn displayed(&self) -> bool {
        self.displayed
    }

    /// The canonical four-state view.
    #[must_use]
    pub fn phase(&self) -> PagePhase {
        match (self.state, self.displayed) {
            (PageState::Closed, false) => PagePhase::Hidden,
            (PageState::Closed, true) => PagePhase::Closed,
            (PageState::Open, _) => PagePhase::Open,
            (PageState::Staying, _) => PagePhase::Staying,
        }
    }

    /// The page's live tiles.
    pub fn tiles(&self) -> impl Iterator<Item = (&TileKey, &Tile)> {
        self.tiles.iter()
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub(crate) fn tile_mut(&mut self, key: &TileKey) -> Option<&mut Tile> {
        self.tiles.get_mut(key)
    }
}
