//! Pagination and zoom/pan controller.
//!
//! The spread owns the ordered page list and everything that changes
//! when the reader navigates: the pan anchor, the magnification, the
//! open page, the visible-area windows, the tile-creation counter, and
//! the debounce timers that coalesce bursts of movement into a single
//! recomputation.

use std::time::Instant;

use log::{debug, info};

use crate::config::ViewerConfig;
use crate::debounce::Debounce;
use crate::geometry::{FracRect, PixelSize};
use crate::manifest::PageSource;
use crate::page::{Page, PageContext, Side, TurnDirection};
use crate::slice::SliceRequest;
use crate::tile::TileKey;

/// Monotonic tile-creation counter.
///
/// Owned by the spread and passed by handle into page operations; the
/// horizon cache measures freshness against it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileCounter(u64);

impl TileCounter {
    /// Advance by one creation and return the new stamp.
    pub fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// Total tiles created so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.0
    }
}

/// Visible-area windows per spine side.
///
/// With `split == 2` the two sides of an open book occupy disjoint
/// horizontal halves of the double-wide zoomed surface, so each side
/// gets its own window; with a single-page layout all three coincide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaSet {
    pub full: FracRect,
    pub even: FracRect,
    pub odd: FracRect,
}

impl AreaSet {
    #[must_use]
    pub const fn whole() -> Self {
        Self {
            full: FracRect::FULL,
            even: FracRect::FULL,
            odd: FracRect::FULL,
        }
    }

    #[must_use]
    pub fn side(&self, side: Side) -> &FracRect {
        match side {
            Side::Even => &self.even,
            Side::Odd => &self.odd,
        }
    }
}

/// The pagination and zoom/pan state machine.
#[derive(Debug)]
pub struct Spread {
    pages: Vec<Page>,
    config: ViewerConfig,
    split: usize,
    open: usize,

    horizontal: f64,
    vertical: f64,
    magnification: f64,
    max_magnification: f64,
    scrollable: bool,

    areas: AreaSet,
    viewport: PixelSize,
    scroll: (f64, f64),

    counter: TileCounter,
    outbox: Vec<SliceRequest>,

    settle: Debounce,
    scroll_debounce: Debounce,
    pending_scroll: Option<(f64, f64)>,
}

impl Spread {
    #[must_use]
    pub fn new(sources: &[PageSource], config: ViewerConfig, viewport: PixelSize) -> Self {
        let split = config.split;
        let pages: Vec<Page> = sources
            .iter()
            .enumerate()
            .map(|(index, source)| Page::new(index, source, split))
            .collect();

        let requested = config.open.min(pages.len());
        let open = (requested + requested % split).min(pages.len());

        let mut spread = Self {
            pages,
            config,
            split,
            open,
            horizontal: 0.5,
            vertical: 0.5,
            magnification: 1.0,
            max_magnification: 1.0,
            scrollable: false,
            areas: AreaSet::whole(),
            viewport,
            scroll: (0.0, 0.0),
            counter: TileCounter::default(),
            outbox: Vec::new(),
            settle: Debounce::new(),
            scroll_debounce: Debounce::new(),
            pending_scroll: None,
        };
        spread.refresh_max();
        spread
    }

    /// Apply the starting settings; tiles follow after the first settle.
    pub fn start(&mut self, now: Instant) {
        info!(
            "spread mounted: {} pages, split {}, open {}",
            self.pages.len(),
            self.split,
            self.open
        );
        self.zoom(1.0, now);
    }

    /// Recompute the visible windows, then re-issue page states.
    pub fn update(&mut self) {
        self.recalc();
        self.redraw();
    }

    /// Derive the visible-area window set from the pan anchor and zoom.
    fn recalc(&mut self) {
        self.refresh_max();

        let overscan = 1.0 - 1.0 / self.magnification;
        let full = FracRect::new(
            overscan * self.horizontal,
            overscan * self.vertical,
            1.0 - overscan * (1.0 - self.horizontal),
            1.0 - overscan * (1.0 - self.vertical),
        );
        let (even, odd) = if self.split == 2 {
            // Each side sees one half of the double-wide surface.
            let odd = FracRect::new(full.left * 2.0, full.top, full.right * 2.0, full.bottom);
            let even = FracRect::new(odd.left - 1.0, odd.top, odd.right - 1.0, odd.bottom);
            (even, odd)
        } else {
            (full, full)
        };
        self.areas = AreaSet { full, even, odd };
        debug!(
            "windows recomputed: full ({:.3}, {:.3})-({:.3}, {:.3}) at x{:.2}",
            full.left, full.top, full.right, full.bottom, self.magnification
        );
    }

    /// Show the currently open pair, hide everything else.
    fn redraw(&mut self) {
        let even = self.open + self.open % self.split;
        let anchor = self.open;
        let (viewport, magnification, split) = (self.viewport, self.magnification, self.split);
        let Self {
            pages,
            counter,
            outbox,
            areas,
            config,
            ..
        } = self;

        for page in pages.iter_mut() {
            if page.index == even || page.index + 1 == even {
                let ctx = page_context(config, areas, viewport, magnification, split, page.bound);
                page.show(&ctx, counter, outbox);
            } else {
                page.hide(anchor);
            }
        }
    }

    /// Turn forward by one spread.
    pub fn next(&mut self) {
        let len = self.pages.len() as isize;
        let old_even = (self.open + self.open % self.split) as isize;
        let old_odd = old_even - 1;
        let new_even = old_even + self.split as isize;
        let new_odd = old_odd + self.split as isize;
        let anchor = self.open;
        let (viewport, magnification, split) = (self.viewport, self.magnification, self.split);
        let Self {
            pages,
            counter,
            outbox,
            areas,
            config,
            open,
            ..
        } = self;

        for page in pages.iter_mut() {
            let i = page.index as isize;
            if i < old_odd || i > old_even {
                page.hide(anchor);
            }
        }

        let in_range = |i: isize| i >= 0 && i < len;
        if in_range(old_odd) && pages[old_odd as usize].bound == Side::Odd {
            let ctx = page_context(config, areas, viewport, magnification, split, Side::Odd);
            pages[old_odd as usize].stay(TurnDirection::Increasing, &ctx, counter, outbox);
        }
        if in_range(new_odd) && pages[new_odd as usize].bound == Side::Odd {
            let ctx = page_context(config, areas, viewport, magnification, split, Side::Odd);
            pages[new_odd as usize].open(TurnDirection::Increasing, &ctx, counter, outbox);
        }
        if in_range(old_even) {
            pages[old_even as usize].close(TurnDirection::Increasing);
        }
        if in_range(new_even) {
            let bound = pages[new_even as usize].bound;
            let ctx = page_context(config, areas, viewport, magnification, split, bound);
            pages[new_even as usize].stay(TurnDirection::Increasing, &ctx, counter, outbox);
        }

        *open = if new_even < len {
            new_even as usize
        } else {
            pages.len()
        };
        info!("page turn forward: open {} -> {}", anchor, *open);
    }

    /// Turn back by one spread.
    pub fn previous(&mut self) {
        let len = self.pages.len() as isize;
        let old_even = (self.open + self.open % self.split) as isize;
        let old_odd = old_even - 1;
        let new_even = old_even - self.split as isize;
        let new_odd = old_odd - self.split as isize;
        let anchor = self.open;
        let (viewport, magnification, split) = (self.viewport, self.magnification, self.split);
        let Self {
            pages,
            counter,
            outbox,
            areas,
            config,
            open,
            ..
        } = self;

        for page in pages.iter_mut() {
            let i = page.index as isize;
            if i < old_odd || i > old_even {
                page.hide(anchor);
            }
        }

        let in_range = |i: isize| i >= 0 && i < len;
        if in_range(old_odd) && pages[old_odd as usize].bound == Side::Odd {
            pages[old_odd as usize].close(TurnDirection::Decreasing);
        }
        if in_range(new_odd) && pages[new_odd as usize].bound == Side::Odd {
            let ctx = page_context(config, areas, viewport, magnification, split, Side::Odd);
            pages[new_odd as usize].stay(TurnDirection::Decreasing, &ctx, counter, outbox);
        }
        if in_range(old_even) {
            let bound = pages[old_even as usize].bound;
            let ctx = page_context(config, areas, viewport, magnification, split, bound);
            pages[old_even as usize].stay(TurnDirection::Decreasing, &ctx, counter, outbox);
        }
        if in_range(new_even) {
            let bound = pages[new_even as usize].bound;
            let ctx = page_context(config, areas, viewport, magnification, split, bound);
            pages[new_even as usize].open(TurnDirection::Decreasing, &ctx, counter, outbox);
        }

        *open = if new_even >= 0 { new_even as usize } else { 0 };
        info!("page turn back: open {} -> {}", anchor, *open);
    }

    /// Jump straight to a page, normalized to the spread boundary.
    ///
    /// Jumping always lands at natural size.
    pub fn jump_to(&mut self, number: usize, now: Instant) {
        let clamped = number.min(self.pages.len());
        self.open = (clamped + clamped % self.split).min(self.pages.len());
        info!("page jump: open {}", self.open);
        self.zoom(1.0, now);
    }

    /// Resize the rendered surface to the new magnification and
    /// re-center on the stored anchor.
    pub fn zoom(&mut self, magnification: f64, now: Instant) {
        self.scrollable = magnification > 1.0;
        self.magnification = magnification;
        debug!("magnification set to x{magnification:.2}");
        self.move_to(None, None, now);
    }

    /// Re-anchor the viewport; `None` keeps the stored component.
    ///
    /// The settle recompute is debounced: every call cancels and
    /// restarts the timer, so only the final position of a burst is
    /// recomputed.
    pub fn move_to(&mut self, horizontal: Option<f64>, vertical: Option<f64>, now: Instant) {
        let h = horizontal.unwrap_or(self.horizontal);
        let v = vertical.unwrap_or(self.vertical);

        let surface = self.surface();
        self.scroll = (
            h * (surface.width - self.viewport.width),
            v * (surface.height - self.viewport.height),
        );
        self.horizontal = h;
        self.vertical = v;

        self.settle.schedule(now + self.config.duration());
    }

    /// Host-observed scroll of the rendered surface.
    ///
    /// Recomputation is debounced by the configured quiet period; only
    /// the last reported position is considered.
    pub fn scrolled(&mut self, scroll_left: f64, scroll_top: f64, now: Instant) {
        self.pending_scroll = Some((scroll_left, scroll_top));
        self.scroll_debounce.schedule(now + self.config.delay());
    }

    /// Fire due debounce deadlines. Returns true when a recomputation
    /// ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut updated = false;

        if self.scroll_debounce.fire(now) {
            if let Some((left, top)) = self.pending_scroll.take() {
                let surface = self.surface();
                let h = left / (surface.width - self.viewport.width);
                let v = top / (surface.height - self.viewport.height);
                // A zero-sized scroll range yields no finite anchor;
                // fall back to the centered default.
                self.horizontal = if h.is_finite() { h } else { 0.5 };
                self.vertical = if v.is_finite() { v } else { 0.5 };
                self.update();
                updated = true;
            }
        }

        if self.settle.fire(now) {
            self.update();
            updated = true;
        }

        updated
    }

    /// The earliest pending deadline, for host poll timeouts.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scroll_debounce.deadline(), self.settle.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Rendered surface size at the current magnification.
    #[must_use]
    pub fn surface(&self) -> PixelSize {
        PixelSize::new(
            self.viewport.width * self.magnification,
            self.viewport.height * self.magnification,
        )
    }

    pub(crate) fn set_viewport(&mut self, viewport: PixelSize) {
        self.viewport = viewport;
        self.refresh_max();
    }

    pub(crate) fn reveal_tile(&mut self, page: usize, key: &TileKey) -> bool {
        match self.pages.get_mut(page).and_then(|p| p.tile_mut(key)) {
            Some(tile) => {
                tile.reveal();
                true
            }
            None => {
                debug!("load report for unknown tile on page {page} ignored");
                false
            }
        }
    }

    /// Crop requests produced since the last drain.
    pub fn drain_requests(&mut self) -> Vec<SliceRequest> {
        std::mem::take(&mut self.outbox)
    }

    fn refresh_max(&mut self) {
        let max = self
            .pages
            .first()
            .map(|p| f64::from(p.height) / self.viewport.height)
            .unwrap_or(1.0);
        self.max_magnification = if max.is_finite() && max > 0.0 { max } else { 1.0 };
    }

    // Accessors used by the viewer façade, companion UI, and hosts.

    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    #[must_use]
    pub fn open(&self) -> usize {
        self.open
    }

    #[must_use]
    pub fn split(&self) -> usize {
        self.split
    }

    #[must_use]
    pub fn magnification(&self) -> f64 {
        self.magnification
    }

    #[must_use]
    pub fn max_magnification(&self) -> f64 {
        self.max_magnification
    }

    #[must_use]
    pub fn horizontal(&self) -> f64 {
        self.horizontal
    }

    #[must_use]
    pub fn vertical(&self) -> f64 {
        self.vertical
    }

    /// Whether the host should expose scroll affordances.
    #[must_use]
    pub fn scrollable(&self) -> bool {
        self.scrollable
    }

    #[must_use]
    pub fn areas(&self) -> &AreaSet {
        &self.areas
    }

    /// Scroll offsets applied to the external scrollable container.
    #[must_use]
    pub fn scroll_position(&self) -> (f64, f64) {
        self.scroll
    }

    #[must_use]
    pub fn tiles_created(&self) -> u64 {
        self.counter.count()
    }
}

fn page_context<'a>(
    config: &'a ViewerConfig,
    areas: &'a AreaSet,
    viewport: PixelSize,
    magnification: f64,
    split: usize,
    bound: Side,
) -> PageContext<'a> {
    PageContext {
        window: areas.side(bound),
        magnification,
        render_size: PixelSize::new(
            viewport.width * magnification / split as f64,
            viewport.height * magnification,
        ),
        tile_size: config.tile,
        cache_horizon: config.cache,
        template: &config.imageslice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PagePhase;
    use std::time::Duration;

    fn sources(count: usize) -> Vec<PageSource> {
        (0..count)
            .map(|i| PageSource {
                href: format!("pages/{i:03}.jpg"),
                width: 2000,
                height: 3000,
                bounds: FracRect::FULL,
                preview: format!("previews/{i:03}.jpg"),
            })
            .collect()
    }

    fn spread(count: usize) -> Spread {
        Spread::new(
            &sources(count),
            ViewerConfig::default(),
            PixelSize::new(800.0, 600.0),
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn window_spans_reciprocal_of_magnification() {
        let mut s = spread(4);

        s.update();
        assert_eq!(s.areas().full, FracRect::FULL);

        let now = Instant::now();
        s.zoom(2.0, now);
        s.update();
        let full = s.areas().full;
        assert_close(full.width(), 0.5);
        assert_close(full.height(), 0.5);
        // Centered on the default anchor.
        assert_close(full.left, 0.25);
        assert_close(full.top, 0.25);
    }

    #[test]
    fn window_follows_the_anchor() {
        let mut s = spread(4);
        let now = Instant::now();
        s.zoom(2.0, now);
        s.move_to(Some(0.0), Some(0.0), now);
        s.update();
        assert_eq!(s.areas().full, FracRect::new(0.0, 0.0, 0.5, 0.5));
    }

    #[test]
    fn side_windows_split_the_double_wide_surface() {
        let mut s = spread(4);
        s.update();

        let areas = *s.areas();
        assert_eq!(areas.odd, FracRect::new(0.0, 0.0, 2.0, 1.0));
        assert_eq!(areas.even, FracRect::new(-1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn single_page_layout_shares_one_window() {
        let config = ViewerConfig {
            split: 1,
            ..ViewerConfig::default()
        };
        let mut s = Spread::new(&sources(4), config, PixelSize::new(800.0, 600.0));
        s.update();
        assert_eq!(s.areas().even, s.areas().full);
        assert_eq!(s.areas().odd, s.areas().full);
    }

    #[test]
    fn next_advances_by_split_and_clamps() {
        let mut s = spread(10);
        s.jump_to(4, Instant::now());
        assert_eq!(s.open(), 4);

        s.next();
        assert_eq!(s.open(), 6);
        s.next();
        assert_eq!(s.open(), 8);
        s.next();
        assert_eq!(s.open(), 10);
        // Clamped at the page count; further turns are no-ops.
        s.next();
        assert_eq!(s.open(), 10);
        assert_eq!(s.open() % s.split(), 0);
    }

    #[test]
    fn previous_retreats_by_split_and_clamps() {
        let mut s = spread(10);
        s.jump_to(4, Instant::now());

        s.previous();
        assert_eq!(s.open(), 2);
        s.previous();
        assert_eq!(s.open(), 0);
        s.previous();
        assert_eq!(s.open(), 0);
    }

    #[test]
    fn turn_assigns_the_four_roles() {
        let mut s = spread(10);
        s.jump_to(4, Instant::now());
        s.next();

        assert_eq!(s.page(3).unwrap().phase(), PagePhase::Staying);
        assert_eq!(s.page(4).unwrap().phase(), PagePhase::Closed);
        assert_eq!(s.page(5).unwrap().phase(), PagePhase::Open);
        assert_eq!(s.page(6).unwrap().phase(), PagePhase::Staying);
        // Near the anchor: laid out but closed.
        assert_eq!(s.page(7).unwrap().phase(), PagePhase::Closed);
        // Beyond the layout window entirely.
        assert_eq!(s.page(8).unwrap().phase(), PagePhase::Hidden);
    }

    #[test]
    fn redraw_shows_only_the_open_pair() {
        let mut s = spread(10);
        s.jump_to(4, Instant::now());
        s.update();

        for page in s.pages() {
            let phase = page.phase();
            if page.index == 3 || page.index == 4 {
                assert_eq!(phase, PagePhase::Open, "page {}", page.index);
            } else {
                assert_ne!(phase, PagePhase::Open, "page {}", page.index);
            }
        }
    }

    #[test]
    fn jump_normalizes_to_spread_boundary_and_resets_zoom() {
        let mut s = spread(10);
        let now = Instant::now();
        s.zoom(2.0, now);
        s.jump_to(5, now);
        assert_eq!(s.open(), 6);
        assert_close(s.magnification(), 1.0);

        s.jump_to(9, now);
        assert_eq!(s.open(), 10);
    }

    #[test]
    fn settle_recompute_is_debounced_last_writer_wins() {
        let mut s = spread(4);
        let start = Instant::now();
        s.start(start);

        // A burst of moves: only the final anchor is recomputed.
        s.move_to(Some(0.1), Some(0.1), start);
        s.move_to(Some(0.2), Some(0.2), start + Duration::from_millis(100));
        s.move_to(Some(0.9), Some(0.9), start + Duration::from_millis(200));

        // The first deadline has passed, but it was superseded.
        assert!(!s.tick(start + Duration::from_millis(650)));
        assert!(s.tick(start + Duration::from_millis(800)));
        assert_close(s.horizontal(), 0.9);
    }

    #[test]
    fn scroll_recovers_the_anchor() {
        let mut s = spread(4);
        let now = Instant::now();
        s.zoom(2.0, now);
        // Surface 1600x1200, viewport 800x600: scroll range 800x600.
        s.scrolled(200.0, 300.0, now);
        assert!(s.tick(now + Duration::from_millis(250)));
        assert_close(s.horizontal(), 0.25);
        assert_close(s.vertical(), 0.5);
    }

    #[test]
    fn degenerate_scroll_range_falls_back_to_center() {
        let mut s = spread(4);
        let now = Instant::now();
        // Magnification 1: surface equals viewport, range is zero.
        s.scrolled(0.0, 0.0, now);
        assert!(s.tick(now + Duration::from_millis(250)));
        assert_close(s.horizontal(), 0.5);
        assert_close(s.vertical(), 0.5);
    }

    #[test]
    fn max_magnification_tracks_native_resolution() {
        let s = spread(4);
        // 3000px native height over a 600px viewport.
        assert_close(s.max_magnification(), 5.0);
    }

    #[test]
    fn scroll_position_tracks_anchor_and_surface() {
        let mut s = spread(4);
        let now = Instant::now();
        s.zoom(2.0, now);
        s.move_to(Some(1.0), Some(0.0), now);
        let (left, top) = s.scroll_position();
        assert_close(left, 800.0);
        assert_close(top, 0.0);
    }

    #[test]
    fn update_emits_slice_requests_for_open_pages() {
        let mut s = spread(4);
        s.jump_to(2, Instant::now());
        s.update();

        let requests = s.drain_requests();
        assert!(!requests.is_empty());
        assert!(requests.iter().all(|r| r.page == 1 || r.page == 2));
        // Drained: a second drain is empty.
        assert!(s.drain_requests().is_empty());
    }

    #[test]
    fn initial_open_is_normalized_and_clamped() {
        let config = ViewerConfig {
            open: 5,
            ..ViewerConfig::default()
        };
        let s = Spread::new(&sources(10), config, PixelSize::new(800.0, 600.0));
        assert_eq!(s.open(), 6);

        let config = ViewerConfig {
            open: 99,
            ..ViewerConfig::default()
        };
        let s = Spread::new(&sources(10), config, PixelSize::new(800.0, 600.0));
        assert_eq!(s.open(), 10);
    }
}
