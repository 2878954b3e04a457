//! Top-level viewer façade.
//!
//! Owns one spread, exposes the public navigation API (the only
//! operations external collaborators call), maintains the aspect ratio
//! of the mounted document, and relays host layout events. All inputs
//! are clamped or recovered; no navigation call is ever rejected.

use std::time::Instant;

use log::{info, warn};
use thiserror::Error;

use crate::config::{ConfigError, ViewerConfig};
use crate::debounce::Debounce;
use crate::geometry::PixelSize;
use crate::manifest::PageSource;
use crate::slice::SliceRequest;
use crate::spread::Spread;
use crate::tile::TileKey;

/// Errors raised while mounting a viewer.
#[derive(Debug, Error)]
pub enum MountError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("document lists no pages")]
    EmptyDocument,
}

/// Pull-based state snapshot for companion UI.
///
/// The toolbar reads this when it refreshes; the engine never pushes
/// state outward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Status {
    /// 1-based page number to display, capped at the page count.
    pub page_display: usize,
    pub page_count: usize,
    pub magnification: f64,
    pub max_magnification: f64,
    pub can_next: bool,
    pub can_previous: bool,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
}

impl Status {
    /// Interpret a typed page-number entry (1-based) as a target index.
    ///
    /// Malformed input yields `None`; the caller re-renders the current
    /// state without mutating anything.
    #[must_use]
    pub fn parse_page_entry(entry: &str) -> Option<usize> {
        entry
            .trim()
            .parse::<usize>()
            .ok()
            .map(|n| n.saturating_sub(1))
    }
}

/// The viewer façade: one spread plus the public navigation surface.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    aspect: f64,
    viewport: PixelSize,
    spread: Spread,
    resize: Debounce,
    pending_width: Option<f64>,
}

impl Viewer {
    /// Mount a document: derive the aspect ratio from the first page,
    /// size the viewport, and apply the starting settings.
    pub fn mount(
        sources: &[PageSource],
        config: ViewerConfig,
        viewport_width: f64,
        now: Instant,
    ) -> Result<Self, MountError> {
        config.validate()?;
        let first = sources.first().ok_or(MountError::EmptyDocument)?;

        let aspect = aspect_ratio(first.width, first.height, config.split);
        let viewport = PixelSize::new(viewport_width, viewport_width * aspect);
        let mut spread = Spread::new(sources, config.clone(), viewport);
        spread.start(now);

        info!(
            "viewer mounted: {} pages, viewport {:.0}x{:.0}",
            sources.len(),
            viewport.width,
            viewport.height
        );
        Ok(Self {
            config,
            aspect,
            viewport,
            spread,
            resize: Debounce::new(),
            pending_width: None,
        })
    }

    /// Zoom by a multiplicative factor.
    pub fn zoom_by(&mut self, factor: f64, now: Instant) {
        self.zoom_to(self.spread.magnification() * factor, now);
    }

    /// Zoom to an absolute factor, clamped to the valid range.
    pub fn zoom_to(&mut self, factor: f64, now: Instant) {
        let factor = if factor.is_finite() { factor } else { 1.0 };
        let clamped = factor.max(1.0).min(self.spread.max_magnification());
        self.spread.zoom(clamped, now);
    }

    /// Pan by pixel deltas, normalized to fractions of the rendered
    /// surface before delegating.
    pub fn move_by(&mut self, dx: f64, dy: f64, now: Instant) {
        let surface = self.spread.surface();
        let h = normalized_delta(dx * self.config.split as f64, surface.width);
        let v = normalized_delta(dy, surface.height);
        self.move_to(
            self.spread.horizontal() - h,
            self.spread.vertical() - v,
            now,
        );
    }

    /// Pan to an absolute anchor, clamped to `[0, 1]` per axis.
    pub fn move_to(&mut self, horizontal: f64, vertical: f64, now: Instant) {
        let h = clamp_anchor(horizontal, self.spread.horizontal());
        let v = clamp_anchor(vertical, self.spread.vertical());
        self.spread.move_to(Some(h), Some(v), now);
    }

    /// Turn pages by a relative amount; `±1` are true page turns, any
    /// other delta is a direct jump.
    pub fn page_by(&mut self, delta: i64, now: Instant) {
        match delta {
            1 => self.spread.next(),
            -1 => self.spread.previous(),
            _ => self.page_to(self.spread.open() as i64 + delta, now),
        }
    }

    /// Jump to a page number, clamped and normalized to the spread
    /// boundary; lands at natural size.
    pub fn page_to(&mut self, number: i64, now: Instant) {
        let clamped = number.clamp(0, self.spread.pages().len() as i64) as usize;
        self.spread.jump_to(clamped, now);
    }

    /// Fan-out refresh after any externally observed resize/settle
    /// event. Companion UI and input enablement are pull-based
    /// snapshots, so refreshing the spread refreshes everything they
    /// will observe.
    pub fn update(&mut self) {
        self.spread.update();
    }

    /// Host-observed viewport resize, debounced by the quiet period.
    /// The height is re-derived from the document's aspect ratio.
    pub fn resized(&mut self, width: f64, now: Instant) {
        self.pending_width = Some(width);
        self.resize.schedule(now + self.config.delay());
    }

    /// Host-observed scroll of the rendered surface.
    pub fn scrolled(&mut self, scroll_left: f64, scroll_top: f64, now: Instant) {
        self.spread.scrolled(scroll_left, scroll_top, now);
    }

    /// Fire due debounce deadlines. Returns true when a recomputation
    /// ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut updated = false;
        if self.resize.fire(now) {
            if let Some(width) = self.pending_width.take() {
                self.viewport = PixelSize::new(width, width * self.aspect);
                self.spread.set_viewport(self.viewport);
                self.update();
                updated = true;
            }
        }
        let spread_updated = self.spread.tick(now);
        updated || spread_updated
    }

    /// The earliest pending deadline, for host poll timeouts.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.resize.deadline(), self.spread.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Load-complete report for a previously requested tile. Unknown
    /// tiles (already evicted, or never created) are silently ignored.
    pub fn tile_loaded(&mut self, page: usize, key: &TileKey) {
        let _ = self.spread.reveal_tile(page, key);
    }

    /// Crop requests produced since the last drain.
    pub fn drain_requests(&mut self) -> Vec<SliceRequest> {
        self.spread.drain_requests()
    }

    /// Companion-UI snapshot.
    #[must_use]
    pub fn status(&self) -> Status {
        let spread = &self.spread;
        let len = spread.pages().len();
        Status {
            page_display: (spread.open() + 1).min(len),
            page_count: len,
            magnification: spread.magnification(),
            max_magnification: spread.max_magnification(),
            can_next: spread.open() + 1 < len,
            can_previous: spread.open() > 0,
            can_zoom_in: spread.magnification() < spread.max_magnification(),
            can_zoom_out: spread.magnification() > 1.0,
        }
    }

    #[must_use]
    pub fn spread(&self) -> &Spread {
        &self.spread
    }

    #[must_use]
    pub fn viewport(&self) -> PixelSize {
        self.viewport
    }

    #[must_use]
    pub fn aspect(&self) -> f64 {
        self.aspect
    }
}

/// Aspect of one spread side: page height over width, divided across
/// the split.
fn aspect_ratio(width: u32, height: u32, split: usize) -> f64 {
    let aspect = f64::from(height) / f64::from(width) / split as f64;
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        warn!("degenerate first-page size {width}x{height}, aspect falls back to 1");
        1.0
    }
}

fn normalized_delta(px: f64, extent: f64) -> f64 {
    let frac = px / extent;
    if frac.is_finite() { frac } else { 0.0 }
}

fn clamp_anchor(value: f64, previous: f64) -> f64 {
    if value.is_nan() {
        previous
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FracRect;
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

    fn viewer(count: usize) -> (Viewer, Instant) {
        let now = Instant::now();
        let v = Viewer::mount(&sources(count), ViewerConfig::default(), 800.0, now).unwrap();
        (v, now)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn mount_derives_viewport_from_aspect() {
        let (v, _) = viewer(4);
        // 3000/2000 halved across the two-page split.
        assert_close(v.aspect(), 0.75);
        assert_close(v.viewport().height, 600.0);
    }

    #[test]
    fn mount_rejects_empty_documents() {
        let err = Viewer::mount(&[], ViewerConfig::default(), 800.0, Instant::now()).unwrap_err();
        assert!(matches!(err, MountError::EmptyDocument));
    }

    #[test]
    fn mount_rejects_invalid_config() {
        let config = ViewerConfig {
            split: 0,
            ..ViewerConfig::default()
        };
        let err = Viewer::mount(&sources(2), config, 800.0, Instant::now()).unwrap_err();
        assert!(matches!(err, MountError::Config(_)));
    }

    #[test]
    fn zoom_is_clamped_to_limits() {
        let (mut v, now) = viewer(4);
        // Native 3000px over a 600px viewport.
        assert_close(v.spread().max_magnification(), 5.0);

        v.zoom_to(99.0, now);
        assert_close(v.spread().magnification(), 5.0);

        v.zoom_to(0.01, now);
        assert_close(v.spread().magnification(), 1.0);

        v.zoom_to(f64::NAN, now);
        assert_close(v.spread().magnification(), 1.0);
    }

    #[test]
    fn zoom_by_multiplies_the_current_factor() {
        let (mut v, now) = viewer(4);
        v.zoom_to(2.0, now);
        v.zoom_by(1.5, now);
        assert_close(v.spread().magnification(), 3.0);
    }

    #[test]
    fn move_is_clamped_per_axis() {
        let (mut v, now) = viewer(4);
        v.move_to(-0.5, 1.5, now);
        assert_close(v.spread().horizontal(), 0.0);
        assert_close(v.spread().vertical(), 1.0);
    }

    #[test]
    fn nan_anchor_keeps_the_previous_position() {
        let (mut v, now) = viewer(4);
        v.move_to(0.3, 0.7, now);
        v.move_to(f64::NAN, f64::NAN, now);
        assert_close(v.spread().horizontal(), 0.3);
        assert_close(v.spread().vertical(), 0.7);
    }

    #[test]
    fn move_by_normalizes_pixel_deltas() {
        let (mut v, now) = viewer(4);
        // Surface 800x600 at natural size; the horizontal delta spans
        // the split.
        v.move_by(80.0, -60.0, now);
        assert_close(v.spread().horizontal(), 0.3);
        assert_close(v.spread().vertical(), 0.6);
    }

    #[test]
    fn page_by_unit_deltas_are_turns() {
        let (mut v, now) = viewer(10);
        v.page_by(1, now);
        assert_eq!(v.spread().open(), 2);
        v.page_by(-1, now);
        assert_eq!(v.spread().open(), 0);
    }

    #[test]
    fn page_by_other_deltas_jump() {
        let (mut v, now) = viewer(10);
        v.zoom_to(3.0, now);
        v.page_by(3, now);
        assert_eq!(v.spread().open(), 4);
        // Jumps land at natural size.
        assert_close(v.spread().magnification(), 1.0);
    }

    #[test]
    fn page_to_clamps_out_of_range_targets() {
        let (mut v, now) = viewer(10);
        v.page_to(-5, now);
        assert_eq!(v.spread().open(), 0);
        v.page_to(999, now);
        assert_eq!(v.spread().open(), 10);
    }

    #[test]
    fn resize_is_debounced_and_keeps_aspect() {
        let (mut v, now) = viewer(4);
        v.resized(1000.0, now);
        v.resized(1200.0, now + Duration::from_millis(100));

        assert!(!v.tick(now + Duration::from_millis(200)));
        assert!(v.tick(now + Duration::from_millis(350)));
        assert_close(v.viewport().width, 1200.0);
        assert_close(v.viewport().height, 900.0);
        // The zoom ceiling follows the new viewport.
        assert_close(v.spread().max_magnification(), 3000.0 / 900.0);
    }

    #[test]
    fn status_reports_enablement_edges() {
        let (mut v, now) = viewer(10);

        let status = v.status();
        assert_eq!(status.page_display, 1);
        assert_eq!(status.page_count, 10);
        assert!(status.can_next);
        assert!(!status.can_previous);
        assert!(status.can_zoom_in);
        assert!(!status.can_zoom_out);

        v.page_to(999, now);
        let status = v.status();
        assert_eq!(status.page_display, 10);
        assert!(!status.can_next);
        assert!(status.can_previous);

        v.zoom_to(5.0, now);
        let status = v.status();
        assert!(!status.can_zoom_in);
        assert!(status.can_zoom_out);
    }

    #[test]
    fn malformed_page_entry_is_recovered_locally() {
        assert_eq!(Status::parse_page_entry("7"), Some(6));
        assert_eq!(Status::parse_page_entry(" 12 "), Some(11));
        assert_eq!(Status::parse_page_entry("0"), Some(0));
        assert_eq!(Status::parse_page_entry("seven"), None);
        assert_eq!(Status::parse_page_entry(""), None);
    }

    #[test]
    fn tile_load_reports_for_unknown_tiles_are_ignored() {
        let (mut v, _) = viewer(4);
        // No tiles exist yet; this must not panic or mutate anything.
        v.tile_loaded(0, &TileKey::new(0, 0, 1.0));
        assert_eq!(v.spread().tiles_created(), 0);
    }
}
