//! A single cropped, resolution-tiered sub-image of a page.

use crate::geometry::FracRect;

/// Composite identity of a tile within its page.
///
/// The same spatial cell at two different zoom tiers is two distinct
/// tiles, so the magnification participates in the key. It is stored in
/// millionths to keep the key hashable and representation-stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub col: u32,
    pub row: u32,
    pub magnification_millionths: u32,
}

impl TileKey {
    #[must_use]
    pub fn new(col: u32, row: u32, magnification: f64) -> Self {
        Self {
            col,
            row,
            magnification_millionths: (magnification * 1_000_000.0) as u32,
        }
    }
}

/// One rectangular crop of a page at a specific resolution tier.
///
/// Geometry is fixed at creation; only the presentation flags change
/// afterwards. The tile is destroyed by eviction, never recycled.
#[derive(Clone, Debug)]
pub struct Tile {
    /// Fractional crop rectangle within the page.
    pub rect: FracRect,
    /// Requested crop width in pixels.
    pub width: f64,
    /// Requested crop height in pixels.
    pub height: f64,
    /// Zoom tier this tile was created for.
    pub magnification: f64,
    /// Creation-order stamp used by the horizon cache.
    pub index: u64,

    visible: bool,
    revealed: bool,
}

impl Tile {
    #[must_use]
    pub(crate) fn new(
        rect: FracRect,
        width: f64,
        height: f64,
        magnification: f64,
        index: u64,
    ) -> Self {
        Self {
            rect,
            width,
            height,
            magnification,
            index,
            visible: false,
            revealed: false,
        }
    }

    /// Toggle the presentation flag against the current window and zoom.
    ///
    /// Visible iff the tile's tier is at or below the current
    /// magnification and its rectangle intersects the window. No
    /// geometry is recomputed here.
    pub fn update_visibility(&mut self, window: &FracRect, magnification: f64) {
        self.visible = self.magnification <= magnification && self.rect.overlaps(window);
    }

    /// Whether the tile should currently be shown.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Whether the tile's image has finished loading.
    ///
    /// Starts out false; a failed load simply never flips it, so the
    /// tile stays in its unrevealed sub-state without affecting the
    /// containing page.
    #[must_use]
    pub fn revealed(&self) -> bool {
        self.revealed
    }

    /// Load-complete callback from the render host.
    pub fn reveal(&mut self) {
        self.revealed = true;
    }

    /// Stacking-order hint: higher tiers render above lower ones.
    #[must_use]
    pub fn stacking(&self) -> i32 {
        (self.magnification * 100.0).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(rect: FracRect, magnification: f64) -> Tile {
        Tile::new(rect, 256.0, 256.0, magnification, 1)
    }

    #[test]
    fn key_distinguishes_zoom_tiers() {
        let at_one = TileKey::new(3, 2, 1.0);
        let at_two = TileKey::new(3, 2, 2.0);
        assert_ne!(at_one, at_two);
        assert_eq!(at_one, TileKey::new(3, 2, 1.0));
    }

    #[test]
    fn key_survives_fractional_magnification() {
        let a = TileKey::new(0, 0, 1.1);
        let b = TileKey::new(0, 0, 1.1);
        assert_eq!(a, b);
        assert_eq!(a.magnification_millionths, 1_100_000);
    }

    #[test]
    fn visibility_requires_tier_at_or_below_current() {
        let window = FracRect::FULL;
        let mut coarse = tile(FracRect::new(0.0, 0.0, 0.5, 0.5), 1.0);
        let mut fine = tile(FracRect::new(0.0, 0.0, 0.5, 0.5), 2.0);

        coarse.update_visibility(&window, 1.0);
        fine.update_visibility(&window, 1.0);
        assert!(coarse.visible());
        assert!(!fine.visible());

        coarse.update_visibility(&window, 2.0);
        fine.update_visibility(&window, 2.0);
        assert!(coarse.visible());
        assert!(fine.visible());
    }

    #[test]
    fn visibility_requires_window_overlap() {
        let mut t = tile(FracRect::new(0.0, 0.0, 0.25, 0.25), 1.0);

        t.update_visibility(&FracRect::new(0.5, 0.5, 1.0, 1.0), 1.0);
        assert!(!t.visible());

        t.update_visibility(&FracRect::new(0.2, 0.2, 1.0, 1.0), 1.0);
        assert!(t.visible());
    }

    #[test]
    fn reveal_is_one_way() {
        let mut t = tile(FracRect::FULL, 1.0);
        assert!(!t.revealed());
        t.reveal();
        assert!(t.revealed());
    }

    #[test]
    fn stacking_orders_by_tier() {
        assert_eq!(tile(FracRect::FULL, 1.0).stacking(), 100);
        assert_eq!(tile(FracRect::FULL, 2.5).stacking(), 250);
    }
}
