//! Gesture boundary.
//!
//! Raw pointer/touch normalization happens outside the engine; what
//! arrives here are semantic gestures. An input source is anything that
//! can be polled for them: a real gesture recognizer in a host, or a
//! scripted sequence in tests.

use std::time::Instant;

use crate::viewer::Viewer;

/// Zoom rate applied per wheel step.
pub const WHEEL_ZOOM_RATE: f64 = 1.1;

/// A normalized gesture emitted by an input source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    SwipeLeft,
    SwipeRight,
    /// Pointer drag with pixel deltas.
    Drag { horizontal: f64, vertical: f64 },
    /// Pinch with a relative scale delta.
    Pinch { scale: f64 },
    /// Wheel turn in zoom steps; negative steps zoom out.
    Wheel { steps: i32 },
}

/// Source of normalized gestures.
pub trait InputSource {
    /// The next pending gesture, if any.
    fn poll(&mut self) -> Option<Gesture>;
}

/// Scripted gesture source for tests and dry runs.
pub struct SimulatedInputSource {
    gestures: Vec<Gesture>,
    next: usize,
}

impl SimulatedInputSource {
    #[must_use]
    pub fn new(gestures: Vec<Gesture>) -> Self {
        Self { gestures, next: 0 }
    }
}

impl InputSource for SimulatedInputSource {
    fn poll(&mut self) -> Option<Gesture> {
        let gesture = self.gestures.get(self.next).copied();
        if gesture.is_some() {
            self.next += 1;
        }
        gesture
    }
}

/// Apply one gesture to the viewer.
///
/// Swipes turn pages only at natural size; while zoomed in, horizontal
/// movement belongs to panning.
pub fn apply(viewer: &mut Viewer, gesture: Gesture, now: Instant) {
    match gesture {
        Gesture::SwipeLeft => {
            if viewer.spread().magnification() == 1.0 {
                viewer.page_by(1, now);
            }
        }
        Gesture::SwipeRight => {
            if viewer.spread().magnification() == 1.0 {
                viewer.page_by(-1, now);
            }
        }
        Gesture::Drag {
            horizontal,
            vertical,
        } => {
            viewer.move_by(horizontal.round(), vertical.round(), now);
        }
        Gesture::Pinch { scale } => {
            viewer.zoom_by(1.0 + scale, now);
        }
        Gesture::Wheel { steps } => {
            viewer.zoom_by(WHEEL_ZOOM_RATE.powi(steps), now);
        }
    }
}

/// Drain an input source into the viewer.
pub fn pump(viewer: &mut Viewer, source: &mut dyn InputSource, now: Instant) {
    while let Some(gesture) = source.poll() {
        apply(viewer, gesture, now);
    }
}
