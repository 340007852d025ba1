//! Scroll-target math: turns an anchor into a normalized viewport position.
//!
//! Scrolling is a two-phase protocol. A navigation step arms a
//! [`PendingScroll`]; the viewport answers once its layout has settled with a
//! [`Layout`] snapshot, and only then is the fraction computed. Computing it
//! in the same step that swaps the page would measure a stale content height.

use serde::{Deserialize, Serialize};

/// How far above the viewport's top edge the target anchor is placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ScrollOffset {
    /// Fraction of the viewport height (`0.0` puts the anchor flush with the top).
    Ratio(f64),
    /// Fixed distance in content units.
    Pixels(f64),
}

impl Default for ScrollOffset {
    fn default() -> Self {
        ScrollOffset::Ratio(0.0)
    }
}

impl ScrollOffset {
    fn amount(self, viewport_height: f64) -> f64 {
        match self {
            ScrollOffset::Ratio(k) => k * viewport_height,
            ScrollOffset::Pixels(px) => px,
        }
    }
}

/// Geometry reported by the viewport after a layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub viewport_height: f64,
    pub content_height: f64,
    /// Content units per page-image pixel (the page may be shown scaled to fit).
    pub content_scale: f64,
}

impl Layout {
    pub fn new(viewport_height: f64, content_height: f64) -> Self {
        Self {
            viewport_height,
            content_height,
            content_scale: 1.0,
        }
    }

    pub fn with_scale(mut self, content_scale: f64) -> Self {
        self.content_scale = content_scale;
        self
    }
}

/// A scroll request waiting for the next settled layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingScroll {
    Top,
    /// Anchor Y in page-image pixels.
    Anchor(u32),
}

impl PendingScroll {
    pub fn resolve(self, layout: &Layout, offset: ScrollOffset) -> f64 {
        match self {
            PendingScroll::Top => 0.0,
            PendingScroll::Anchor(y) => {
                let scale = if layout.content_scale.is_finite() && layout.content_scale > 0.0 {
                    layout.content_scale
                } else {
                    1.0
                };
                scroll_fraction(
                    f64::from(y) * scale,
                    layout.viewport_height,
                    layout.content_height,
                    offset,
                )
            }
        }
    }
}

/// Normalized scroll position placing `target_y` at the configured offset.
///
/// Always in `[0, 1]`. Content that fits the viewport yields `0`.
pub fn scroll_fraction(
    target_y: f64,
    viewport_height: f64,
    content_height: f64,
    offset: ScrollOffset,
) -> f64 {
    let range = content_height - viewport_height;
    if !(range.is_finite() && range > 0.0) {
        return 0.0;
    }
    let position = (target_y - offset.amount(viewport_height)) / range;
    if position.is_nan() {
        return 0.0;
    }
    position.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_offset_example() {
        let f = scroll_fraction(600.0, 300.0, 1200.0, ScrollOffset::Ratio(0.10));
        assert!((f - 570.0 / 900.0).abs() < 1e-9, "got {f}");
    }

    #[test]
    fn flush_top() {
        let f = scroll_fraction(450.0, 300.0, 1200.0, ScrollOffset::Ratio(0.0));
        assert!((f - 0.5).abs() < 1e-9);
    }

    #[test]
    fn pixel_offset() {
        let f = scroll_fraction(490.0, 300.0, 1200.0, ScrollOffset::Pixels(40.0));
        assert!((f - 0.5).abs() < 1e-9);
    }

    #[test]
    fn content_fitting_viewport_does_not_scroll() {
        assert_eq!(scroll_fraction(500.0, 800.0, 800.0, ScrollOffset::Ratio(0.33)), 0.0);
        assert_eq!(scroll_fraction(500.0, 800.0, 100.0, ScrollOffset::Ratio(0.0)), 0.0);
    }

    #[test]
    fn clamps_to_unit_interval() {
        let cases = [
            (0.0, 300.0, 1200.0, ScrollOffset::Ratio(0.33)),
            (5000.0, 300.0, 1200.0, ScrollOffset::Ratio(0.0)),
            (-100.0, 10.0, 20.0, ScrollOffset::Pixels(-1e9)),
            (f64::INFINITY, 10.0, 20.0, ScrollOffset::Ratio(0.1)),
            (f64::NAN, 10.0, 20.0, ScrollOffset::Ratio(0.1)),
            (100.0, 10.0, f64::INFINITY, ScrollOffset::Ratio(0.1)),
        ];
        for (t, vh, ch, k) in cases {
            let f = scroll_fraction(t, vh, ch, k);
            assert!((0.0..=1.0).contains(&f), "{t} {vh} {ch} {k:?} -> {f}");
        }
    }

    #[test]
    fn pending_anchor_uses_content_scale() {
        let layout = Layout::new(300.0, 1200.0).with_scale(0.5);
        let f = PendingScroll::Anchor(900).resolve(&layout, ScrollOffset::Ratio(0.0));
        assert!((f - 0.5).abs() < 1e-9);
        assert_eq!(PendingScroll::Top.resolve(&layout, ScrollOffset::Ratio(0.0)), 0.0);
    }
}
