//! Editable per-page anchor lists.
//!
//! An [`AnchorList`] is kept sorted and free of duplicates after every
//! mutation. The one exception is an active drag: while the user moves an
//! anchor the list may be transiently out of order, and it is normalized
//! again when the drag ends.

use std::collections::BTreeMap;

/// Anchors of every page seen so far, keyed by 0-based page index.
pub type PageAnchorMap = BTreeMap<usize, AnchorList>;

/// Outcome of [`AnchorList::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Removed(u32),
    Inserted(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorList {
    anchors: Vec<u32>,
    dragging: Option<usize>,
}

/// Convert a UI coordinate to an anchor, truncating and clamping at 0.
pub fn to_anchor(y: f64) -> u32 {
    if y.is_finite() && y > 0.0 {
        y as u32
    } else {
        0
    }
}

impl AnchorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized list from anchors in any order.
    pub fn from_unsorted(anchors: Vec<u32>) -> Self {
        let mut list = Self {
            anchors,
            dragging: None,
        };
        list.normalize();
        list
    }

    /// Detected anchors, or a single `fallback` when detection found none.
    pub fn seeded(detected: Vec<u32>, fallback: u32) -> Self {
        if detected.is_empty() {
            Self::from_unsorted(vec![fallback])
        } else {
            Self::from_unsorted(detected)
        }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.anchors.get(index).copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.anchors.len().checked_sub(1)
    }

    /// Index of the first anchor strictly closer than `tolerance` to `y`.
    pub fn find_nearest(&self, y: f64, tolerance: f64) -> Option<usize> {
        self.anchors
            .iter()
            .position(|&a| (f64::from(a) - y).abs() < tolerance)
    }

    pub fn is_hit(&self, y: f64, tolerance: f64) -> bool {
        self.find_nearest(y, tolerance).is_some()
    }

    /// Remove the anchor under `y`, or add one there if none is close.
    pub fn toggle(&mut self, y: f64, tolerance: f64) -> Toggle {
        let outcome = match self.find_nearest(y, tolerance) {
            Some(index) => Toggle::Removed(self.anchors.remove(index)),
            None => {
                let anchor = to_anchor(y);
                self.anchors.push(anchor);
                Toggle::Inserted(anchor)
            }
        };
        self.normalize();
        outcome
    }

    /// Overwrite one anchor without re-sorting. Used while dragging.
    pub fn move_to(&mut self, index: usize, y: f64) -> bool {
        match self.anchors.get_mut(index) {
            Some(anchor) => {
                *anchor = to_anchor(y);
                true
            }
            None => false,
        }
    }

    /// Pick up the anchor under `y`. Returns whether one was hit.
    pub fn begin_drag(&mut self, y: f64, tolerance: f64) -> bool {
        self.dragging = self.find_nearest(y, tolerance);
        self.dragging.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn drag_to(&mut self, y: f64) -> bool {
        match self.dragging {
            Some(index) => self.move_to(index, y),
            None => false,
        }
    }

    /// Drop the dragged anchor and restore ordering.
    pub fn end_drag(&mut self) -> bool {
        let was_dragging = self.dragging.take().is_some();
        if was_dragging {
            self.normalize();
        }
        was_dragging
    }

    fn normalize(&mut self) {
        self.anchors.sort_unstable();
        self.anchors.dedup();
    }
}

impl From<Vec<u32>> for AnchorList {
    fn from(anchors: Vec<u32>) -> Self {
        Self::from_unsorted(anchors)
    }
}
