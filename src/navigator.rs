//! Reading-position navigation over the systems of a document.
//!
//! The navigator owns the per-page anchor cache for one open document and a
//! cursor `(page, anchor)`. Stepping forward past the last system of a page
//! enters the next page at its first system; stepping backward past the
//! first system enters the previous page at its *last* system. Both ends of
//! the document are no-ops.
//!
//! In [`SessionMode::Editor`] pages are analysed the first time they are
//! entered and the result is cached; edits only touch the cache. In
//! [`SessionMode::Player`] the anchors come from a sidecar file and pages
//! without stored anchors are skipped.
//!
//! Every move arms a pending scroll. The viewport reports its geometry with
//! [`Navigator::on_layout`] once it has laid out the new content, and only
//! then is the scroll fraction computed.

use std::collections::BTreeSet;
use std::path::Path;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::anchors::{AnchorList, PageAnchorMap, Toggle};
use crate::config::NavigatorConfig;
use crate::detect::{Detector, SystemDetector};
use crate::document::PageRasterizer;
use crate::error::Result;
use crate::scroll::{Layout, PendingScroll};
use crate::store::{self, SessionMode};

/// Current reading position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page: usize,
    pub anchor: usize,
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing changed (end of document, or no navigable page).
    Stay,
    Moved {
        cursor: Cursor,
        /// Anchor the viewport will be scrolled to, if the page has one.
        target_y: Option<u32>,
        /// The newly entered page, handed to the viewport for display.
        /// `None` when the step stayed on the same page.
        page_image: Option<RgbImage>,
    },
}

impl Step {
    pub fn is_moved(&self) -> bool {
        matches!(self, Step::Moved { .. })
    }

    pub fn page_changed(&self) -> bool {
        matches!(
            self,
            Step::Moved {
                page_image: Some(_),
                ..
            }
        )
    }

    pub fn cursor(&self) -> Option<Cursor> {
        match self {
            Step::Moved { cursor, .. } => Some(*cursor),
            Step::Stay => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Where the cursor lands on a newly entered page and how it scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    FirstAnchor,
    LastAnchor,
    PageTop,
}

pub struct Navigator<R: PageRasterizer> {
    rasterizer: R,
    detector: Detector,
    config: NavigatorConfig,
    mode: SessionMode,
    anchors: PageAnchorMap,
    faulted: BTreeSet<usize>,
    cursor: Option<Cursor>,
    pending: Option<PendingScroll>,
}

impl<R: PageRasterizer> Navigator<R> {
    /// Navigator that detects systems on each page as it is first visited.
    pub fn editor(rasterizer: R, config: NavigatorConfig) -> Result<Self> {
        Self::with_mode(rasterizer, config, SessionMode::Editor, PageAnchorMap::new())
    }

    /// Navigator that replays previously saved anchors.
    pub fn player(rasterizer: R, config: NavigatorConfig, anchors: PageAnchorMap) -> Result<Self> {
        Self::with_mode(rasterizer, config, SessionMode::Player, anchors)
    }

    /// Open `document` in the mode its sidecar file selects: playback when
    /// the sidecar exists, editing otherwise.
    pub fn open<P: AsRef<Path>>(
        rasterizer: R,
        config: NavigatorConfig,
        document: P,
    ) -> Result<Self> {
        let sidecar = store::sidecar_path(document, &config.sidecar_extension);
        match SessionMode::for_sidecar(&sidecar) {
            SessionMode::Player => {
                let anchors = store::load(&sidecar)?;
                Self::player(rasterizer, config, anchors)
            }
            SessionMode::Editor => Self::editor(rasterizer, config),
        }
    }

    fn with_mode(
        rasterizer: R,
        config: NavigatorConfig,
        mode: SessionMode,
        anchors: PageAnchorMap,
    ) -> Result<Self> {
        config.validate()?;
        let detector = Detector::from_config(&config.detector);
        info!(
            ?mode,
            pages = rasterizer.page_count(),
            detector = detector.name(),
            "navigator ready"
        );
        Ok(Self {
            rasterizer,
            detector,
            config,
            mode,
            anchors,
            faulted: BTreeSet::new(),
            cursor: None,
            pending: None,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn page_count(&self) -> usize {
        self.rasterizer.page_count()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Anchor overlay for the current page.
    pub fn anchors(&self) -> &[u32] {
        self.current_list().map(AnchorList::as_slice).unwrap_or(&[])
    }

    pub fn anchor_map(&self) -> &PageAnchorMap {
        &self.anchors
    }

    /// Pages that failed to render and are skipped.
    pub fn faulted_pages(&self) -> &BTreeSet<usize> {
        &self.faulted
    }

    /// Anchor under the cursor.
    pub fn target_y(&self) -> Option<u32> {
        let cursor = self.cursor?;
        self.anchors.get(&cursor.page)?.get(cursor.anchor)
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Enter the first navigable page at its first system.
    pub fn start(&mut self) -> Step {
        self.enter_from(None, Direction::Forward, Landing::FirstAnchor)
    }

    /// Advance to the next system, crossing into the next page if needed.
    pub fn next(&mut self) -> Step {
        self.settle_drag();
        let Some(cursor) = self.cursor else {
            return self.start();
        };
        let len = self.current_list().map_or(0, AnchorList::len);
        if cursor.anchor + 1 < len {
            return self.move_within_page(cursor.page, cursor.anchor + 1);
        }
        self.enter_from(Some(cursor.page), Direction::Forward, Landing::FirstAnchor)
    }

    /// Go back one system, crossing into the previous page's last system
    /// if needed.
    pub fn previous(&mut self) -> Step {
        self.settle_drag();
        let Some(cursor) = self.cursor else {
            return Step::Stay;
        };
        if cursor.anchor > 0 {
            return self.move_within_page(cursor.page, cursor.anchor - 1);
        }
        self.enter_from(Some(cursor.page), Direction::Backward, Landing::LastAnchor)
    }

    /// Flip to the next page, scrolled to its top.
    pub fn next_page(&mut self) -> Step {
        self.settle_drag();
        let from = self.cursor.map(|c| c.page);
        self.enter_from(from, Direction::Forward, Landing::PageTop)
    }

    /// Flip to the previous page, scrolled to its top.
    pub fn previous_page(&mut self) -> Step {
        self.settle_drag();
        match self.cursor {
            Some(cursor) => {
                self.enter_from(Some(cursor.page), Direction::Backward, Landing::PageTop)
            }
            None => Step::Stay,
        }
    }

    /// Jump straight to `page`. Stays put if the page cannot be entered.
    pub fn goto_page(&mut self, page: usize) -> Step {
        self.settle_drag();
        if !self.is_navigable(page) {
            return Step::Stay;
        }
        self.try_enter(page, Landing::PageTop).unwrap_or(Step::Stay)
    }

    /// Resolve the pending scroll against the viewport's settled layout.
    /// Returns `None` when no move happened since the last call.
    pub fn on_layout(&mut self, layout: &Layout) -> Option<f64> {
        let pending = self.pending.take()?;
        let fraction = pending.resolve(layout, self.config.scroll);
        debug!(?pending, fraction, "scroll resolved");
        Some(fraction)
    }

    fn move_within_page(&mut self, page: usize, anchor: usize) -> Step {
        let cursor = Cursor { page, anchor };
        self.cursor = Some(cursor);
        let target_y = self.target_y();
        self.pending = target_y.map(PendingScroll::Anchor);
        debug!(page, anchor, ?target_y, "moved to system");
        Step::Moved {
            cursor,
            target_y,
            page_image: None,
        }
    }

    /// Enter the nearest navigable page after (or before) `from`, skipping
    /// pages that fail to render.
    fn enter_from(&mut self, from: Option<usize>, direction: Direction, landing: Landing) -> Step {
        let count = self.page_count();
        let mut candidate = match (from, direction) {
            (None, Direction::Forward) => Some(0),
            (None, Direction::Backward) => count.checked_sub(1),
            (Some(page), Direction::Forward) => page.checked_add(1),
            (Some(page), Direction::Backward) => page.checked_sub(1),
        };

        while let Some(page) = candidate.filter(|&p| p < count) {
            if self.is_navigable(page) {
                if let Some(step) = self.try_enter(page, landing) {
                    return step;
                }
            }
            candidate = match direction {
                Direction::Forward => page.checked_add(1),
                Direction::Backward => page.checked_sub(1),
            };
        }

        debug!(?from, ?direction, "no page to enter");
        Step::Stay
    }

    fn is_navigable(&self, page: usize) -> bool {
        if page >= self.page_count() || self.faulted.contains(&page) {
            return false;
        }
        match self.mode {
            SessionMode::Editor => true,
            SessionMode::Player => self.anchors.get(&page).is_some_and(|a| !a.is_empty()),
        }
    }

    /// Render `page`, analysing it if it has no cached anchors yet. A render
    /// failure marks the page faulted and returns `None`.
    fn try_enter(&mut self, page: usize, landing: Landing) -> Option<Step> {
        let image = match self.rasterizer.render_page(page, self.config.render_dpi) {
            Ok(image) => image,
            Err(e) => {
                warn!(page, error = %e, "page failed to render, skipping");
                self.faulted.insert(page);
                return None;
            }
        };

        if self.mode == SessionMode::Editor && !self.anchors.contains_key(&page) {
            let detected = self.detector.detect(&image);
            let list = AnchorList::seeded(detected, self.detector.fallback_anchor());
            info!(
                page,
                anchors = list.len(),
                detector = self.detector.name(),
                "detected systems"
            );
            self.anchors.insert(page, list);
        }

        let len = self.anchors.get(&page).map_or(0, AnchorList::len);
        let anchor = match landing {
            Landing::LastAnchor => len.saturating_sub(1),
            Landing::FirstAnchor | Landing::PageTop => 0,
        };
        let cursor = Cursor { page, anchor };
        self.cursor = Some(cursor);
        let target_y = self.target_y();
        self.pending = Some(match (landing, target_y) {
            (Landing::PageTop, _) | (_, None) => PendingScroll::Top,
            (_, Some(y)) => PendingScroll::Anchor(y),
        });

        debug!(page, anchor, ?landing, "entered page");
        Some(Step::Moved {
            cursor,
            target_y,
            page_image: Some(image),
        })
    }

    // ── Editing ─────────────────────────────────────────────────────

    fn current_list(&self) -> Option<&AnchorList> {
        self.anchors.get(&self.cursor?.page)
    }

    fn current_list_mut(&mut self) -> Option<&mut AnchorList> {
        let page = self.cursor?.page;
        Some(self.anchors.entry(page).or_default())
    }

    /// Whether `y` is over an anchor of the current page.
    pub fn hover(&self, y: f64) -> bool {
        self.current_list()
            .is_some_and(|list| list.is_hit(y, self.config.hit_tolerance))
    }

    /// Remove the anchor at `y` on the current page, or add one.
    pub fn toggle_at(&mut self, y: f64) -> Option<Toggle> {
        let tolerance = self.config.hit_tolerance;
        let outcome = self.current_list_mut()?.toggle(y, tolerance);
        debug!(?outcome, "anchor toggled");
        self.clamp_cursor();
        Some(outcome)
    }

    pub fn begin_drag(&mut self, y: f64) -> bool {
        let tolerance = self.config.hit_tolerance;
        self.current_list_mut()
            .is_some_and(|list| list.begin_drag(y, tolerance))
    }

    pub fn drag_to(&mut self, y: f64) -> bool {
        self.current_list_mut().is_some_and(|list| list.drag_to(y))
    }

    pub fn end_drag(&mut self) -> bool {
        let ended = self.current_list_mut().is_some_and(AnchorList::end_drag);
        self.clamp_cursor();
        ended
    }

    /// Drop an anchor still held on the current page, restoring its order
    /// before the cursor moves.
    fn settle_drag(&mut self) {
        let Some(page) = self.cursor.map(|c| c.page) else {
            return;
        };
        if self.anchors.get_mut(&page).is_some_and(AnchorList::end_drag) {
            debug!(page, "drag released by navigation");
            self.clamp_cursor();
        }
    }

    /// Keep the cursor inside the current page's list after an edit.
    fn clamp_cursor(&mut self) {
        let len = self.current_list().map_or(0, AnchorList::len);
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.anchor = cursor.anchor.min(len.saturating_sub(1));
        }
    }

    // ── Persistence & lifecycle ─────────────────────────────────────

    /// Write every cached page's anchors to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        store::save(path, &self.anchors, self.page_count())
    }

    /// Swap in a new document. The anchor cache and page faults are reset;
    /// `stored` anchors switch the navigator into playback.
    pub fn replace_document(&mut self, rasterizer: R, stored: Option<PageAnchorMap>) {
        self.rasterizer = rasterizer;
        self.faulted.clear();
        self.cursor = None;
        self.pending = None;
        (self.mode, self.anchors) = match stored {
            Some(anchors) => (SessionMode::Player, anchors),
            None => (SessionMode::Editor, PageAnchorMap::new()),
        };
        info!(mode = ?self.mode, pages = self.page_count(), "document replaced");
    }

    /// Close the session, returning the anchor cache.
    pub fn into_anchors(self) -> PageAnchorMap {
        self.anchors
    }
}
