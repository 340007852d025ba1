//! Sidecar anchor files.
//!
//! A document's anchors live next to it in a plain text file with the same
//! stem. Multi-page documents store one `page:y` record per line; single-page
//! documents store bare `y` lines. Records are written grouped by page in
//! ascending order, and ascending within a page.
//!
//! ```text
//! 0:50
//! 0:400
//! 1:20
//! ```
//!
//! The existence of the sidecar also decides how a document is opened: with
//! stored anchors it is played back, without them it is edited.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::anchors::{AnchorList, PageAnchorMap};
use crate::error::{Error, Result};

/// Whether a document is opened for placing anchors or for playing them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Editor,
    Player,
}

impl SessionMode {
    pub fn for_sidecar(sidecar: &Path) -> Self {
        if sidecar.is_file() {
            SessionMode::Player
        } else {
            SessionMode::Editor
        }
    }
}

/// Sidecar path for a document: its extension replaced by `extension`.
pub fn sidecar_path<P: AsRef<Path>>(document: P, extension: &str) -> PathBuf {
    document.as_ref().with_extension(extension)
}

/// Render the sidecar text for `map`.
///
/// `page_count` selects the record format: bare `y` lines for a single-page
/// document, `page:y` lines otherwise.
pub fn to_sidecar_string(map: &PageAnchorMap, page_count: usize) -> String {
    let paged = page_count != 1;
    let mut out = String::new();
    for (page, anchors) in map {
        let mut ys = anchors.as_slice().to_vec();
        ys.sort_unstable();
        for y in ys {
            if paged {
                let _ = writeln!(out, "{page}:{y}");
            } else {
                let _ = writeln!(out, "{y}");
            }
        }
    }
    out
}

/// Parse sidecar text. Bare `y` records belong to page 0. Lines that do not
/// parse are skipped.
pub fn parse_sidecar(text: &str) -> PageAnchorMap {
    let mut pages: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
    let mut skipped = 0usize;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_record(line) {
            Some((page, y)) => pages.entry(page).or_default().push(y),
            None => {
                skipped += 1;
                debug!(
                    line = line_no + 1,
                    content = line,
                    "skipping malformed sidecar record"
                );
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "sidecar contained malformed records");
    }

    pages
        .into_iter()
        .map(|(page, ys)| (page, AnchorList::from_unsorted(ys)))
        .collect()
}

fn parse_record(line: &str) -> Option<(usize, u32)> {
    match line.split_once(':') {
        Some((page, y)) => Some((page.trim().parse().ok()?, y.trim().parse().ok()?)),
        None => Some((0, line.parse().ok()?)),
    }
}

pub fn save<P: AsRef<Path>>(path: P, map: &PageAnchorMap, page_count: usize) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_sidecar_string(map, page_count)).map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), pages = map.len(), "saved sidecar");
    Ok(())
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<PageAnchorMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let map = parse_sidecar(&text);
    debug!(path = %path.display(), pages = map.len(), "loaded sidecar");
    Ok(map)
}
