//! scorenav: staff-system detection and reading-position navigation for
//! rendered sheet music.
//!
//! A page raster goes through a detector, which produces the Y coordinates
//! ("anchors") where systems start. A [`Navigator`] caches anchors per page,
//! lets the user correct them, persists them to a sidecar file and steps
//! through them in reading order, producing scroll fractions for a viewport.
//!
//! # Example
//! ```no_run
//! use scorenav::{ImageSequence, Layout, Navigator, NavigatorConfig};
//!
//! let doc = ImageSequence::open("scans/etude").unwrap();
//! let mut nav = Navigator::open(doc, NavigatorConfig::default(), "scans/etude").unwrap();
//! nav.start();
//! nav.next();
//! // After the viewport has laid out the page:
//! let fraction = nav.on_layout(&Layout::new(400.0, 2200.0));
//! println!("scroll to {fraction:?}, overlay {:?}", nav.anchors());
//! ```

pub mod anchors;
pub mod config;
pub mod detect;
pub mod document;
pub mod error;
pub mod navigator;
pub mod profile;
pub mod scroll;
pub mod store;

use std::path::Path;

use image::RgbImage;

pub use anchors::{AnchorList, PageAnchorMap, Toggle};
pub use config::{DetectorConfig, NavigatorConfig};
pub use detect::{Detector, SystemDetector};
pub use document::{ImageSequence, PageRasterizer, PageSet};
pub use error::{Error, Result};
pub use navigator::{Cursor, Navigator, Step};
pub use scroll::{scroll_fraction, Layout, ScrollOffset};
pub use store::SessionMode;

/// Detect the system anchors of one page, falling back to the detector's
/// default anchor when nothing is found.
pub fn detect_anchors(page: &RgbImage, config: &DetectorConfig) -> Vec<u32> {
    Detector::from_config(config).detect_with_fallback(page)
}

/// Load a page image from disk and detect its anchors.
pub fn detect_file<P: AsRef<Path>>(path: P, config: &DetectorConfig) -> Result<Vec<u32>> {
    let page = image::open(path.as_ref())?.to_rgb8();
    Ok(detect_anchors(&page, config))
}

/// Convert anchors to a JSON array. Useful for passing data across FFI
/// boundaries.
pub fn anchors_to_json(anchors: &[u32]) -> String {
    serde_json::to_string(anchors).unwrap_or_else(|_| "[]".to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for embedding in a native viewer
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Detect anchors on a packed RGB8 page buffer and return them as a JSON
/// array string. The caller must free the result with `scorenav_free_string`.
///
/// `config_json` is a detector configuration (e.g. `{"kind":"row_run"}`);
/// pass null for the default trough detector. Returns null on invalid input,
/// including a configuration that fails validation.
///
/// # Safety
/// `data` must point to `len` valid bytes. `config_json` must be null or a
/// valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn scorenav_detect_rgb(
    data: *const u8,
    len: usize,
    width: u32,
    height: u32,
    config_json: *const c_char,
) -> *mut c_char {
    if data.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    let Some(page) = RgbImage::from_raw(width, height, bytes.to_vec()) else {
        return std::ptr::null_mut();
    };

    let config = if config_json.is_null() {
        DetectorConfig::default()
    } else {
        let parsed = unsafe { CStr::from_ptr(config_json) }
            .to_str()
            .ok()
            .and_then(|json| serde_json::from_str::<DetectorConfig>(json).ok())
            .filter(|config| config.validate().is_ok());
        match parsed {
            Some(config) => config,
            None => return std::ptr::null_mut(),
        }
    };

    let json = anchors_to_json(&detect_anchors(&page, &config));
    CString::new(json).unwrap_or_default().into_raw()
}

/// Normalized scroll position for an anchor, with the anchor placed
/// `offset_ratio × viewport_height` below the top of the viewport.
#[no_mangle]
pub extern "C" fn scorenav_scroll_fraction(
    target_y: f64,
    viewport_height: f64,
    content_height: f64,
    offset_ratio: f64,
) -> f64 {
    scroll_fraction(
        target_y,
        viewport_height,
        content_height,
        ScrollOffset::Ratio(offset_ratio),
    )
}

/// Free a string previously returned by scorenav functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorenav function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorenav_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
