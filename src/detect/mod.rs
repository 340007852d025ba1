//! System detection: turns a rendered page into ordered anchor Y values.
//!
//! Three detector families share one capability, [`SystemDetector`]:
//! - [`TroughDetector`]: local minima of the band density profile
//! - [`RowRunDetector`]: contiguous runs of inked rows separated by blank gaps
//! - [`ClefDetector`]: multi-scale template matching of a clef glyph in the
//!   left margin
//!
//! Which one runs is a configuration choice ([`DetectorConfig`]); the
//! [`Detector`] enum dispatches to it.

mod clef;
mod row_run;
mod trough;

pub use clef::ClefDetector;
pub use row_run::{find_run_starts, RowRunDetector};
pub use trough::{find_troughs, TroughDetector};

use image::RgbImage;

use crate::config::DetectorConfig;

/// Something that can locate system anchors on a page image.
pub trait SystemDetector {
    /// Ascending anchors in page-image pixels. May be empty.
    fn detect(&self, page: &RgbImage) -> Vec<u32>;

    /// Anchor used when detection finds nothing, so every page has a stop.
    fn fallback_anchor(&self) -> u32;

    fn detect_with_fallback(&self, page: &RgbImage) -> Vec<u32> {
        let anchors = self.detect(page);
        if anchors.is_empty() {
            vec![self.fallback_anchor()]
        } else {
            anchors
        }
    }
}

/// A detector selected by configuration.
#[derive(Debug, Clone)]
pub enum Detector {
    Trough(TroughDetector),
    RowRun(RowRunDetector),
    Clef(ClefDetector),
}

impl Detector {
    /// Build the configured detector. The clef glyph, if any, is loaded here
    /// once and reused for every page.
    pub fn from_config(config: &DetectorConfig) -> Self {
        match config {
            DetectorConfig::Trough(c) => Detector::Trough(TroughDetector::new(c.clone())),
            DetectorConfig::RowRun(c) => Detector::RowRun(RowRunDetector::new(c.clone())),
            DetectorConfig::Clef(c) => Detector::Clef(ClefDetector::new(c.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Detector::Trough(_) => "trough",
            Detector::RowRun(_) => "row_run",
            Detector::Clef(_) => "clef",
        }
    }
}

impl SystemDetector for Detector {
    fn detect(&self, page: &RgbImage) -> Vec<u32> {
        match self {
            Detector::Trough(d) => d.detect(page),
            Detector::RowRun(d) => d.detect(page),
            Detector::Clef(d) => d.detect(page),
        }
    }

    fn fallback_anchor(&self) -> u32 {
        match self {
            Detector::Trough(d) => d.fallback_anchor(),
            Detector::RowRun(d) => d.fallback_anchor(),
            Detector::Clef(d) => d.fallback_anchor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClefConfig, RowRunConfig, TroughConfig};
    use image::Rgb;

    #[test]
    fn blank_page_falls_back_per_family() {
        let page = RgbImage::from_pixel(200, 1000, Rgb([255, 255, 255]));

        // Every blank band is a trough; only the separation thins them out.
        let trough = Detector::from_config(&DetectorConfig::default());
        assert_eq!(trough.name(), "trough");
        assert_eq!(trough.detect_with_fallback(&page), vec![10, 265, 520, 775]);

        let unseeded = Detector::from_config(&DetectorConfig::Trough(TroughConfig {
            top_seed: None,
            density_floor: 0.0,
            ..TroughConfig::default()
        }));
        assert!(unseeded.detect(&page).is_empty());
        assert_eq!(unseeded.detect_with_fallback(&page), vec![10]);

        let rows = Detector::from_config(&DetectorConfig::RowRun(RowRunConfig::default()));
        assert!(rows.detect(&page).is_empty());
        assert_eq!(rows.detect_with_fallback(&page), vec![100]);

        let clef = Detector::from_config(&DetectorConfig::Clef(ClefConfig::default()));
        assert!(clef.detect(&page).is_empty());
        assert_eq!(clef.detect_with_fallback(&page), vec![100]);
    }
}
