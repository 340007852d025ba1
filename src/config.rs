//! Tunable parameters for detection, editing and scrolling.
//!
//! Every struct implements `Default` with the values the detectors were
//! tuned with, and deserializes with `#[serde(default)]`, so a JSON file
//! only needs to name the fields it overrides:
//!
//! ```
//! use scorenav::config::{DetectorConfig, NavigatorConfig};
//!
//! let config = NavigatorConfig::from_json_str(
//!     r#"{ "detector": { "kind": "row_run", "min_blank_run": 40 },
//!          "scroll": { "mode": "ratio", "value": 0.33 } }"#,
//! ).unwrap();
//! assert!(matches!(config.detector, DetectorConfig::RowRun(ref c) if c.min_blank_run == 40));
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scroll::ScrollOffset;

/// Resolution pages are rasterized at for analysis and display.
pub const ANALYSIS_DPI: u32 = 150;
/// Hit-test distance for toggling and dragging anchors, in page pixels.
pub const DEFAULT_HIT_TOLERANCE: f64 = 20.0;
pub const DEFAULT_SIDECAR_EXTENSION: &str = "txt";
/// Largest trough neighbourhood accepted, in bands.
pub const MAX_SEARCH_RADIUS: usize = 10_000;

/// Top-level configuration for a navigation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub render_dpi: u32,
    pub hit_tolerance: f64,
    /// Extension that replaces the document's own to name the sidecar file.
    pub sidecar_extension: String,
    pub detector: DetectorConfig,
    pub scroll: ScrollOffset,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            render_dpi: ANALYSIS_DPI,
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
            sidecar_extension: DEFAULT_SIDECAR_EXTENSION.to_string(),
            detector: DetectorConfig::default(),
            scroll: ScrollOffset::default(),
        }
    }
}

impl NavigatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Reject values the detectors cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.render_dpi == 0 {
            return Err(Error::Config("render_dpi must be positive".into()));
        }
        if !(self.hit_tolerance.is_finite() && self.hit_tolerance > 0.0) {
            return Err(Error::Config(format!(
                "hit_tolerance must be a positive number, got {}",
                self.hit_tolerance
            )));
        }
        if self.sidecar_extension.is_empty() {
            return Err(Error::Config("sidecar_extension must not be empty".into()));
        }
        self.detector.validate()
    }
}

/// Which detector family to run, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorConfig {
    Trough(TroughConfig),
    RowRun(RowRunConfig),
    Clef(ClefConfig),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::Trough(TroughConfig::default())
    }
}

impl DetectorConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            DetectorConfig::Trough(c) => {
                if c.band_height == 0 {
                    return Err(Error::Config("band_height must be positive".into()));
                }
                if c.search_radius > MAX_SEARCH_RADIUS {
                    return Err(Error::Config(format!(
                        "search_radius must be at most {MAX_SEARCH_RADIUS}, got {}",
                        c.search_radius
                    )));
                }
                if !(0.0..0.5).contains(&c.margin_ratio) {
                    return Err(Error::Config(format!(
                        "margin_ratio must be in [0, 0.5), got {}",
                        c.margin_ratio
                    )));
                }
            }
            DetectorConfig::RowRun(c) => {
                if !(0.0..1.0).contains(&c.row_threshold) {
                    return Err(Error::Config(format!(
                        "row_threshold must be in [0, 1), got {}",
                        c.row_threshold
                    )));
                }
            }
            DetectorConfig::Clef(c) => {
                if c.scales.is_empty() || c.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                    return Err(Error::Config("scales must be non-empty and positive".into()));
                }
                if !(0.0..=1.0).contains(&c.margin_ratio) {
                    return Err(Error::Config(format!(
                        "margin_ratio must be in [0, 1], got {}",
                        c.margin_ratio
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Parameters of the density-trough detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TroughConfig {
    /// Rows per density band.
    pub band_height: u32,
    /// Luminance at or below which a pixel counts as ink.
    pub ink_cutoff: u8,
    /// Neighbourhood (in bands, each side) a trough must be minimal in.
    pub search_radius: usize,
    /// Bands at or above this density are never troughs.
    pub density_floor: f64,
    /// Fraction of bands ignored at the top and the bottom of the page.
    pub margin_ratio: f64,
    /// An anchor must lie strictly more than this many pixels past the previous one.
    pub min_separation: u32,
    /// Anchor inserted before detection so the first system is always reachable.
    pub top_seed: Option<u32>,
    pub fallback_anchor: u32,
}

impl Default for TroughConfig {
    fn default() -> Self {
        Self {
            band_height: 5,
            ink_cutoff: 200,
            search_radius: 50,
            density_floor: 0.05,
            margin_ratio: 0.10,
            min_separation: 250,
            top_seed: Some(10),
            fallback_anchor: 10,
        }
    }
}

/// Parameters of the contiguous row-run detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowRunConfig {
    pub ink_cutoff: u8,
    /// A row belongs to a system when its ink fraction exceeds this.
    pub row_threshold: f64,
    /// Blank rows required before a run starts a new system.
    pub min_blank_run: u32,
    pub min_separation: u32,
    pub fallback_anchor: u32,
}

impl Default for RowRunConfig {
    fn default() -> Self {
        Self {
            ink_cutoff: 149,
            row_threshold: 0.01,
            min_blank_run: 50,
            min_separation: 200,
            fallback_anchor: 100,
        }
    }
}

/// Parameters of the clef template matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClefConfig {
    /// Reference glyph image. `None` disables matching.
    pub glyph_path: Option<PathBuf>,
    /// Glyph scale factors, tried in order.
    pub scales: Vec<f64>,
    /// Minimum normalized correlation for a match.
    pub threshold: f32,
    /// Fraction of the page width (from the left) a match may start in.
    pub margin_ratio: f64,
    /// Matches closer than this to an accepted anchor are dropped.
    pub min_separation: u32,
    pub fallback_anchor: u32,
}

impl Default for ClefConfig {
    fn default() -> Self {
        Self {
            glyph_path: None,
            scales: vec![0.6, 0.8, 1.0, 1.2, 1.4],
            threshold: 0.50,
            margin_ratio: 0.12,
            min_separation: 200,
            fallback_anchor: 100,
        }
    }
}
