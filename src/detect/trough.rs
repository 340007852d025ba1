//! Density-trough detection.
//!
//! Whitespace between systems shows up as bands of near-zero ink density.
//! A band is a trough when it is below the density floor and no band within
//! the search radius is strictly emptier. Margins are skipped because
//! headers and page numbers make them unreliable, and accepted troughs must
//! be well separated so a long run of blank bands yields a single anchor.

use image::RgbImage;
use tracing::debug;

use super::SystemDetector;
use crate::config::TroughConfig;
use crate::profile::{density_profile, DensityProfile};

#[derive(Debug, Clone)]
pub struct TroughDetector {
    config: TroughConfig,
}

impl TroughDetector {
    pub fn new(config: TroughConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TroughConfig {
        &self.config
    }
}

impl SystemDetector for TroughDetector {
    fn detect(&self, page: &RgbImage) -> Vec<u32> {
        let profile = density_profile(page, self.config.band_height, self.config.ink_cutoff);
        let anchors = find_troughs(&profile, &self.config);
        debug!(
            bands = profile.len(),
            anchors = anchors.len(),
            "trough detection finished"
        );
        anchors
    }

    fn fallback_anchor(&self) -> u32 {
        self.config.fallback_anchor
    }
}

/// Extract trough anchors from a density profile.
///
/// The result starts with the configured top seed (if any) and is strictly
/// increasing, each anchor more than `min_separation` past the previous one.
pub fn find_troughs(profile: &DensityProfile, config: &TroughConfig) -> Vec<u32> {
    let densities = &profile.densities;
    let mut anchors: Vec<u32> = config.top_seed.into_iter().collect();

    let len = densities.len();
    let margin = (len as f64 * config.margin_ratio) as usize;
    if len <= margin * 2 {
        return anchors;
    }

    let radius = config.search_radius;
    for i in margin..len - margin {
        let density = densities[i];
        if density >= config.density_floor {
            continue;
        }

        let lo = i.saturating_sub(radius);
        let hi = i.saturating_add(radius).min(len - 1);
        if densities[lo..=hi].iter().any(|&other| other < density) {
            continue;
        }

        let y = profile.band_to_y(i);
        match anchors.last() {
            Some(&last) if y <= last.saturating_add(config.min_separation) => {}
            _ => anchors.push(y),
        }
    }

    anchors
}
