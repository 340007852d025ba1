//! Row-run detection: a cheaper single-threshold approximation of the trough
//! detector. Rows with enough ink belong to a system; a run of such rows that
//! starts after a long enough blank gap opens a new system, and its anchor
//! sits in the middle of that gap.

use image::RgbImage;
use tracing::debug;

use super::SystemDetector;
use crate::config::RowRunConfig;
use crate::profile::row_ink_fractions;

#[derive(Debug, Clone)]
pub struct RowRunDetector {
    config: RowRunConfig,
}

impl RowRunDetector {
    pub fn new(config: RowRunConfig) -> Self {
        Self { config }
    }
}

impl SystemDetector for RowRunDetector {
    fn detect(&self, page: &RgbImage) -> Vec<u32> {
        let fractions = row_ink_fractions(page, self.config.ink_cutoff);
        let anchors = find_run_starts(&fractions, &self.config);
        debug!(
            rows = fractions.len(),
            anchors = anchors.len(),
            "row-run detection finished"
        );
        anchors
    }

    fn fallback_anchor(&self) -> u32 {
        self.config.fallback_anchor
    }
}

/// Anchors for every inked run preceded by at least `min_blank_run` blank
/// rows. The first run on the page always counts; its gap starts at row 0.
pub fn find_run_starts(row_fractions: &[f64], config: &RowRunConfig) -> Vec<u32> {
    let mut anchors: Vec<u32> = Vec::new();
    let mut in_system = false;
    let mut seen_run = false;
    let mut gap_start = 0u32;

    for (y, &fraction) in row_fractions.iter().enumerate() {
        let y = y as u32;
        let inked = fraction > config.row_threshold;

        if inked && !in_system {
            in_system = true;
            let gap = y - gap_start;
            if seen_run && gap < config.min_blank_run {
                continue;
            }
            seen_run = true;

            let anchor = gap_start + gap / 2;
            match anchors.last() {
                Some(&last) if anchor < last.saturating_add(config.min_separation) => {}
                _ => anchors.push(anchor),
            }
        } else if !inked && in_system {
            in_system = false;
            gap_start = y;
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(len: usize, inked: &[std::ops::Range<usize>]) -> Vec<f64> {
        let mut fractions = vec![0.0; len];
        for range in inked {
            for f in &mut fractions[range.clone()] {
                *f = 0.5;
            }
        }
        fractions
    }

    fn config(min_blank_run: u32, min_separation: u32) -> RowRunConfig {
        RowRunConfig {
            min_blank_run,
            min_separation,
            ..RowRunConfig::default()
        }
    }

    #[test]
    fn anchors_sit_mid_gap() {
        let f = rows(1000, &[100..200, 400..500, 800..900]);
        assert_eq!(find_run_starts(&f, &config(50, 0)), vec![50, 300, 650]);
    }

    #[test]
    fn short_gaps_stay_inside_the_system() {
        // Staves of one system separated by a 30-row gap.
        let f = rows(1000, &[100..200, 230..330, 600..700]);
        assert_eq!(find_run_starts(&f, &config(50, 0)), vec![50, 465]);
    }

    #[test]
    fn close_anchors_are_suppressed() {
        let f = rows(1000, &[100..200, 260..300, 700..800]);
        assert_eq!(find_run_starts(&f, &config(50, 200)), vec![50, 500]);
    }

    #[test]
    fn ink_at_top_edge() {
        let f = rows(300, &[0..40, 200..260]);
        assert_eq!(find_run_starts(&f, &config(50, 0)), vec![0, 120]);
    }

    #[test]
    fn threshold_is_exclusive() {
        let f = vec![0.01; 100];
        assert!(find_run_starts(&f, &RowRunConfig::default()).is_empty());
    }
}
