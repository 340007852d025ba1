//! Clef template matching.
//!
//! Every system starts with a clef in the left margin, so matching a
//! reference clef glyph there locates system starts directly. The glyph is
//! tried at several scales; the response is the zero-mean normalized cross
//! correlation, which is 1.0 for an exact (brightness/contrast-invariant)
//! match and undefined, treated as 0, over blank paper.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use tracing::{debug, warn};

use super::SystemDetector;
use crate::config::ClefConfig;

/// Variance below this is treated as a flat (blank) window.
const FLAT_VARIANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ClefDetector {
    config: ClefConfig,
    glyph: Option<GrayImage>,
}

impl ClefDetector {
    /// Create a detector, loading the glyph named by the configuration.
    /// A missing or unreadable glyph leaves the detector without one.
    pub fn new(config: ClefConfig) -> Self {
        let glyph = config.glyph_path.as_deref().and_then(load_glyph);
        Self { config, glyph }
    }

    /// Create a detector around an already decoded glyph.
    pub fn with_glyph(config: ClefConfig, glyph: GrayImage) -> Self {
        Self {
            config,
            glyph: Some(glyph),
        }
    }

    pub fn has_glyph(&self) -> bool {
        self.glyph.is_some()
    }
}

fn load_glyph(path: &Path) -> Option<GrayImage> {
    match image::open(path) {
        Ok(img) => Some(img.to_luma8()),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "clef glyph unavailable, template matching disabled"
            );
            None
        }
    }
}

impl SystemDetector for ClefDetector {
    fn detect(&self, page: &RgbImage) -> Vec<u32> {
        let Some(glyph) = &self.glyph else {
            debug!("no clef glyph loaded, skipping template match");
            return Vec::new();
        };

        let gray = imageops::grayscale(page);
        let (page_w, page_h) = gray.dimensions();
        let margin_w = (f64::from(page_w) * self.config.margin_ratio).ceil() as u32;
        if margin_w == 0 || glyph.width() == 0 || glyph.height() == 0 {
            return Vec::new();
        }

        let sums = IntegralSums::new(&gray);
        let mut anchors: Vec<u32> = Vec::new();

        for &scale in &self.config.scales {
            let tw = (f64::from(glyph.width()) * scale).round().max(1.0) as u32;
            let th = (f64::from(glyph.height()) * scale).round().max(1.0) as u32;
            if tw > page_w || th > page_h {
                continue;
            }
            let resized;
            let template_img = if (tw, th) == glyph.dimensions() {
                glyph
            } else {
                resized = imageops::resize(glyph, tw, th, FilterType::Triangle);
                &resized
            };
            let Some(template) = Template::new(template_img) else {
                debug!(scale, "clef glyph is flat at this scale");
                continue;
            };

            let max_x = (page_w - tw).min(margin_w - 1);
            for y in 0..=page_h - th {
                for x in 0..=max_x {
                    let score = template.correlate(&gray, &sums, x, y);
                    if score <= self.config.threshold {
                        continue;
                    }
                    let center = y + th / 2;
                    let separated = anchors
                        .iter()
                        .all(|&a| a.abs_diff(center) >= self.config.min_separation);
                    if separated {
                        debug!(scale, x, y, score, center, "clef match");
                        anchors.push(center);
                    }
                }
            }
        }

        anchors.sort_unstable();
        anchors
    }

    fn fallback_anchor(&self) -> u32 {
        self.config.fallback_anchor
    }
}

/// Summed-area tables of pixel values and squared values, used to get the
/// mean and variance of any window in constant time.
struct IntegralSums {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl IntegralSums {
    fn new(gray: &GrayImage) -> Self {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sum_sq = vec![0.0; stride * (h + 1)];
        let raw = gray.as_raw();
        for y in 0..h {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = f64::from(raw[y * w + x]);
                row += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// (sum, sum of squares) over the `w × h` window at `(x, y)`.
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let s = self.stride;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let area = |t: &[f64]| t[y1 * s + x1] - t[y0 * s + x1] - t[y1 * s + x0] + t[y0 * s + x0];
        (area(self.sum.as_slice()), area(self.sum_sq.as_slice()))
    }
}

/// A glyph with its mean removed.
struct Template {
    width: u32,
    height: u32,
    centered: Vec<f64>,
    norm_sq: f64,
}

impl Template {
    fn new(img: &GrayImage) -> Option<Self> {
        let n = img.as_raw().len() as f64;
        let mean = img.as_raw().iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let centered: Vec<f64> = img.as_raw().iter().map(|&v| f64::from(v) - mean).collect();
        let norm_sq: f64 = centered.iter().map(|v| v * v).sum();
        if norm_sq < FLAT_VARIANCE {
            return None;
        }
        Some(Self {
            width: img.width(),
            height: img.height(),
            centered,
            norm_sq,
        })
    }

    fn correlate(&self, gray: &GrayImage, sums: &IntegralSums, x: u32, y: u32) -> f32 {
        let n = f64::from(self.width * self.height);
        let (sum, sum_sq) = sums.window(x, y, self.width, self.height);
        let window_var = sum_sq - sum * sum / n;
        if window_var < FLAT_VARIANCE {
            return 0.0;
        }

        let page_w = gray.width() as usize;
        let raw = gray.as_raw();
        let tw = self.width as usize;
        let mut dot = 0.0;
        for row in 0..self.height as usize {
            let start = (y as usize + row) * page_w + x as usize;
            let page_row = &raw[start..start + tw];
            let template_row = &self.centered[row * tw..(row + 1) * tw];
            dot += page_row
                .iter()
                .zip(template_row)
                .map(|(&p, &t)| f64::from(p) * t)
                .sum::<f64>();
        }
        (dot / (self.norm_sq * window_var).sqrt()) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// A crude clef: a vertical stroke with a blob near the bottom.
    fn glyph() -> GrayImage {
        GrayImage::from_fn(16, 40, |x, y| {
            let stroke = (6..10).contains(&x);
            let blob = (24..36).contains(&y) && (2..14).contains(&x);
            if stroke || blob {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    fn stamp(page: &mut RgbImage, glyph: &GrayImage, left: u32, top: u32) {
        for (x, y, p) in glyph.enumerate_pixels() {
            let v = p.0[0];
            page.put_pixel(left + x, top + y, Rgb([v, v, v]));
        }
    }

    /// Single scale with a threshold only an exact hit passes.
    fn config() -> ClefConfig {
        ClefConfig {
            scales: vec![1.0],
            threshold: 0.99,
            ..ClefConfig::default()
        }
    }

    #[test]
    fn exact_match_scores_one() {
        let g = glyph();
        let mut page = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        stamp(&mut page, &g, 5, 30);
        let gray = imageops::grayscale(&page);
        let sums = IntegralSums::new(&gray);
        let template = Template::new(&g).unwrap();
        assert!((template.correlate(&gray, &sums, 5, 30) - 1.0).abs() < 1e-4);
        assert_eq!(template.correlate(&gray, &sums, 60, 0), 0.0);
    }

    #[test]
    fn finds_glyph_center() {
        let g = glyph();
        let mut page = RgbImage::from_pixel(200, 900, Rgb([255, 255, 255]));
        stamp(&mut page, &g, 4, 100);
        stamp(&mut page, &g, 4, 500);
        let detector = ClefDetector::with_glyph(config(), g);
        assert_eq!(detector.detect(&page), vec![120, 520]);
    }

    #[test]
    fn multi_scale_matches_are_deduplicated() {
        let g = glyph();
        let mut page = RgbImage::from_pixel(200, 900, Rgb([255, 255, 255]));
        stamp(&mut page, &g, 4, 100);
        stamp(&mut page, &g, 4, 500);
        let detector = ClefDetector::with_glyph(ClefConfig::default(), g);
        let anchors = detector.detect(&page);
        assert_eq!(anchors.len(), 2, "{anchors:?}");
        assert!(anchors[0].abs_diff(120) <= 40, "{anchors:?}");
        assert!(anchors[1].abs_diff(520) <= 40, "{anchors:?}");
    }

    #[test]
    fn ignores_glyphs_outside_left_margin() {
        let g = glyph();
        let mut page = RgbImage::from_pixel(200, 400, Rgb([255, 255, 255]));
        stamp(&mut page, &g, 120, 100);
        let detector = ClefDetector::with_glyph(config(), g);
        assert!(detector.detect(&page).is_empty());
    }

    #[test]
    fn flat_glyph_matches_nothing() {
        let flat = GrayImage::from_pixel(10, 10, Luma([0]));
        let page = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let detector = ClefDetector::with_glyph(config(), flat);
        assert!(detector.detect(&page).is_empty());
    }

    #[test]
    fn missing_glyph_file_degrades_to_empty() {
        let detector = ClefDetector::new(ClefConfig {
            glyph_path: Some("/nonexistent/clef.png".into()),
            ..ClefConfig::default()
        });
        assert!(!detector.has_glyph());
        let page = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        assert!(detector.detect(&page).is_empty());
        assert_eq!(detector.detect_with_fallback(&page), vec![100]);
    }
}
