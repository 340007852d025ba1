//! Ink-density profiles over the vertical axis of a page.
//!
//! Both functions convert the page to luminance first and count a pixel as
//! ink when its luminance is at or below `ink_cutoff`.

use image::{imageops, GrayImage, RgbImage};

/// Fraction of ink pixels per band of `band_height` rows, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityProfile {
    pub band_height: u32,
    pub densities: Vec<f64>,
}

impl DensityProfile {
    pub fn len(&self) -> usize {
        self.densities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.densities.is_empty()
    }

    /// Pixel Y of the top row of band `index`.
    pub fn band_to_y(&self, index: usize) -> u32 {
        index as u32 * self.band_height
    }
}

/// Compute the band density profile of a page.
///
/// The profile has `floor(height / band_height)` entries; a partial band at
/// the bottom is dropped.
pub fn density_profile(page: &RgbImage, band_height: u32, ink_cutoff: u8) -> DensityProfile {
    let gray = imageops::grayscale(page);
    let (width, height) = gray.dimensions();
    if band_height == 0 || width == 0 {
        return DensityProfile {
            band_height,
            densities: Vec::new(),
        };
    }

    let bands = height / band_height;
    let area = f64::from(width) * f64::from(band_height);
    let densities = (0..bands)
        .map(|band| {
            let top = band * band_height;
            let ink: u64 = (top..top + band_height)
                .map(|y| ink_in_row(&gray, y, ink_cutoff))
                .sum();
            ink as f64 / area
        })
        .collect();

    DensityProfile {
        band_height,
        densities,
    }
}

/// Ink fraction of every row of a page.
pub fn row_ink_fractions(page: &RgbImage, ink_cutoff: u8) -> Vec<f64> {
    let gray = imageops::grayscale(page);
    let (width, height) = gray.dimensions();
    if width == 0 {
        return Vec::new();
    }
    (0..height)
        .map(|y| ink_in_row(&gray, y, ink_cutoff) as f64 / f64::from(width))
        .collect()
}

fn ink_in_row(gray: &GrayImage, y: u32, ink_cutoff: u8) -> u64 {
    let width = gray.width() as usize;
    let start = y as usize * width;
    gray.as_raw()[start..start + width]
        .iter()
        .filter(|&&luma| luma <= ink_cutoff)
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn page_with_black_rows(width: u32, height: u32, rows: &[u32]) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for &y in rows {
            for x in 0..width {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        img
    }

    #[test]
    fn blank_page_has_zero_density() {
        let page = RgbImage::from_pixel(40, 23, Rgb([255, 255, 255]));
        let profile = density_profile(&page, 5, 200);
        assert_eq!(profile.len(), 4);
        assert!(profile.densities.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn one_black_row_in_a_band_is_one_fifth() {
        let page = page_with_black_rows(10, 10, &[7]);
        let profile = density_profile(&page, 5, 200);
        assert_eq!(profile.densities, vec![0.0, 0.2]);
        assert_eq!(profile.band_to_y(1), 5);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let page = RgbImage::from_pixel(4, 1, Rgb([200, 200, 200]));
        assert_eq!(row_ink_fractions(&page, 200), vec![1.0]);
        assert_eq!(row_ink_fractions(&page, 199), vec![0.0]);
    }

    #[test]
    fn partial_ink_row() {
        let mut page = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        page.put_pixel(0, 1, Rgb([10, 10, 10]));
        assert_eq!(row_ink_fractions(&page, 149), vec![0.0, 0.25]);
    }

    #[test]
    fn degenerate_inputs() {
        let page = RgbImage::new(0, 10);
        assert!(density_profile(&page, 5, 200).is_empty());
        let page = RgbImage::new(10, 10);
        assert!(density_profile(&page, 0, 200).is_empty());
    }
}
