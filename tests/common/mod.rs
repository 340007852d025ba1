//! Synthetic score pages shared by the integration tests.

#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};

pub const PAGE_WIDTH: u32 = 1000;
pub const PAGE_HEIGHT: u32 = 2000;

/// Row ranges `[top, bottom)` of the systems drawn by [`score_page`].
pub const SYSTEMS: [(u32, u32); 4] = [(300, 460), (700, 860), (1100, 1260), (1500, 1660)];

/// Left edge of the staff lines; everything left of it is blank margin
/// except the clefs.
const STAFF_LEFT: u32 = 200;

/// A white page with four dense systems. Each system is a stack of 2-row
/// lines every 4 rows, so every 5-row band inside it carries ink.
pub fn score_page() -> RgbImage {
    let mut page = RgbImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Rgb([255, 255, 255]));
    for &(top, bottom) in &SYSTEMS {
        let mut y = top;
        while y + 1 < bottom {
            for row in [y, y + 1] {
                for x in STAFF_LEFT..PAGE_WIDTH - 50 {
                    page.put_pixel(x, row, Rgb([0, 0, 0]));
                }
            }
            y += 4;
        }
    }
    page
}

/// A crude clef glyph: vertical stroke, a loop near the top and a blob near
/// the bottom.
pub fn clef_glyph() -> GrayImage {
    GrayImage::from_fn(24, 60, |x, y| {
        let stroke = (10..14).contains(&x);
        let top_loop = (8..20).contains(&y) && (4..20).contains(&x) && !(11..17).contains(&y);
        let blob = (38..52).contains(&y) && (3..21).contains(&x);
        if stroke || top_loop || blob {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Vertical offset of the clef from the top of its system.
pub const CLEF_OFFSET: u32 = 50;

/// [`score_page`] with a clef stamped in the left margin of every system.
pub fn score_page_with_clefs() -> RgbImage {
    let mut page = score_page();
    let glyph = clef_glyph();
    for &(top, _) in &SYSTEMS {
        for (x, y, p) in glyph.enumerate_pixels() {
            let v = p.0[0];
            page.put_pixel(30 + x, top + CLEF_OFFSET + y, Rgb([v, v, v]));
        }
    }
    page
}

pub fn blank_page() -> RgbImage {
    RgbImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Rgb([255, 255, 255]))
}
