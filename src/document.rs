//! Page sources. The navigator only sees documents through
//! [`PageRasterizer`]; turning a PDF or similar into pixels is left to an
//! implementation of that trait.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// File extensions [`ImageSequence`] treats as page images.
const PAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A paged document that can produce an RGB raster of any page.
pub trait PageRasterizer {
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based) at `dpi`.
    fn render_page(&self, index: usize, dpi: u32) -> Result<RgbImage>;
}

impl<R: PageRasterizer + ?Sized> PageRasterizer for Box<R> {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<RgbImage> {
        (**self).render_page(index, dpi)
    }
}

/// Pages already rendered into memory.
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    pages: Vec<RgbImage>,
}

impl PageSet {
    pub fn new(pages: Vec<RgbImage>) -> Self {
        Self { pages }
    }
}

impl PageRasterizer for PageSet {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, _dpi: u32) -> Result<RgbImage> {
        self.pages.get(index).cloned().ok_or(Error::PageOutOfRange {
            page: index,
            count: self.pages.len(),
        })
    }
}

/// A document made of pre-rendered page images: either a directory of
/// image files, ordered by file name, or a single image file.
///
/// Pages are decoded on demand, so a corrupt page file fails only that page.
/// The requested DPI is ignored; pages are used at their stored resolution.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    path: PathBuf,
    pages: Vec<PathBuf>,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;

        let pages = if metadata.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|e| Error::io(path, e))?;
            let mut pages = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| Error::io(path, e))?;
                let page = entry.path();
                if page.is_file() && is_page_image(&page) {
                    pages.push(page);
                }
            }
            pages.sort();
            pages
        } else if is_page_image(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(Error::Document {
                path: path.to_path_buf(),
                reason: "not a page image or a directory of page images".into(),
            });
        };

        if pages.is_empty() {
            return Err(Error::Document {
                path: path.to_path_buf(),
                reason: "no page images found".into(),
            });
        }

        info!(path = %path.display(), pages = pages.len(), "opened image sequence");
        Ok(Self {
            path: path.to_path_buf(),
            pages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PAGE_EXTENSIONS.iter().any(|p| e.eq_ignore_ascii_case(p)))
}

impl PageRasterizer for ImageSequence {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<RgbImage> {
        let file = self.pages.get(index).ok_or(Error::PageOutOfRange {
            page: index,
            count: self.pages.len(),
        })?;
        debug!(page = index, dpi, file = %file.display(), "decoding page image");
        let img = image::open(file).map_err(|e| Error::Render {
            page: index,
            reason: e.to_string(),
        })?;
        Ok(img.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn page_set_bounds() {
        let set = PageSet::new(vec![RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))]);
        assert_eq!(set.page_count(), 1);
        assert_eq!(set.render_page(0, 150).unwrap().get_pixel(1, 1), &Rgb([1, 2, 3]));
        assert!(matches!(
            set.render_page(1, 150),
            Err(Error::PageOutOfRange { page: 1, count: 1 })
        ));
    }

    #[test]
    fn directory_pages_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["p2.png", "p1.png"] {
            RgbImage::from_pixel(3, 3, Rgb([255, 255, 255]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "0:10\n").unwrap();

        let doc = ImageSequence::open(dir.path()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert!(doc.pages[0].ends_with("p1.png"));
        assert_eq!(doc.render_page(1, 150).unwrap().dimensions(), (3, 3));
    }

    #[test]
    fn corrupt_page_fails_only_that_page() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(3, 3, Rgb([0, 0, 0]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("b.png"), b"not a png").unwrap();

        let doc = ImageSequence::open(dir.path()).unwrap();
        assert!(doc.render_page(0, 150).is_ok());
        assert!(matches!(doc.render_page(1, 150), Err(Error::Render { page: 1, .. })));
    }

    #[test]
    fn open_failures_surface() {
        assert!(matches!(
            ImageSequence::open("/definitely/not/here.png"),
            Err(Error::Io { .. })
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ImageSequence::open(dir.path()), Err(Error::Document { .. })));
        let other = dir.path().join("score.pdf");
        std::fs::write(&other, b"%PDF").unwrap();
        assert!(matches!(ImageSequence::open(&other), Err(Error::Document { .. })));
    }
}
