//! Error type shared by every module of the crate.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document as a whole could not be opened.
    #[error("failed to open document '{}': {reason}", path.display())]
    Document { path: PathBuf, reason: String },

    /// A single page failed to rasterize. Other pages stay usable.
    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
