//! I/O error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// A folder expected to hold exposures has none.
    #[error("no files found in {}", .0.display())]
    NoImages(PathBuf),

    /// Input directory does not exist.
    #[error("input directory not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// No configured folder exists at the current index.
    #[error("no valid groups found starting from g{0}")]
    NoGroups(usize),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] raypix_core::Error),
}
