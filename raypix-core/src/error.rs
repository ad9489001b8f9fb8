//! Error types for raypix-core.

use thiserror::Error;

/// Result type alias for raypix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for raypix operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An image group contained no images.
    #[error("no images found")]
    EmptyGroup,

    /// An image in a group does not match the shape of the first image.
    #[error("image {index} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// The local statistics window has no well-defined center.
    #[error("window size must be odd and at least 1, got {0}")]
    InvalidWindowSize(usize),

    /// A detection parameter is out of range.
    #[error("invalid detection parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
