//! raypix-core: Core types for detector image reduction.
//!
//! This crate provides the shared vocabulary of the raypix workspace:
//! image and mask types, cosmic-ray detection parameters, error types
//! and the event sink used to report progress without tying numerical
//! code to any front end.
//!

pub mod error;
pub mod events;
pub mod image;
pub mod params;

pub use error::{Error, Result};
pub use events::{DetectionReport, EventSink, NullSink};
pub use image::{ensure_same_shape, Image, ImageView, Mask, Shape};
pub use params::DetectionParams;
