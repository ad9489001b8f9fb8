//! raypix-algorithms: Cosmic-ray rejection for detector exposures.
//!
//! This crate provides:
//! - **Detector** - flags pixels inconsistent with their local neighborhood
//! - **Iterative remover** - repeats detection, nulling hits between rounds
//! - **Combiner** - repairs each exposure from its co-temporal siblings and
//!   sums the group
//!
#![warn(missing_docs)]

mod combine;
mod cosmic;
pub mod local_stats;

pub use combine::{combine_group, GroupCombination, ImageCombiner};
pub use cosmic::{detect_cosmic_rays, remove_cosmic_rays, CosmicRayDetector, RayRemoval};
pub use local_stats::{LocalStatistics, WindowSums};

// Re-export core types used in the public API
pub use raypix_core::{DetectionParams, DetectionReport, Image, Mask};
