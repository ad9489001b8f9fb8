//! raypix-io: TIFF I/O and measurement processing for raypix.
//!
//! This crate reads detector exposures from TIFF files, groups the
//! numbered measurement folders of an input directory, and drives the
//! cosmic-ray combination over a whole run.
//!

pub mod config;
mod error;
pub mod pipeline;
mod reader;
pub mod scanner;
mod writer;

pub use config::{default_groups, parse_group_config, GroupSpec, MeasurementConfig};
pub use error::{Error, Result};
pub use pipeline::{
    combine_directory, output_path, process_measurements, DirectoryCombination, PipelineEvent,
    ProcessingSummary,
};
pub use reader::read_image;
pub use scanner::{discover_groups, folder_name, list_tiff_files, FolderGroup};
pub use writer::write_image;
