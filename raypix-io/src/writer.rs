//! TIFF image writer.

use crate::{Error, Result};
use raypix_core::Image;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};

/// Writes an image as a 32-bit float grayscale TIFF.
///
/// NaN pixels are written as NaN.
///
/// # Errors
/// Returns an error if the file cannot be created or encoded, or if the
/// image is too large for TIFF dimensions.
#[allow(clippy::cast_possible_truncation)]
pub fn write_image<P: AsRef<Path>>(path: P, image: &Image) -> Result<()> {
    let (rows, cols) = image.dim();
    let width = u32::try_from(cols)
        .map_err(|_| Error::InvalidFormat(format!("image width {cols} exceeds TIFF limits")))?;
    let height = u32::try_from(rows)
        .map_err(|_| Error::InvalidFormat(format!("image height {rows} exceeds TIFF limits")))?;

    // Logical iteration order is row-major regardless of memory layout
    let data: Vec<f32> = image.iter().map(|&v| v as f32).collect();

    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(writer)?;
    encoder.write_image::<colortype::Gray32Float>(width, height, &data)?;
    Ok(())
}
