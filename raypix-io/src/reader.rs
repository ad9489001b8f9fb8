//! TIFF image reader.
//!

use crate::{Error, Result};
use ndarray::Array2;
use raypix_core::Image;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;

/// Reads a single-channel TIFF into an `f64` image.
///
/// Integer and floating point samples of any width are widened to `f64`.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded, or if it is
/// not a grayscale image.
#[allow(clippy::cast_precision_loss)]
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    // Detector frames can exceed the decoder's default buffer limits
    let mut decoder = Decoder::new(file)?.with_limits(Limits::unlimited());

    let colortype = decoder.colortype()?;
    if !matches!(colortype, ColorType::Gray(_)) {
        return Err(Error::InvalidFormat(format!(
            "{}: expected a grayscale image, got {colortype:?}",
            path.display()
        )));
    }

    let (width, height) = decoder.dimensions()?;
    let samples: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::InvalidFormat(format!(
                "{}: unsupported TIFF sample format",
                path.display()
            )));
        }
    };

    Array2::from_shape_vec((height as usize, width as usize), samples).map_err(|err| {
        Error::InvalidFormat(format!("{}: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;
    use tempfile::TempDir;
    use tiff::encoder::{colortype, TiffEncoder};

    #[test]
    fn test_read_u16_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.tif");
        {
            let file = BufWriter::new(File::create(&path).unwrap());
            let mut encoder = TiffEncoder::new(file).unwrap();
            let data: Vec<u16> = (0..12).collect();
            encoder
                .write_image::<colortype::Gray16>(4, 3, &data)
                .unwrap();
        }

        let image = read_image(&path).unwrap();
        assert_eq!(image.dim(), (3, 4));
        assert!((image[[0, 0]] - 0.0).abs() < f64::EPSILON);
        assert!((image[[1, 0]] - 4.0).abs() < f64::EPSILON);
        assert!((image[[2, 3]] - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rgb_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("color.tif");
        {
            let file = BufWriter::new(File::create(&path).unwrap());
            let mut encoder = TiffEncoder::new(file).unwrap();
            let data = vec![0u8; 2 * 2 * 3];
            encoder.write_image::<colortype::RGB8>(2, 2, &data).unwrap();
        }

        let err = read_image(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = read_image("/nonexistent/frame.tif").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
