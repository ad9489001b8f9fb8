//! Image and mask types.
//!
//! Images are row-major `f64` arrays. Integer detector frames are widened
//! on load so that missing pixels can be represented as NaN.

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};

/// A 2D array of pixel intensities.
pub type Image = Array2<f64>;

/// Borrowed view of an [`Image`].
pub type ImageView<'a> = ArrayView2<'a, f64>;

/// A boolean cosmic-ray mask; `true` marks a rejected pixel.
pub type Mask = Array2<bool>;

/// Image dimensions as `(rows, cols)`.
pub type Shape = (usize, usize);

/// Checks that every image in a group is non-empty and shares one shape.
///
/// Returns the common shape.
///
/// # Errors
/// Returns [`Error::EmptyGroup`] for an empty slice and
/// [`Error::ShapeMismatch`] for the first image whose shape differs from
/// the first image of the group.
pub fn ensure_same_shape<'a, I>(images: I) -> Result<Shape>
where
    I: IntoIterator<Item = ImageView<'a>>,
{
    let mut iter = images.into_iter();
    let expected = iter.next().ok_or(Error::EmptyGroup)?.dim();

    for (offset, image) in iter.enumerate() {
        let found = image.dim();
        if found != expected {
            return Err(Error::ShapeMismatch {
                index: offset + 1,
                expected,
                found,
            });
        }
    }

    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_shape_ok() {
        let a = Image::zeros((4, 3));
        let b = Image::ones((4, 3));
        let shape = ensure_same_shape([a.view(), b.view()]).unwrap();
        assert_eq!(shape, (4, 3));
    }

    #[test]
    fn test_empty_group() {
        let images: Vec<Image> = Vec::new();
        let err = ensure_same_shape(images.iter().map(Image::view)).unwrap_err();
        assert_eq!(err, Error::EmptyGroup);
        assert_eq!(err.to_string(), "no images found");
    }

    #[test]
    fn test_shape_mismatch_reports_index() {
        let images = [
            Image::zeros((4, 3)),
            Image::zeros((4, 3)),
            Image::zeros((3, 4)),
        ];
        let err = ensure_same_shape(images.iter().map(Image::view)).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                index: 2,
                expected: (4, 3),
                found: (3, 4),
            }
        );
    }
}
