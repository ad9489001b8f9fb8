//! Multi-exposure combination with cross-image cosmic-ray repair.
//!
//! Each exposure of a group is cleaned independently. A flagged pixel is
//! then replaced by the mean of the same pixel in the other exposures,
//! skipping exposures where that pixel is missing too, and the repaired
//! exposures are summed. A ray hits one frame; real signal is present in
//! all of them.

use crate::cosmic::{CosmicRayDetector, RayRemoval};
use ndarray::Zip;
use raypix_core::{ensure_same_shape, DetectionParams, DetectionReport, Image, Result};
use rayon::prelude::*;

/// Result of combining one image group.
#[derive(Debug, Clone)]
pub struct GroupCombination {
    /// Sum of the repaired exposures.
    pub image: Image,
    /// Detection report of each exposure, in input order.
    pub reports: Vec<DetectionReport>,
    /// Flagged pixels of each exposure for which every other exposure was
    /// also missing; these keep their original value.
    pub fallback_pixels: Vec<usize>,
}

impl GroupCombination {
    /// Total flagged pixels across the group.
    #[must_use]
    pub fn flagged(&self) -> usize {
        self.reports.iter().map(DetectionReport::total).sum()
    }

    /// Total fallback pixels across the group.
    #[must_use]
    pub fn fallbacks(&self) -> usize {
        self.fallback_pixels.iter().sum()
    }

    /// Splits into the image, per-exposure round counts and per-exposure
    /// fallback counts.
    #[must_use]
    pub fn into_parts(self) -> (Image, Vec<Vec<usize>>, Vec<usize>) {
        let counts = self
            .reports
            .into_iter()
            .map(|report| report.round_counts)
            .collect();
        (self.image, counts, self.fallback_pixels)
    }
}

/// Combines same-shaped exposures into one ray-corrected frame.
#[derive(Debug, Clone)]
pub struct ImageCombiner {
    detector: CosmicRayDetector,
    parallel: bool,
}

impl ImageCombiner {
    /// Creates a combiner.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid.
    pub fn new(params: DetectionParams) -> Result<Self> {
        Ok(Self {
            detector: CosmicRayDetector::new(params)?,
            parallel: true,
        })
    }

    /// Set whether exposures are cleaned in parallel.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the detection parameters.
    #[must_use]
    pub fn params(&self) -> &DetectionParams {
        self.detector.params()
    }

    /// Cleans, repairs and sums `images`.
    ///
    /// A group of one has nothing to borrow from, so its single exposure is
    /// returned unmodified.
    ///
    /// # Errors
    /// Returns [`raypix_core::Error::EmptyGroup`] for an empty slice and
    /// [`raypix_core::Error::ShapeMismatch`] when shapes differ.
    pub fn combine(&self, images: &[Image]) -> Result<GroupCombination> {
        let shape = ensure_same_shape(images.iter().map(Image::view))?;

        let removals: Vec<RayRemoval> = if self.parallel {
            images
                .par_iter()
                .map(|image| self.detector.remove(image.view()))
                .collect()
        } else {
            images
                .iter()
                .map(|image| self.detector.remove(image.view()))
                .collect()
        };

        let mut combined = Image::zeros(shape);
        let mut fallback_pixels = vec![0usize; images.len()];

        if let [single] = images {
            combined += single;
        } else {
            for (i, (original, removal)) in images.iter().zip(&removals).enumerate() {
                let fallbacks = &mut fallback_pixels[i];
                Zip::indexed(&mut combined)
                    .and(original)
                    .and(&removal.mask)
                    .for_each(|idx, acc, &value, &flagged| {
                        if !flagged {
                            *acc += value;
                            return;
                        }
                        match mean_of_others(&removals, i, idx) {
                            Some(mean) => *acc += mean,
                            None => {
                                *fallbacks += 1;
                                *acc += value;
                            }
                        }
                    });

                if *fallbacks > 0 {
                    log::warn!(
                        "Image {i}: {fallbacks} flagged pixel(s) missing in every other image, kept original values"
                    );
                }
            }
        }

        Ok(GroupCombination {
            image: combined,
            reports: removals.into_iter().map(|r| r.report).collect(),
            fallback_pixels,
        })
    }
}

/// NaN-skipping mean of pixel `idx` over every removal except `skip`.
#[allow(clippy::cast_precision_loss)]
fn mean_of_others(removals: &[RayRemoval], skip: usize, idx: (usize, usize)) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (j, removal) in removals.iter().enumerate() {
        if j == skip {
            continue;
        }
        let value = removal.image[idx];
        if !value.is_nan() {
            sum += value;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Combines an image group with the given parameters.
///
/// # Errors
/// See [`ImageCombiner::combine`].
pub fn combine_group(images: &[Image], params: &DetectionParams) -> Result<GroupCombination> {
    ImageCombiner::new(*params)?.combine(images)
}
