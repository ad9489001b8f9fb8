//! Cosmic-ray detection and iterative removal.
//!
//! A pixel is a cosmic-ray candidate when it stands out from the positive
//! pixels of its neighborhood, either by z-score or by being more than
//! twice the local mean. Only positive pixels above the intensity floor
//! are ever flagged.

use crate::local_stats::LocalStatistics;
use ndarray::{ArrayView2, Zip};
use raypix_core::{DetectionParams, DetectionReport, Image, Mask, Result};

/// Guards the z-score against a vanishing standard deviation.
const STD_EPSILON: f64 = 1e-10;

/// Flagged pixels must exceed this multiple of the local mean to be caught
/// by the intensity rule.
const MEAN_RATIO: f64 = 2.0;

/// Result of iterative removal on one image.
#[derive(Debug, Clone)]
pub struct RayRemoval {
    /// Copy of the input with every flagged pixel set to NaN.
    pub image: Image,
    /// Union of the masks of all rounds.
    pub mask: Mask,
    /// Newly flagged pixels per round.
    pub report: DetectionReport,
}

impl RayRemoval {
    /// Total number of flagged pixels.
    #[must_use]
    pub fn flagged(&self) -> usize {
        self.report.total()
    }
}

/// Cosmic-ray detector with validated parameters.
#[derive(Debug, Clone)]
pub struct CosmicRayDetector {
    params: DetectionParams,
}

impl CosmicRayDetector {
    /// Creates a detector.
    ///
    /// # Errors
    /// Returns an error if the parameters fail [`DetectionParams::validate`].
    pub fn new(params: DetectionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Returns the detection parameters.
    #[must_use]
    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Flags pixels inconsistent with their local neighborhood.
    ///
    /// NaN pixels are treated as missing: they are never flagged and do
    /// not contribute to the statistics of their neighbors.
    #[must_use]
    pub fn detect(&self, image: ArrayView2<'_, f64>) -> Mask {
        let stats = LocalStatistics::compute(image, self.params.window_size);
        let sigma = self.params.sigma;
        let min_intensity = self.params.min_intensity;

        let mut mask = Mask::from_elem(image.dim(), false);
        Zip::from(&mut mask)
            .and(image)
            .and(&stats.mean)
            .and(&stats.std)
            .for_each(|flag, &value, &mean, &std| {
                // NaN fails both comparisons
                if !(value > 0.0 && value > min_intensity) {
                    return;
                }
                let z_score = if std > 0.0 {
                    (value - mean) / (std + STD_EPSILON)
                } else {
                    0.0
                };
                *flag = z_score > sigma || value > MEAN_RATIO * mean;
            });

        mask
    }

    /// Runs `iterations` detection rounds, nulling flagged pixels between
    /// rounds so that weaker hits hidden by stronger neighbors surface.
    ///
    /// Missing pixels are left as NaN; filling them is up to the caller.
    #[must_use]
    pub fn remove(&self, image: ArrayView2<'_, f64>) -> RayRemoval {
        let mut working = image.to_owned();
        let mut combined = Mask::from_elem(image.dim(), false);
        let mut report = DetectionReport::with_capacity(self.params.iterations);

        for _ in 0..self.params.iterations {
            let mask = self.detect(working.view());
            let mut flagged = 0usize;
            Zip::from(&mut working)
                .and(&mut combined)
                .and(&mask)
                .for_each(|value, seen, &hit| {
                    if hit {
                        *value = f64::NAN;
                        *seen = true;
                        flagged += 1;
                    }
                });
            report.push(flagged);
        }

        log::debug!("Found cosmic rays: {report}");

        RayRemoval {
            image: working,
            mask: combined,
            report,
        }
    }
}

/// Flags cosmic-ray pixels in one image.
///
/// `params.iterations` is not used; see [`remove_cosmic_rays`].
///
/// # Errors
/// Returns an error if the parameters are invalid.
pub fn detect_cosmic_rays(image: ArrayView2<'_, f64>, params: &DetectionParams) -> Result<Mask> {
    Ok(CosmicRayDetector::new(*params)?.detect(image))
}

/// Iteratively detects cosmic rays and marks them as NaN.
///
/// # Errors
/// Returns an error if the parameters are invalid.
pub fn remove_cosmic_rays(
    image: ArrayView2<'_, f64>,
    params: &DetectionParams,
) -> Result<RayRemoval> {
    Ok(CosmicRayDetector::new(*params)?.remove(image))
}
