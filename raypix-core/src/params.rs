//! Cosmic-ray detection parameters.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters shared by every image in one processing run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectionParams {
    /// z-score threshold above the local mean.
    pub sigma: f64,
    /// Side length of the square neighborhood (odd).
    pub window_size: usize,
    /// Detection rounds; flagged pixels are nulled between rounds.
    pub iterations: usize,
    /// Pixels at or below this value are never flagged.
    pub min_intensity: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            sigma: 6.0,
            window_size: 11,
            iterations: 3,
            min_intensity: 50.0,
        }
    }
}

impl DetectionParams {
    /// Creates parameters with the default combination settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings used for single-image cleanup.
    #[must_use]
    pub fn single_image_defaults() -> Self {
        Self {
            sigma: 5.0,
            window_size: 5,
            iterations: 3,
            min_intensity: 0.0,
        }
    }

    /// Sets the z-score threshold.
    #[must_use]
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Sets the window size.
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets the number of detection rounds.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the minimum intensity floor.
    #[must_use]
    pub fn with_min_intensity(mut self, min_intensity: f64) -> Self {
        self.min_intensity = min_intensity;
        self
    }

    /// Half-width of the window.
    #[must_use]
    pub fn radius(&self) -> usize {
        self.window_size / 2
    }

    /// Validates the parameters.
    ///
    /// Even window sizes are rejected rather than rounded: the window
    /// must have a center pixel.
    ///
    /// # Errors
    /// Returns [`Error::InvalidWindowSize`] for an even or zero window and
    /// [`Error::InvalidParameter`] for a non-positive or non-finite sigma
    /// or a non-finite intensity floor.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(Error::InvalidWindowSize(self.window_size));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "sigma must be a positive number, got {}",
                self.sigma
            )));
        }
        if !self.min_intensity.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "min_intensity must be finite, got {}",
                self.min_intensity
            )));
        }
        Ok(())
    }
}
