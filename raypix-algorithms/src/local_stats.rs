//! Local neighborhood statistics over positive pixels.
//!
//! Window sums use a reflecting boundary (`d c b a | a b c d | d c b a`):
//! the edge sample is repeated, and windows wider than the image keep
//! reflecting. Non-positive and NaN pixels contribute to neither the sums
//! nor the counts.
#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use ndarray::{Array2, ArrayView2, Zip};

/// Maps a possibly out-of-range index onto `0..len` by reflection.
///
/// `len` must be non-zero.
#[inline]
#[must_use]
pub fn reflect_index(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let folded = index.rem_euclid(period);
    if folded < len {
        folded as usize
    } else {
        (period - 1 - folded) as usize
    }
}

/// Sum of `data` over a `window_size` square centered on each pixel.
///
/// The box is separable, so rows are summed first and columns second.
#[must_use]
pub fn box_sum(data: ArrayView2<'_, f64>, window_size: usize) -> Array2<f64> {
    let (rows, cols) = data.dim();
    let radius = isize::try_from(window_size / 2).unwrap_or(isize::MAX);

    let mut horizontal = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for k in -radius..=radius {
                acc += data[[r, reflect_index((c as isize).saturating_add(k), cols)]];
            }
            horizontal[[r, c]] = acc;
        }
    }

    let mut out = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for k in -radius..=radius {
                acc += horizontal[[reflect_index((r as isize).saturating_add(k), rows), c]];
            }
            out[[r, c]] = acc;
        }
    }

    out
}

/// Windowed sums of positive values, their squares, and their count.
#[derive(Debug, Clone)]
pub struct WindowSums {
    /// Sum of positive values in each window.
    pub sum: Array2<f64>,
    /// Sum of squared positive values in each window.
    pub sum_sq: Array2<f64>,
    /// Number of positive pixels in each window.
    pub count: Array2<f64>,
}

impl WindowSums {
    /// Computes the window sums of `image`.
    #[must_use]
    pub fn compute(image: ArrayView2<'_, f64>, window_size: usize) -> Self {
        let positive = image.mapv(|v| if v > 0.0 { v } else { 0.0 });
        let indicator = image.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let squares = positive.mapv(|v| v * v);

        Self {
            sum: box_sum(positive.view(), window_size),
            sum_sq: box_sum(squares.view(), window_size),
            count: box_sum(indicator.view(), window_size),
        }
    }

    /// Converts the sums into local mean and standard deviation.
    ///
    /// Windows without positive pixels get mean 0 and std 0. Variance
    /// within rounding noise of zero is clamped to 0 before the square root,
    /// so flat windows always report std 0.
    #[must_use]
    pub fn statistics(&self) -> LocalStatistics {
        let dim = self.sum.dim();
        let mut mean = Array2::<f64>::zeros(dim);
        let mut std = Array2::<f64>::zeros(dim);

        Zip::from(&mut mean)
            .and(&mut std)
            .and(&self.sum)
            .and(&self.sum_sq)
            .and(&self.count)
            .for_each(|m, s, &sum, &sum_sq, &count| {
                if count > 0.0 {
                    let mu = sum / count;
                    *m = mu;
                    *s = variance(sum_sq / count, mu, count).sqrt();
                }
            });

        LocalStatistics { mean, std }
    }
}

/// `E[x^2] - mean^2`, zero when the difference is cancellation noise.
///
/// Each window sum accumulates a relative rounding error that grows with
/// the number of terms.
#[inline]
fn variance(mean_sq: f64, mean: f64, count: f64) -> f64 {
    let var = mean_sq - mean * mean;
    let tolerance = 4.0 * (count + 1.0) * f64::EPSILON * mean_sq;
    if var <= tolerance {
        0.0
    } else {
        var
    }
}

/// Local mean and standard deviation of positive pixels.
#[derive(Debug, Clone)]
pub struct LocalStatistics {
    /// Mean of positive pixels in each window.
    pub mean: Array2<f64>,
    /// Standard deviation of positive pixels in each window.
    pub std: Array2<f64>,
}

impl LocalStatistics {
    /// Computes the statistics of `image` over `window_size` windows.
    #[must_use]
    pub fn compute(image: ArrayView2<'_, f64>, window_size: usize) -> Self {
        WindowSums::compute(image, window_size).statistics()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 0);
        assert_eq!(reflect_index(-2, 5), 1);
        assert_eq!(reflect_index(0, 5), 0);
        assert_eq!(reflect_index(4, 5), 4);
        assert_eq!(reflect_index(5, 5), 4);
        assert_eq!(reflect_index(6, 5), 3);
        // Wider than the axis: keeps reflecting
        assert_eq!(reflect_index(-6, 5), 4);
        assert_eq!(reflect_index(10, 5), 0);
        assert_eq!(reflect_index(3, 1), 0);
        // Saturated offsets still land inside the axis
        assert!(reflect_index(isize::MAX, 7) < 7);
        assert!(reflect_index(isize::MIN, 7) < 7);
    }

    #[test]
    fn test_constant_window_has_zero_std() {
        for value in [0.1, 1.1, 7.3, 123.456, 65_535.7] {
            let data = Array2::from_elem((13, 17), value);
            for window in [3, 5, 7, 11] {
                let stats = LocalStatistics::compute(data.view(), window);
                assert!(
                    stats.std.iter().all(|&s| s == 0.0),
                    "value={value} window={window}"
                );
            }
        }
    }

    #[test]
    fn test_box_sum_interior_and_edges() {
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let sums = box_sum(data.view(), 3);
        // Center sees the whole image
        assert_abs_diff_eq!(sums[[1, 1]], 45.0);
        // Corner: rows {0,0,1} x cols {0,0,1}
        // = 2*(1 + 1 + 2) + (4 + 4 + 5) = 21
        assert_abs_diff_eq!(sums[[0, 0]], 21.0);
    }

    #[test]
    fn test_box_sum_window_one_is_identity() {
        let data = array![[1.0, -2.0], [3.5, 0.0]];
        let sums = box_sum(data.view(), 1);
        assert_eq!(sums, data);
    }

    #[test]
    fn test_statistics_ignore_non_positive() {
        let data = array![[4.0, 0.0, 4.0], [-3.0, 4.0, f64::NAN], [4.0, 0.0, 4.0]];
        let stats = LocalStatistics::compute(data.view(), 3);
        assert_abs_diff_eq!(stats.mean[[1, 1]], 4.0);
        assert_abs_diff_eq!(stats.std[[1, 1]], 0.0);
    }

    #[test]
    fn test_statistics_empty_window() {
        let data = Array2::<f64>::zeros((4, 4));
        let stats = LocalStatistics::compute(data.view(), 3);
        assert!(stats.mean.iter().all(|&m| m == 0.0));
        assert!(stats.std.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_statistics_mean_and_std() {
        let data = array![[2.0, 4.0, 2.0], [4.0, 2.0, 4.0], [2.0, 4.0, 2.0]];
        let stats = LocalStatistics::compute(data.view(), 3);
        // 5 twos and 4 fours
        let mean = (5.0 * 2.0 + 4.0 * 4.0) / 9.0;
        let var = (5.0 * 4.0 + 4.0 * 16.0) / 9.0 - mean * mean;
        assert_abs_diff_eq!(stats.mean[[1, 1]], mean, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.std[[1, 1]], var.sqrt(), epsilon = 1e-12);
    }
}
