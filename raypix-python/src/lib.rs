//! raypix-python: PyO3 Python bindings for raypix.
#![allow(
    clippy::doc_markdown,
    clippy::needless_pass_by_value,
    clippy::elidable_lifetime_names
)]
//!
//! Images cross the boundary as 2-D `float64` numpy arrays. Numerical
//! work runs with the GIL released.

use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;
use raypix_algorithms::{GroupCombination, ImageCombiner};
use raypix_core::{DetectionParams, Image};

fn io_error(context: &str, err: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyIOError::new_err(format!("{context}: {err}"))
}

fn value_error(context: &str, err: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(format!("{context}: {err}"))
}

fn raypix_io_error(context: &str, err: raypix_io::Error) -> PyErr {
    match err {
        raypix_io::Error::CoreError(inner) => value_error(context, inner),
        other => io_error(context, other),
    }
}

fn params(
    sigma: f64,
    window_size: usize,
    iterations: usize,
    min_intensity: f64,
) -> DetectionParams {
    DetectionParams::new()
        .with_sigma(sigma)
        .with_window_size(window_size)
        .with_iterations(iterations)
        .with_min_intensity(min_intensity)
}

type CombinationOutput<'py> = (Bound<'py, PyArray2<f64>>, Vec<Vec<usize>>, Vec<usize>);

fn combination_output<'py>(py: Python<'py>, result: GroupCombination) -> CombinationOutput<'py> {
    let (image, counts, fallbacks) = result.into_parts();
    (image.into_pyarray(py), counts, fallbacks)
}

/// Flag cosmic-ray pixels in a single detection pass.
///
/// Returns a boolean mask with the image's shape.
#[pyfunction]
#[pyo3(signature = (image, sigma=5.0, window_size=5, min_intensity=0.0))]
fn detect_cosmic_rays<'py>(
    py: Python<'py>,
    image: PyReadonlyArray2<'py, f64>,
    sigma: f64,
    window_size: usize,
    min_intensity: f64,
) -> PyResult<Bound<'py, PyArray2<bool>>> {
    let image: Image = image.as_array().to_owned();
    let params = params(sigma, window_size, 1, min_intensity);
    let mask = py
        .allow_threads(move || raypix_algorithms::detect_cosmic_rays(image.view(), &params))
        .map_err(|e| value_error("detect_cosmic_rays", e))?;
    Ok(mask.into_pyarray(py))
}

/// Iteratively remove cosmic rays from one image.
///
/// Returns `(image, round_counts)` where flagged pixels are NaN.
#[pyfunction]
#[pyo3(signature = (image, sigma=5.0, window_size=5, iterations=3, min_intensity=0.0))]
fn remove_cosmic_rays<'py>(
    py: Python<'py>,
    image: PyReadonlyArray2<'py, f64>,
    sigma: f64,
    window_size: usize,
    iterations: usize,
    min_intensity: f64,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Vec<usize>)> {
    let image: Image = image.as_array().to_owned();
    let params = params(sigma, window_size, iterations, min_intensity);
    let removal = py
        .allow_threads(move || raypix_algorithms::remove_cosmic_rays(image.view(), &params))
        .map_err(|e| value_error("remove_cosmic_rays", e))?;
    Ok((removal.image.into_pyarray(py), removal.report.round_counts))
}

/// Combine same-shaped exposures into one cosmic-ray-corrected sum.
///
/// Returns `(image, round_counts_per_image, fallback_pixels_per_image)`.
#[pyfunction]
#[pyo3(signature = (images, sigma=6.0, window_size=11, iterations=3, min_intensity=50.0, parallel=true))]
fn combine_images<'py>(
    py: Python<'py>,
    images: Vec<PyReadonlyArray2<'py, f64>>,
    sigma: f64,
    window_size: usize,
    iterations: usize,
    min_intensity: f64,
    parallel: bool,
) -> PyResult<CombinationOutput<'py>> {
    let images: Vec<Image> = images.iter().map(|a| a.as_array().to_owned()).collect();
    let combiner = ImageCombiner::new(params(sigma, window_size, iterations, min_intensity))
        .map_err(|e| value_error("combine_images", e))?
        .with_parallel(parallel);
    let result = py
        .allow_threads(move || combiner.combine(&images))
        .map_err(|e| value_error("combine_images", e))?;
    Ok(combination_output(py, result))
}

/// Combine every TIFF in a folder.
///
/// Returns the same tuple as `combine_images`.
#[pyfunction]
#[pyo3(signature = (path, sigma=6.0, window_size=11, iterations=3, min_intensity=50.0))]
fn combine_directory<'py>(
    py: Python<'py>,
    path: &str,
    sigma: f64,
    window_size: usize,
    iterations: usize,
    min_intensity: f64,
) -> PyResult<CombinationOutput<'py>> {
    let combiner = ImageCombiner::new(params(sigma, window_size, iterations, min_intensity))
        .map_err(|e| value_error("combine_directory", e))?;
    let dir = std::path::PathBuf::from(path);
    let result = py
        .allow_threads(move || raypix_io::combine_directory(&dir, &combiner))
        .map_err(|e| raypix_io_error(&format!("combine_directory({path})"), e))?;
    Ok(combination_output(py, result.combination))
}

/// raypix Python module.
#[pymodule]
fn raypix(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(detect_cosmic_rays, m)?)?;
    m.add_function(wrap_pyfunction!(remove_cosmic_rays, m)?)?;
    m.add_function(wrap_pyfunction!(combine_images, m)?)?;
    m.add_function(wrap_pyfunction!(combine_directory, m)?)?;
    Ok(())
}
