//! Measurement processing pipeline.
//!
//! Walks the numbered folders of an input directory measurement by
//! measurement, combines every folder's exposures with cosmic-ray
//! rejection, sums folders per group and writes one TIFF per group.

use crate::config::MeasurementConfig;
use crate::reader::read_image;
use crate::scanner::{discover_groups, list_tiff_files, FolderGroup};
use crate::writer::write_image;
use crate::{Error, Result};
use raypix_algorithms::{GroupCombination, ImageCombiner};
use raypix_core::{DetectionReport, EventSink, Image};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress events emitted by [`process_measurements`].
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A measurement begins at the given folder index.
    MeasurementStarted {
        measurement: usize,
        start_index: usize,
    },
    /// Groups with at least one existing folder.
    GroupsDiscovered {
        measurement: usize,
        groups: Vec<FolderGroup>,
    },
    /// A folder was combined.
    FolderCombined {
        group: String,
        folder: String,
        images: usize,
        reports: Vec<DetectionReport>,
        fallback_pixels: usize,
    },
    /// A folder failed and was left out of its group sum.
    FolderSkipped {
        group: String,
        folder: String,
        reason: String,
    },
    /// A group image was written.
    ImageWritten { group: String, path: PathBuf },
    /// Processing stopped on request.
    Cancelled,
}

/// Outcome of a processing run.
#[derive(Debug, Clone, Default)]
pub struct ProcessingSummary {
    /// Measurements started.
    pub measurements: usize,
    /// Files written, in order.
    pub written: Vec<PathBuf>,
    /// Folders that failed and were skipped.
    pub skipped_folders: Vec<PathBuf>,
    /// Whether the run was cancelled before finishing.
    pub cancelled: bool,
}

/// Combined exposures of one folder.
#[derive(Debug, Clone)]
pub struct DirectoryCombination {
    /// Source files in combination order.
    pub files: Vec<PathBuf>,
    /// Combined image and per-file detection reports.
    pub combination: GroupCombination,
}

/// Combine every TIFF in `dir` into one image.
///
/// # Errors
/// Returns an error if the folder has no TIFF files, a file cannot be
/// decoded, or the images differ in shape.
pub fn combine_directory(dir: &Path, combiner: &ImageCombiner) -> Result<DirectoryCombination> {
    let files = list_tiff_files(dir)?;
    if files.is_empty() {
        return Err(Error::NoImages(dir.to_path_buf()));
    }

    let images = files.iter().map(read_image).collect::<Result<Vec<_>>>()?;
    let combination = combiner.combine(&images)?;

    for (file, report) in files.iter().zip(&combination.reports) {
        log::debug!("{}: found cosmic rays: {report}", file.display());
    }
    if combination.fallbacks() > 0 {
        log::debug!(
            "{}: {} pixels flagged in every exposure kept their original values",
            dir.display(),
            combination.fallbacks()
        );
    }

    Ok(DirectoryCombination { files, combination })
}

/// Output path for a group image: `{prefix}_{group}_{measurement:04}.tif`.
#[must_use]
pub fn output_path(output: &Path, prefix: &str, group: &str, measurement: usize) -> PathBuf {
    output.join(format!("{prefix}_{group}_{measurement:04}.tif"))
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

fn accumulate(total: &mut Option<Image>, image: Image, index: usize) -> raypix_core::Result<()> {
    match total {
        Some(sum) => {
            if sum.dim() != image.dim() {
                return Err(raypix_core::Error::ShapeMismatch {
                    index,
                    expected: sum.dim(),
                    found: image.dim(),
                });
            }
            *sum += &image;
        }
        None => *total = Some(image),
    }
    Ok(())
}

/// Process every measurement in the configured index range.
///
/// Measurements start at `config.start` and continue while the current
/// index is at most `config.end`. A folder that fails is logged, reported
/// as [`PipelineEvent::FolderSkipped`] and left out of its group.
///
/// `cancel` is checked before each measurement, group and folder.
///
/// # Errors
/// Returns an error if the configuration is invalid, the input directory
/// is missing, the output directory cannot be created, a measurement finds
/// no folders, or an output file cannot be written.
pub fn process_measurements<S>(
    config: &MeasurementConfig,
    sink: &mut S,
    cancel: Option<&AtomicBool>,
) -> Result<ProcessingSummary>
where
    S: EventSink<PipelineEvent>,
{
    config.validate()?;
    if !config.input.is_dir() {
        return Err(Error::InputNotFound(config.input.clone()));
    }
    std::fs::create_dir_all(&config.output)?;

    let combiner = ImageCombiner::new(config.detection)?;
    let mut summary = ProcessingSummary::default();
    let mut index = config.start;
    let mut measurement = 1;

    while index <= config.end {
        if is_cancelled(cancel) {
            return Ok(cancelled(summary, sink));
        }

        log::info!("Processing measurement {measurement} (starting from g{index})");
        sink.emit(PipelineEvent::MeasurementStarted {
            measurement,
            start_index: index,
        });
        summary.measurements += 1;

        let (groups, next_index) = discover_groups(&config.input, index, &config.groups);
        if groups.is_empty() {
            return Err(Error::NoGroups(index));
        }
        sink.emit(PipelineEvent::GroupsDiscovered {
            measurement,
            groups: groups.clone(),
        });

        for group in &groups {
            if is_cancelled(cancel) {
                return Ok(cancelled(summary, sink));
            }
            log::info!("Processing {} group: {}", group.name, group.folders.join(", "));

            let mut total: Option<Image> = None;
            for (position, folder) in group.folders.iter().enumerate() {
                if is_cancelled(cancel) {
                    return Ok(cancelled(summary, sink));
                }

                let dir = config.input.join(folder);
                let outcome = combine_directory(&dir, &combiner).and_then(|result| {
                    let images = result.files.len();
                    let GroupCombination {
                        image,
                        reports,
                        fallback_pixels,
                    } = result.combination;
                    accumulate(&mut total, image, position)?;
                    Ok((images, reports, fallback_pixels.iter().sum::<usize>()))
                });

                match outcome {
                    Ok((images, reports, fallback_pixels)) => {
                        sink.emit(PipelineEvent::FolderCombined {
                            group: group.name.clone(),
                            folder: folder.clone(),
                            images,
                            reports,
                            fallback_pixels,
                        });
                    }
                    Err(err) => {
                        log::warn!("Error processing folder {folder}: {err}");
                        summary.skipped_folders.push(dir);
                        sink.emit(PipelineEvent::FolderSkipped {
                            group: group.name.clone(),
                            folder: folder.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            if let Some(image) = total {
                let path = output_path(&config.output, &config.prefix, &group.name, measurement);
                write_image(&path, &image)?;
                log::info!("Saved combined data to {}", path.display());
                sink.emit(PipelineEvent::ImageWritten {
                    group: group.name.clone(),
                    path: path.clone(),
                });
                summary.written.push(path);
            }
        }

        index = next_index;
        measurement += 1;
    }

    Ok(summary)
}

fn cancelled<S: EventSink<PipelineEvent>>(
    mut summary: ProcessingSummary,
    sink: &mut S,
) -> ProcessingSummary {
    log::info!("Processing cancelled");
    sink.emit(PipelineEvent::Cancelled);
    summary.cancelled = true;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use raypix_core::DetectionParams;
    use std::fs;
    use tempfile::TempDir;

    fn params() -> DetectionParams {
        DetectionParams::new()
            .with_sigma(3.0)
            .with_window_size(3)
            .with_min_intensity(0.0)
    }

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("/out"), "scan", "center", 7);
        assert_eq!(path, PathBuf::from("/out/scan_center_0007.tif"));
        let path = output_path(Path::new("/out"), "", "side", 12_345);
        assert_eq!(path, PathBuf::from("/out/_side_12345.tif"));
    }

    #[test]
    fn test_combine_directory_empty_folder() {
        let dir = TempDir::new().unwrap();
        let combiner = ImageCombiner::new(params()).unwrap();
        let err = combine_directory(dir.path(), &combiner).unwrap_err();
        assert!(matches!(err, Error::NoImages(_)));
    }

    #[test]
    fn test_combine_directory_sums_exposures() {
        let dir = TempDir::new().unwrap();
        for i in 0..3 {
            let mut image = Image::from_elem((6, 6), 10.0);
            if i == 1 {
                image[[2, 3]] = 20_000.0;
            }
            write_image(dir.path().join(format!("exp_{i}.tif")), &image).unwrap();
        }
        fs::write(dir.path().join("readme.txt"), b"not an image").unwrap();

        let combiner = ImageCombiner::new(params()).unwrap();
        let result = combine_directory(dir.path(), &combiner).unwrap();
        assert_eq!(result.files.len(), 3);
        assert_eq!(result.combination.reports[1].total(), 1);
        assert!((result.combination.image[[2, 3]] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_accumulate_rejects_shape_change() {
        let mut total = None;
        accumulate(&mut total, Image::zeros((2, 2)), 0).unwrap();
        accumulate(&mut total, Image::from_elem((2, 2), 1.0), 1).unwrap();
        let err = accumulate(&mut total, Image::zeros((3, 2)), 2).unwrap_err();
        assert!(matches!(err, raypix_core::Error::ShapeMismatch { index: 2, .. }));
        assert_eq!(total.unwrap(), Image::from_elem((2, 2), 1.0));
    }
}
