use approx::assert_abs_diff_eq;
use raypix_core::{DetectionParams, Image, NullSink};
use raypix_io::{
    folder_name, process_measurements, read_image, write_image, Error, GroupSpec,
    MeasurementConfig, PipelineEvent,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

const SHAPE: (usize, usize) = (16, 16);
const BACKGROUND: f64 = 100.0;

/// Creates `g{index}` with `exposures` flat frames; the first frame of
/// every folder carries a spike.
fn make_folder(root: &Path, index: usize, exposures: usize) {
    let dir = root.join(folder_name(index));
    std::fs::create_dir(&dir).unwrap();
    for i in 0..exposures {
        let mut frame = Image::from_elem(SHAPE, BACKGROUND);
        if i == 0 {
            frame[[5, 7]] = 60_000.0;
        }
        write_image(dir.join(format!("frame_{i:03}.tif")), &frame).unwrap();
    }
}

fn config(input: &Path, output: &Path) -> MeasurementConfig {
    MeasurementConfig::new(input, output)
        .with_range(1, 4)
        .with_prefix("test")
}

#[test]
fn test_end_to_end_single_measurement() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for index in 1..=4 {
        make_folder(input.path(), index, 2);
    }

    let mut events = Vec::new();
    let summary = process_measurements(
        &config(input.path(), output.path()),
        &mut |event: PipelineEvent| events.push(event),
        None,
    )
    .unwrap();

    assert_eq!(summary.measurements, 1);
    assert!(!summary.cancelled);
    assert!(summary.skipped_folders.is_empty());

    let center = output.path().join("test_center_0001.tif");
    let side = output.path().join("test_side_0001.tif");
    assert_eq!(summary.written, vec![center.clone(), side.clone()]);

    // Two folders of two frames each, spike replaced by the clean frame
    for path in [&center, &side] {
        let image = read_image(path).unwrap();
        assert_eq!(image.dim(), SHAPE);
        for &value in &image {
            assert_abs_diff_eq!(value, 4.0 * BACKGROUND, epsilon = 1e-3);
        }
    }

    let combined = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::FolderCombined { .. }))
        .count();
    assert_eq!(combined, 4);
    assert!(matches!(
        events.first(),
        Some(PipelineEvent::MeasurementStarted {
            measurement: 1,
            start_index: 1
        })
    ));
}

#[test]
fn test_second_measurement_numbering() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for index in 1..=4 {
        make_folder(input.path(), index, 2);
    }

    let config = MeasurementConfig::new(input.path(), output.path())
        .with_range(1, 3)
        .with_prefix("run")
        .with_groups(vec![GroupSpec::new("center", 1), GroupSpec::new("side", 1)]);
    let summary = process_measurements(&config, &mut NullSink, None).unwrap();

    // Measurement 1 uses g1/g2 and measurement 2 uses g3/g4
    assert_eq!(summary.measurements, 2);
    assert!(output.path().join("run_center_0002.tif").exists());
    assert!(output.path().join("run_side_0002.tif").exists());
}

#[test]
fn test_missing_measurement_is_an_error() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for index in 1..=4 {
        make_folder(input.path(), index, 2);
    }

    let config = config(input.path(), output.path()).with_range(1, 100);
    let err = process_measurements(&config, &mut NullSink, None).unwrap_err();
    assert!(matches!(err, Error::NoGroups(5)));
    // The first measurement was already written
    assert!(output.path().join("test_center_0001.tif").exists());
}

#[test]
fn test_failing_folder_is_skipped() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    make_folder(input.path(), 1, 2);
    std::fs::create_dir(input.path().join(folder_name(2))).unwrap();
    make_folder(input.path(), 3, 1);

    let config = config(input.path(), output.path());
    let mut skipped = Vec::new();
    let summary = process_measurements(
        &config,
        &mut |event: PipelineEvent| {
            if let PipelineEvent::FolderSkipped { folder, .. } = event {
                skipped.push(folder);
            }
        },
        None,
    )
    .unwrap();

    assert_eq!(skipped, vec!["g2".to_string()]);
    assert_eq!(summary.skipped_folders, vec![input.path().join("g2")]);

    let center = read_image(output.path().join("test_center_0001.tif")).unwrap();
    assert_abs_diff_eq!(center[[5, 7]], 2.0 * BACKGROUND, epsilon = 1e-3);

    // A single exposure passes through unchanged, spike included
    let side = read_image(output.path().join("test_side_0001.tif")).unwrap();
    assert_abs_diff_eq!(side[[5, 7]], 60_000.0, epsilon = 1e-3);
    assert_abs_diff_eq!(side[[0, 0]], BACKGROUND, epsilon = 1e-3);
}

#[test]
fn test_cancel_before_start_writes_nothing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for index in 1..=4 {
        make_folder(input.path(), index, 2);
    }

    let cancel = AtomicBool::new(true);
    let mut events = Vec::new();
    let summary = process_measurements(
        &config(input.path(), output.path()),
        &mut |event: PipelineEvent| events.push(event),
        Some(&cancel),
    )
    .unwrap();

    assert!(summary.cancelled);
    assert!(summary.written.is_empty());
    assert!(matches!(events.as_slice(), [PipelineEvent::Cancelled]));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_input_directory() {
    let output = TempDir::new().unwrap();
    let config = MeasurementConfig::new("/nonexistent/raypix-input", output.path());
    let err = process_measurements(&config, &mut NullSink, None).unwrap_err();
    assert!(matches!(err, Error::InputNotFound(_)));
}

#[test]
fn test_invalid_detection_rejected_before_processing() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let config = config(input.path(), output.path())
        .with_detection(DetectionParams::new().with_window_size(4));
    let err = process_measurements(&config, &mut NullSink, None).unwrap_err();
    assert!(matches!(
        err,
        Error::CoreError(raypix_core::Error::InvalidWindowSize(4))
    ));
}

#[test]
fn test_shared_spike_reported_as_fallback() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let dir = input.path().join(folder_name(1));
    std::fs::create_dir(&dir).unwrap();
    for i in 0..2 {
        let mut frame = Image::from_elem(SHAPE, BACKGROUND);
        frame[[5, 7]] = 60_000.0;
        write_image(dir.join(format!("frame_{i:03}.tif")), &frame).unwrap();
    }

    let config = config(input.path(), output.path())
        .with_range(1, 1)
        .with_groups(vec![GroupSpec::new("center", 1)]);
    let mut fallbacks = Vec::new();
    process_measurements(
        &config,
        &mut |event: PipelineEvent| {
            if let PipelineEvent::FolderCombined { fallback_pixels, .. } = event {
                fallbacks.push(fallback_pixels);
            }
        },
        None,
    )
    .unwrap();

    // Each exposure's hit has no clean counterpart, so both keep their value
    assert_eq!(fallbacks, vec![2]);
    let center = read_image(output.path().join("test_center_0001.tif")).unwrap();
    assert_abs_diff_eq!(center[[5, 7]], 120_000.0, epsilon = 1e-3);
}
