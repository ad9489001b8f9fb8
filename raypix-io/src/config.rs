//! Measurement configuration.
//!
//! Group layouts come from JSON in one of two shapes:
//!
//! ```json
//! [{"num_images": 2, "name": "center"}, {"num_images": 2, "name": "side"}]
//! ```
//!
//! or a single mapping from group name to folder count:
//!
//! ```json
//! [{"center": 2, "side": 2}]
//! ```

use crate::{Error, Result};
use raypix_core::DetectionParams;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One named group of consecutive measurement folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Name used in the output file.
    pub name: String,
    /// Number of consecutive folders consumed by this group.
    #[serde(alias = "num_images")]
    pub num_folders: usize,
}

impl GroupSpec {
    /// Create a group spec.
    #[must_use]
    pub fn new(name: impl Into<String>, num_folders: usize) -> Self {
        Self {
            name: name.into(),
            num_folders,
        }
    }
}

/// Default layout: two center folders followed by two side folders.
#[must_use]
pub fn default_groups() -> Vec<GroupSpec> {
    vec![GroupSpec::new("center", 2), GroupSpec::new("side", 2)]
}

/// Parse a JSON group layout.
///
/// # Errors
/// Returns an error if the JSON is malformed, empty, or names a group with
/// zero folders.
pub fn parse_group_config(json: &str) -> Result<Vec<GroupSpec>> {
    let value: Value = serde_json::from_str(json)?;
    group_specs_from_value(&value)
}

fn group_specs_from_value(value: &Value) -> Result<Vec<GroupSpec>> {
    let entries = value
        .as_array()
        .ok_or_else(|| config_error("group configuration must be a JSON array"))?;

    let mut specs = Vec::new();
    for entry in entries {
        let object = entry
            .as_object()
            .ok_or_else(|| config_error("group entries must be JSON objects"))?;

        if object.contains_key("name") {
            specs.push(GroupSpec::deserialize(entry)?);
        } else {
            for (name, count) in object {
                let num_folders = count
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        config_error(&format!("folder count for '{name}' must be a positive integer"))
                    })?;
                specs.push(GroupSpec::new(name.clone(), num_folders));
            }
        }
    }

    validate_groups(&specs)?;
    Ok(specs)
}

fn validate_groups(specs: &[GroupSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(config_error("group configuration is empty"));
    }
    for spec in specs {
        if spec.name.is_empty() {
            return Err(config_error("group name must not be empty"));
        }
        if spec.num_folders == 0 {
            return Err(config_error(&format!(
                "group '{}' must span at least one folder",
                spec.name
            )));
        }
    }
    Ok(())
}

fn config_error(message: &str) -> Error {
    Error::CoreError(raypix_core::Error::Config(message.to_string()))
}

fn deserialize_groups<'de, D>(deserializer: D) -> std::result::Result<Vec<GroupSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    group_specs_from_value(&value).map_err(serde::de::Error::custom)
}

const fn default_start() -> usize {
    1
}

const fn default_end() -> usize {
    100
}

/// Settings for a full measurement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Directory holding the `g{index}` folders.
    pub input: PathBuf,
    /// Directory receiving combined TIFFs.
    pub output: PathBuf,
    /// First folder index.
    #[serde(default = "default_start")]
    pub start: usize,
    /// Last folder index a measurement may start at.
    #[serde(default = "default_end")]
    pub end: usize,
    /// Output file name prefix.
    #[serde(default)]
    pub prefix: String,
    /// Group layout of each measurement.
    #[serde(default = "default_groups", deserialize_with = "deserialize_groups")]
    pub groups: Vec<GroupSpec>,
    /// Cosmic-ray detection parameters.
    #[serde(default)]
    pub detection: DetectionParams,
}

impl MeasurementConfig {
    /// Create a configuration with default range, groups and detection.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            start: default_start(),
            end: default_end(),
            prefix: String::new(),
            groups: default_groups(),
            detection: DetectionParams::default(),
        }
    }

    /// Load from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the folder index range.
    #[must_use]
    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set the output prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the group layout.
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<GroupSpec>) -> Self {
        self.groups = groups;
        self
    }

    /// Set detection parameters.
    #[must_use]
    pub fn with_detection(mut self, detection: DetectionParams) -> Self {
        self.detection = detection;
        self
    }

    /// Check groups and detection parameters.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        validate_groups(&self.groups)?;
        self.detection.validate()?;
        Ok(())
    }
}
