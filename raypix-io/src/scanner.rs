//! Folder scanner for measurement directories.
//!
//! Raw exposures live in numbered folders `g1`, `g2`, ... under the input
//! directory. A measurement consumes one consecutive run of folder indices
//! per configured group.

use crate::config::GroupSpec;
use crate::Result;
use std::path::{Path, PathBuf};

/// Folder name for a given index.
#[must_use]
pub fn folder_name(index: usize) -> String {
    format!("g{index}")
}

/// Whether the path carries a `.tif` or `.tiff` extension (any case).
#[must_use]
pub fn is_tiff_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "tif" || ext == "tiff"
        })
}

/// Lists the TIFF files directly inside `dir`, sorted by path.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn list_tiff_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_tiff_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The existing folders assigned to one group of a measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderGroup {
    /// Group name.
    pub name: String,
    /// Folder names relative to the input directory, in index order.
    pub folders: Vec<String>,
}

/// Assigns folder indices to each group starting at `start`.
///
/// Every group advances the index by its folder count whether or not the
/// folders exist. Groups whose folders are all missing are left out.
///
/// # Returns
/// A tuple `(groups, next_index)` where `next_index` is the first index of
/// the following measurement.
#[must_use]
pub fn discover_groups(
    input: &Path,
    start: usize,
    specs: &[GroupSpec],
) -> (Vec<FolderGroup>, usize) {
    let mut groups = Vec::with_capacity(specs.len());
    let mut index = start;

    for spec in specs {
        let folders: Vec<String> = (index..index + spec.num_folders)
            .map(folder_name)
            .filter(|name| input.join(name).is_dir())
            .collect();
        index += spec.num_folders;

        if !folders.is_empty() {
            groups.push(FolderGroup {
                name: spec.name.clone(),
                folders,
            });
        }
    }

    (groups, index)
}
