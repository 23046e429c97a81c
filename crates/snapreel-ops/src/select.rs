//! Shared snapshot selection: extension whitelist, exclusion list, and
//! modification-time window, applied before any operation-specific action.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::error::{SnapOpsError, SnapOpsResult};
use crate::model::TimeWindow;

/// Extensions eligible for rendering.
pub(crate) const SNAPSHOT_EXTENSIONS: &[&str] = &[".jpg", ".png"];

/// Extensions eligible for delete/move: snapshots plus rendered artifacts.
pub(crate) const MAINTENANCE_EXTENSIONS: &[&str] = &[".jpg", ".png", ".mp4", ".gif"];

/// A candidate file that survived every filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// File name within the source directory.
    pub name: String,
    /// Filesystem modification time.
    pub modified: SystemTime,
}

/// List `source_dir` and keep the regular files passing the extension
/// whitelist, the exclusion list, and the time window, in listing order.
///
/// Extensions match by ASCII case-insensitive suffix; exclusion entries
/// match the file name exactly and win over every other filter.
///
/// # Errors
///
/// Returns an io error when the directory cannot be listed or a
/// candidate's metadata cannot be read.
pub fn select_snapshots(
    source_dir: &Path,
    extensions: &[&str],
    exclude: &[String],
    window: &TimeWindow,
) -> SnapOpsResult<Vec<Snapshot>> {
    let entries = fs::read_dir(source_dir)
        .map_err(|source| SnapOpsError::io("select.read_dir", source_dir, source))?;

    let mut selected = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|source| SnapOpsError::io("select.read_entry", source_dir, source))?;
        let file_type = entry
            .file_type()
            .map_err(|source| SnapOpsError::io("select.file_type", entry.path(), source))?;
        if !file_type.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            debug!(path = %entry.path().display(), "skipping non-UTF-8 file name");
            continue;
        };
        if !has_whitelisted_extension(&name, extensions) {
            continue;
        }
        if exclude.iter().any(|excluded| excluded == &name) {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .map_err(|source| SnapOpsError::io("select.metadata", entry.path(), source))?;
        if !window.contains(modified) {
            continue;
        }

        selected.push(Snapshot { name, modified });
    }

    Ok(selected)
}

fn has_whitelisted_extension(name: &str, extensions: &[&str]) -> bool {
    let lowered = name.to_ascii_lowercase();
    extensions.iter().any(|extension| lowered.ends_with(extension))
}
