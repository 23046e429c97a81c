//! Encoder adapter: orders the selected snapshots and drives `ffmpeg` to
//! render the clip artifact.
//!
//! The encoder binary is an external collaborator; this module owns only
//! the frame ordering, the concat manifest, the command line, and the
//! mapping of failures into structured errors.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;

use crate::error::{SnapOpsError, SnapOpsResult};
use crate::model::OutputFormat;
use crate::select::Snapshot;

/// Seconds each snapshot is displayed in the rendered clip.
const FRAME_SECONDS: u32 = 1;

/// One render invocation: source directory, destination artifact, format.
#[derive(Debug)]
pub struct ClipJob {
    source_dir: PathBuf,
    destination: PathBuf,
    format: OutputFormat,
}

impl ClipJob {
    /// Assemble a job writing `<filename>.<format>` into `destination_dir`.
    #[must_use]
    pub fn new(
        source_dir: &Path,
        destination_dir: &Path,
        filename: &str,
        format: OutputFormat,
    ) -> Self {
        let destination = destination_dir.join(format!("{filename}.{}", format.extension()));
        Self {
            source_dir: source_dir.to_path_buf(),
            destination,
            format,
        }
    }

    /// Path of the artifact this job writes.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Render the frames into the destination artifact.
    ///
    /// Frames are reordered ascending by modification time in place
    /// (stable, so ties keep their listing order) before encoding.
    ///
    /// # Errors
    ///
    /// Returns an io error when the manifest cannot be staged or the
    /// encoder cannot be spawned, and an encoder error carrying the
    /// destination path and captured stderr when it exits non-zero. No
    /// partial-artifact cleanup is performed.
    pub fn run(&self, frames: &mut [Snapshot]) -> SnapOpsResult<()> {
        order_by_modified(frames);

        let manifest = self.write_manifest(frames)?;
        let output = self
            .build_command(manifest.path())
            .output()
            .map_err(|source| SnapOpsError::io("encode.spawn", &self.destination, source))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SnapOpsError::Encoder {
                destination: self.destination.clone(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn write_manifest(&self, frames: &[Snapshot]) -> SnapOpsResult<NamedTempFile> {
        let mut manifest = tempfile::Builder::new()
            .prefix("snapreel-frames-")
            .suffix(".ffconcat")
            .tempfile()
            .map_err(|source| SnapOpsError::io("encode.stage_manifest", &self.destination, source))?;
        manifest
            .write_all(self.concat_manifest(frames).as_bytes())
            .map_err(|source| SnapOpsError::io("encode.write_manifest", manifest.path(), source))?;
        Ok(manifest)
    }

    fn concat_manifest(&self, frames: &[Snapshot]) -> String {
        let mut manifest = String::from("ffconcat version 1.0\n");
        for frame in frames {
            let path = self.source_dir.join(&frame.name);
            manifest.push_str(&format!(
                "file '{}'\nduration {FRAME_SECONDS}\n",
                escape_concat_path(&path)
            ));
        }
        // The concat demuxer ignores the final duration unless the last
        // frame is listed again.
        if let Some(last) = frames.last() {
            let path = self.source_dir.join(&last.name);
            manifest.push_str(&format!("file '{}'\n", escape_concat_path(&path)));
        }
        manifest
    }

    fn build_command(&self, manifest: &Path) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-hide_banner",
            "-nostdin",
            "-loglevel", "error",
            "-y",
            "-f", "concat",
            "-safe", "0",
            "-i",
        ]);
        cmd.arg(manifest);
        if self.format == OutputFormat::Mp4 {
            // libx264 rejects odd dimensions; snap them down to even.
            cmd.args([
                "-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                "-c:v", "libx264",
                "-pix_fmt", "yuv420p",
            ]);
        }
        cmd.arg(&self.destination);
        cmd
    }
}

/// Stable ascending sort by modification time; ties keep listing order.
pub fn order_by_modified(frames: &mut [Snapshot]) {
    frames.sort_by_key(|frame| frame.modified);
}

fn escape_concat_path(path: &Path) -> String {
    path.display().to_string().replace('\'', r"'\''")
}
