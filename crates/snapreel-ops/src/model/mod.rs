//! Request model for the snapshot maintenance services.
//!
//! # Design
//! - Requests mirror the host platform's payload keys on the wire and
//!   fill documented defaults for absent optional fields.
//! - Validation happens before any filesystem effect.
//! - The original time-window bounds are retained verbatim so result
//!   events can echo them without recomputation.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, LocalResult, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SnapOpsError, SnapOpsResult};

/// Sentinel timestamp meaning "no bound" on that side of the window.
pub const EPOCH_SENTINEL: &str = "01/01/1970 00:00:00";

/// Wall-clock format accepted for request timestamps.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Output file names may not contain path separators or reserved characters.
static FILENAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^<>:;,.?"*|/\\]+$"#).expect("filename pattern compiles"));

/// Output container formats supported by the encoder adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Animated GIF.
    #[default]
    Gif,
    /// H.264 MP4.
    Mp4,
}

impl OutputFormat {
    /// File extension for the container, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }
}

/// Inclusive modification-time window derived from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    begin: Option<SystemTime>,
    end: Option<SystemTime>,
    begin_raw: String,
    end_raw: String,
}

impl TimeWindow {
    /// Window with no bound on either side.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            begin: None,
            end: None,
            begin_raw: EPOCH_SENTINEL.to_string(),
            end_raw: EPOCH_SENTINEL.to_string(),
        }
    }

    /// Parse the begin/end request strings, treating the epoch sentinel as
    /// "no bound" on that side.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when a non-sentinel bound does not
    /// parse as local wall-clock time.
    pub fn parse(begin: &str, end: &str) -> SnapOpsResult<Self> {
        Ok(Self {
            begin: parse_bound("begintimestamp", begin)?,
            end: parse_bound("endtimestamp", end)?,
            begin_raw: begin.to_string(),
            end_raw: end.to_string(),
        })
    }

    /// Whether the instant falls inside the window, bounds inclusive.
    #[must_use]
    pub fn contains(&self, instant: SystemTime) -> bool {
        if let Some(begin) = self.begin
            && instant < begin
        {
            return false;
        }
        if let Some(end) = self.end
            && instant > end
        {
            return false;
        }
        true
    }

    /// Parsed begin bound, when one was requested.
    #[must_use]
    pub const fn begin(&self) -> Option<SystemTime> {
        self.begin
    }

    /// Parsed end bound, when one was requested.
    #[must_use]
    pub const fn end(&self) -> Option<SystemTime> {
        self.end
    }

    /// Begin bound exactly as it appeared in the request.
    #[must_use]
    pub fn begin_raw(&self) -> &str {
        &self.begin_raw
    }

    /// End bound exactly as it appeared in the request.
    #[must_use]
    pub fn end_raw(&self) -> &str {
        &self.end_raw
    }
}

fn parse_bound(field: &'static str, value: &str) -> SnapOpsResult<Option<SystemTime>> {
    if value == EPOCH_SENTINEL {
        return Ok(None);
    }

    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| {
        SnapOpsError::InvalidRequest {
            field,
            reason: "malformed_timestamp",
            value: Some(value.to_string()),
        }
    })?;

    match Local.from_local_datetime(&naive) {
        LocalResult::Single(moment) | LocalResult::Ambiguous(moment, _) => {
            Ok(Some(moment.into()))
        }
        LocalResult::None => Err(SnapOpsError::InvalidRequest {
            field,
            reason: "nonexistent_local_time",
            value: Some(value.to_string()),
        }),
    }
}

/// Request payload for the `start` (render) operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    /// Directory containing the candidate snapshots.
    #[serde(rename = "sourcepath")]
    pub source_dir: PathBuf,
    /// Directory the rendered artifact is written to.
    #[serde(rename = "destinationpath")]
    pub destination_dir: PathBuf,
    /// Artifact base name, without extension.
    #[serde(default = "default_filename")]
    pub filename: String,
    /// Output container format.
    #[serde(default)]
    pub format: OutputFormat,
    /// File names excluded from selection regardless of timestamps.
    #[serde(rename = "excludelist", default)]
    pub exclude: Vec<String>,
    /// Begin bound, `DD/MM/YYYY HH:MM:SS` or the epoch sentinel.
    #[serde(rename = "begintimestamp", default = "default_bound")]
    pub begin: String,
    /// End bound, `DD/MM/YYYY HH:MM:SS` or the epoch sentinel.
    #[serde(rename = "endtimestamp", default = "default_bound")]
    pub end: String,
}

impl StartRequest {
    /// Check the request against the documented constraints.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error for a missing source or destination
    /// directory or a forbidden output file name.
    pub fn validate(&self) -> SnapOpsResult<()> {
        ensure_directory("sourcepath", &self.source_dir)?;
        ensure_directory("destinationpath", &self.destination_dir)?;
        validate_filename(&self.filename)
    }

    /// Parse the requested time window.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when a bound is malformed.
    pub fn window(&self) -> SnapOpsResult<TimeWindow> {
        TimeWindow::parse(&self.begin, &self.end)
    }
}

/// Request payload for the `delete` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Directory containing the candidate snapshots.
    #[serde(rename = "sourcepath")]
    pub source_dir: PathBuf,
    /// File names excluded from selection regardless of timestamps.
    #[serde(rename = "excludelist", default)]
    pub exclude: Vec<String>,
    /// Begin bound, `DD/MM/YYYY HH:MM:SS` or the epoch sentinel.
    #[serde(rename = "begintimestamp", default = "default_bound")]
    pub begin: String,
    /// End bound, `DD/MM/YYYY HH:MM:SS` or the epoch sentinel.
    #[serde(rename = "endtimestamp", default = "default_bound")]
    pub end: String,
}

impl DeleteRequest {
    /// Check the request against the documented constraints.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when the source directory is missing.
    pub fn validate(&self) -> SnapOpsResult<()> {
        ensure_directory("sourcepath", &self.source_dir)
    }

    /// Parse the requested time window.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when a bound is malformed.
    pub fn window(&self) -> SnapOpsResult<TimeWindow> {
        TimeWindow::parse(&self.begin, &self.end)
    }
}

/// Request payload for the `move` operation.
///
/// Unlike `start`, the destination directory may be absent; the relocator
/// creates it (intermediate segments included) before moving files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Directory containing the candidate snapshots.
    #[serde(rename = "sourcepath")]
    pub source_dir: PathBuf,
    /// Directory the snapshots are moved into.
    #[serde(rename = "destinationpath")]
    pub destination_dir: PathBuf,
    /// File names excluded from selection regardless of timestamps.
    #[serde(rename = "excludelist", default)]
    pub exclude: Vec<String>,
    /// Begin bound, `DD/MM/YYYY HH:MM:SS` or the epoch sentinel.
    #[serde(rename = "begintimestamp", default = "default_bound")]
    pub begin: String,
    /// End bound, `DD/MM/YYYY HH:MM:SS` or the epoch sentinel.
    #[serde(rename = "endtimestamp", default = "default_bound")]
    pub end: String,
}

impl MoveRequest {
    /// Check the request against the documented constraints.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when the source directory is missing.
    pub fn validate(&self) -> SnapOpsResult<()> {
        ensure_directory("sourcepath", &self.source_dir)
    }

    /// Parse the requested time window.
    ///
    /// # Errors
    ///
    /// Returns an invalid-request error when a bound is malformed.
    pub fn window(&self) -> SnapOpsResult<TimeWindow> {
        TimeWindow::parse(&self.begin, &self.end)
    }
}

/// Tagged request dispatched to exactly one operation handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationRequest {
    /// Render the selected snapshots into a clip artifact.
    Start(StartRequest),
    /// Delete the selected snapshots from the source directory.
    Delete(DeleteRequest),
    /// Move the selected snapshots to another directory.
    Move(MoveRequest),
}

impl OperationRequest {
    /// Service name of the requested operation.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Delete(_) => "delete",
            Self::Move(_) => "move",
        }
    }
}

fn default_filename() -> String {
    "latest".to_string()
}

fn default_bound() -> String {
    EPOCH_SENTINEL.to_string()
}

fn ensure_directory(field: &'static str, path: &Path) -> SnapOpsResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SnapOpsError::InvalidRequest {
            field,
            reason: "not_a_directory",
            value: Some(path.display().to_string()),
        })
    }
}

fn validate_filename(filename: &str) -> SnapOpsResult<()> {
    if FILENAME_PATTERN.is_match(filename) {
        Ok(())
    } else {
        Err(SnapOpsError::InvalidRequest {
            field: "filename",
            reason: "forbidden_characters",
            value: Some(filename.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn start_request_fills_documented_defaults() {
        let request: OperationRequest = serde_json::from_value(serde_json::json!({
            "operation": "start",
            "sourcepath": "/camera/front",
            "destinationpath": "/media/clips",
        }))
        .expect("minimal start request");

        let OperationRequest::Start(start) = request else {
            panic!("expected start variant");
        };
        assert_eq!(start.filename, "latest");
        assert_eq!(start.format, OutputFormat::Gif);
        assert!(start.exclude.is_empty());
        assert_eq!(start.begin, EPOCH_SENTINEL);
        assert_eq!(start.end, EPOCH_SENTINEL);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let result: Result<OperationRequest, _> = serde_json::from_value(serde_json::json!({
            "operation": "start",
            "sourcepath": "/camera/front",
            "destinationpath": "/media/clips",
            "format": "avi",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn operation_tag_selects_the_variant() {
        let request: OperationRequest = serde_json::from_value(serde_json::json!({
            "operation": "move",
            "sourcepath": "/camera/front",
            "destinationpath": "/archive/2024",
            "excludelist": ["keep.jpg"],
        }))
        .expect("move request");

        assert_eq!(request.kind(), "move");
        let OperationRequest::Move(relocate) = request else {
            panic!("expected move variant");
        };
        assert_eq!(relocate.exclude, vec!["keep.jpg".to_string()]);
    }

    #[test]
    fn filename_constraint_rejects_reserved_characters() {
        assert!(validate_filename("front_door-2024").is_ok());
        for candidate in ["late.st", "a/b", "a\\b", "a:b", "what?", "\"quoted\"", ""] {
            assert!(
                validate_filename(candidate).is_err(),
                "{candidate:?} should be rejected"
            );
        }
    }

    #[test]
    fn sentinel_bounds_disable_filtering() {
        let window = TimeWindow::parse(EPOCH_SENTINEL, EPOCH_SENTINEL).expect("sentinel window");
        assert_eq!(window, TimeWindow::unbounded());
        assert!(window.contains(SystemTime::UNIX_EPOCH));
        assert!(window.contains(SystemTime::UNIX_EPOCH + Duration::from_secs(4_000_000_000)));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window =
            TimeWindow::parse("01/01/2024 00:00:00", "02/01/2024 00:00:00").expect("window");
        let begin = window.begin().expect("begin bound");
        let end = window.end().expect("end bound");

        assert!(window.contains(begin));
        assert!(window.contains(end));
        assert!(!window.contains(begin - Duration::from_secs(1)));
        assert!(!window.contains(end + Duration::from_secs(1)));
    }

    #[test]
    fn begin_only_window_keeps_later_files() {
        let window = TimeWindow::parse("01/01/2024 00:00:00", EPOCH_SENTINEL).expect("window");
        let begin = window.begin().expect("begin bound");

        assert!(window.end().is_none());
        assert!(window.contains(begin + Duration::from_secs(3600)));
        assert!(!window.contains(begin - Duration::from_secs(3600)));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let result = TimeWindow::parse("2024-01-01 00:00:00", EPOCH_SENTINEL);
        assert!(matches!(
            result,
            Err(SnapOpsError::InvalidRequest {
                field: "begintimestamp",
                ..
            })
        ));
    }

    #[test]
    fn raw_bounds_are_echoed_verbatim() {
        let window = TimeWindow::parse("01/01/2024 00:00:00", EPOCH_SENTINEL).expect("window");
        assert_eq!(window.begin_raw(), "01/01/2024 00:00:00");
        assert_eq!(window.end_raw(), EPOCH_SENTINEL);
    }
}
