//! Operation handlers: dispatch a validated request to exactly one of
//! render/delete/move over the shared selection step, then notify.
//!
//! The event-publishing capability is injected explicitly; the service
//! holds no ambient globals and no state between invocations.

use std::fs;
use std::path::Path;

use snapreel_events::{Event, EventBus, EventId};
use tracing::{info, warn};

use crate::encoder::ClipJob;
use crate::error::{SnapOpsError, SnapOpsResult};
use crate::model::{DeleteRequest, MoveRequest, OperationRequest, StartRequest, TimeWindow};
use crate::select::{MAINTENANCE_EXTENSIONS, SNAPSHOT_EXTENSIONS, Snapshot, select_snapshots};

/// Result of a single operation invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation ran to completion and its result event was published.
    Completed {
        /// Identifier of the published result event.
        event_id: EventId,
        /// Names of the affected snapshots.
        snapshots: Vec<String>,
    },
    /// Selection matched nothing; no mutation happened and no event was
    /// published.
    NoMatches,
    /// The operation failed and was logged per the default policy.
    Aborted,
}

/// Service executing snapshot maintenance operations against an event bus
/// capability supplied by the host.
#[derive(Clone)]
pub struct SnapshotService {
    events: EventBus,
}

impl SnapshotService {
    /// Construct a service publishing to the given bus.
    #[must_use]
    pub const fn new(events: EventBus) -> Self {
        Self { events }
    }

    /// Execute the request, surfacing failures as structured errors.
    ///
    /// Use [`Self::apply`] for the platform's default log-and-stop policy.
    ///
    /// # Errors
    ///
    /// Returns validation errors before any filesystem effect and
    /// operational errors from the point of failure; work already done
    /// before a mid-batch failure is not rolled back.
    pub fn execute(&self, request: &OperationRequest) -> SnapOpsResult<Outcome> {
        match request {
            OperationRequest::Start(start) => self.run_start(start),
            OperationRequest::Delete(delete) => self.run_delete(delete),
            OperationRequest::Move(relocate) => self.run_move(relocate),
        }
    }

    /// Execute the request under the default policy: failures are logged
    /// as warnings and reported as [`Outcome::Aborted`]; no event is
    /// published for a failed invocation and nothing is retried.
    pub fn apply(&self, request: &OperationRequest) -> Outcome {
        match self.execute(request) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    operation = request.kind(),
                    error = ?error,
                    "snapshot operation aborted"
                );
                Outcome::Aborted
            }
        }
    }

    fn run_start(&self, request: &StartRequest) -> SnapOpsResult<Outcome> {
        request.validate()?;
        let window = request.window()?;
        let mut frames = select_snapshots(
            &request.source_dir,
            SNAPSHOT_EXTENSIONS,
            &request.exclude,
            &window,
        )?;
        if frames.is_empty() {
            return Ok(skip_empty(&request.source_dir, &window));
        }

        let job = ClipJob::new(
            &request.source_dir,
            &request.destination_dir,
            &request.filename,
            request.format,
        );
        job.run(&mut frames)?;

        info!(
            artifact = %job.destination().display(),
            frames = frames.len(),
            "rendered snapshot clip"
        );

        let snapshots = names(&frames);
        let event_id = self.events.publish(Event::ClipRendered {
            output_file: format!("{}.{}", request.filename, request.format.extension()),
            source_dir: request.source_dir.display().to_string(),
            destination_dir: request.destination_dir.display().to_string(),
            snapshot_count: snapshots.len(),
            snapshots: snapshots.clone(),
            begin: window.begin_raw().to_string(),
            end: window.end_raw().to_string(),
        });
        Ok(Outcome::Completed { event_id, snapshots })
    }

    fn run_delete(&self, request: &DeleteRequest) -> SnapOpsResult<Outcome> {
        request.validate()?;
        let window = request.window()?;
        let selected = select_snapshots(
            &request.source_dir,
            MAINTENANCE_EXTENSIONS,
            &request.exclude,
            &window,
        )?;
        if selected.is_empty() {
            return Ok(skip_empty(&request.source_dir, &window));
        }

        for snapshot in &selected {
            let path = request.source_dir.join(&snapshot.name);
            fs::remove_file(&path)
                .map_err(|source| SnapOpsError::io("delete.remove_file", &path, source))?;
        }

        info!(
            source = %request.source_dir.display(),
            removed = selected.len(),
            "removed selected snapshots"
        );

        let snapshots = names(&selected);
        let event_id = self.events.publish(Event::SnapshotsDeleted {
            source_dir: request.source_dir.display().to_string(),
            snapshot_count: snapshots.len(),
            snapshots: snapshots.clone(),
            begin: window.begin_raw().to_string(),
            end: window.end_raw().to_string(),
        });
        Ok(Outcome::Completed { event_id, snapshots })
    }

    fn run_move(&self, request: &MoveRequest) -> SnapOpsResult<Outcome> {
        request.validate()?;
        let window = request.window()?;
        let selected = select_snapshots(
            &request.source_dir,
            MAINTENANCE_EXTENSIONS,
            &request.exclude,
            &window,
        )?;
        if selected.is_empty() {
            return Ok(skip_empty(&request.source_dir, &window));
        }

        fs::create_dir_all(&request.destination_dir).map_err(|source| {
            SnapOpsError::io("move.create_destination", &request.destination_dir, source)
        })?;
        for snapshot in &selected {
            let from = request.source_dir.join(&snapshot.name);
            let to = request.destination_dir.join(&snapshot.name);
            move_file(&from, &to)?;
        }

        info!(
            source = %request.source_dir.display(),
            destination = %request.destination_dir.display(),
            moved = selected.len(),
            "moved selected snapshots"
        );

        let snapshots = names(&selected);
        let event_id = self.events.publish(Event::SnapshotsMoved {
            source_dir: request.source_dir.display().to_string(),
            destination_dir: request.destination_dir.display().to_string(),
            snapshot_count: snapshots.len(),
            snapshots: snapshots.clone(),
            begin: window.begin_raw().to_string(),
            end: window.end_raw().to_string(),
        });
        Ok(Outcome::Completed { event_id, snapshots })
    }
}

fn skip_empty(source_dir: &Path, window: &TimeWindow) -> Outcome {
    warn!(
        source = %source_dir.display(),
        begin = window.begin_raw(),
        end = window.end_raw(),
        "no snapshots matched the requested window"
    );
    Outcome::NoMatches
}

/// Rename with a copy-then-remove fallback for cross-device moves.
fn move_file(from: &Path, to: &Path) -> SnapOpsResult<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_rename_err) => {
            fs::copy(from, to)
                .map_err(|source| SnapOpsError::io("move.copy_fallback", to, source))?;
            fs::remove_file(from).map_err(|source| SnapOpsError::io("move.cleanup", from, source))
        }
    }
}

fn names(snapshots: &[Snapshot]) -> Vec<String> {
    snapshots
        .iter()
        .map(|snapshot| snapshot.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EPOCH_SENTINEL, OutputFormat};
    use anyhow::Result;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> Result<()> {
        File::create(dir.join(name))?;
        Ok(())
    }

    fn delete_request(source: &Path) -> DeleteRequest {
        DeleteRequest {
            source_dir: source.to_path_buf(),
            exclude: Vec::new(),
            begin: EPOCH_SENTINEL.to_string(),
            end: EPOCH_SENTINEL.to_string(),
        }
    }

    #[tokio::test]
    async fn delete_honours_exclusions_and_notifies() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let mut stream = bus.subscribe(None);
        let temp = TempDir::new()?;
        touch(temp.path(), "a.jpg")?;
        touch(temp.path(), "b.png")?;
        touch(temp.path(), "c.txt")?;

        let mut request = delete_request(temp.path());
        request.exclude = vec!["b.png".to_string()];

        let outcome = service.apply(&OperationRequest::Delete(request));
        let Outcome::Completed { snapshots, .. } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(snapshots, vec!["a.jpg".to_string()]);
        assert!(!temp.path().join("a.jpg").exists());
        assert!(temp.path().join("b.png").exists());
        assert!(temp.path().join("c.txt").exists());

        let envelope = stream.next().await.expect("result event");
        let Event::SnapshotsDeleted {
            source_dir,
            snapshot_count,
            snapshots,
            begin,
            end,
        } = envelope.event
        else {
            panic!("unexpected event kind");
        };
        assert_eq!(source_dir, temp.path().display().to_string());
        assert_eq!(snapshot_count, 1);
        assert_eq!(snapshots, vec!["a.jpg".to_string()]);
        assert_eq!(begin, EPOCH_SENTINEL);
        assert_eq!(end, EPOCH_SENTINEL);
        Ok(())
    }

    #[tokio::test]
    async fn empty_selection_touches_nothing_and_stays_silent() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let temp = TempDir::new()?;
        touch(temp.path(), "notes.txt")?;

        let outcome = service.apply(&OperationRequest::Delete(delete_request(temp.path())));

        assert_eq!(outcome, Outcome::NoMatches);
        assert!(temp.path().join("notes.txt").exists());
        assert_eq!(bus.last_event_id(), None);
        Ok(())
    }

    #[tokio::test]
    async fn delete_respects_the_begin_bound() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let temp = TempDir::new()?;

        let mut request = delete_request(temp.path());
        request.begin = "01/01/2024 00:00:00".to_string();
        let begin = TimeWindow::parse(&request.begin, &request.end)?
            .begin()
            .expect("begin bound");

        touch(temp.path(), "old.jpg")?;
        File::options()
            .write(true)
            .open(temp.path().join("old.jpg"))?
            .set_modified(begin - Duration::from_secs(3600))?;
        touch(temp.path(), "new.jpg")?;
        File::options()
            .write(true)
            .open(temp.path().join("new.jpg"))?
            .set_modified(begin + Duration::from_secs(3600))?;

        let outcome = service.apply(&OperationRequest::Delete(request));
        let Outcome::Completed { snapshots, .. } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(snapshots, vec!["new.jpg".to_string()]);
        assert!(temp.path().join("old.jpg").exists());
        assert!(!temp.path().join("new.jpg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn move_creates_nested_destination() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let mut stream = bus.subscribe(None);
        let temp = TempDir::new()?;
        let source = temp.path().join("camera");
        fs::create_dir(&source)?;
        touch(&source, "a.jpg")?;
        let destination = temp.path().join("archive").join("2024").join("june");

        let request = MoveRequest {
            source_dir: source.clone(),
            destination_dir: destination.clone(),
            exclude: Vec::new(),
            begin: EPOCH_SENTINEL.to_string(),
            end: EPOCH_SENTINEL.to_string(),
        };
        let outcome = service.apply(&OperationRequest::Move(request));

        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert!(!source.join("a.jpg").exists());
        assert!(destination.join("a.jpg").exists());

        let envelope = stream.next().await.expect("result event");
        assert_eq!(envelope.event.kind(), "snapshots_moved");
        Ok(())
    }

    #[tokio::test]
    async fn move_into_existing_destination_keeps_unrelated_files() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let temp = TempDir::new()?;
        let source = temp.path().join("camera");
        let destination = temp.path().join("archive");
        fs::create_dir(&source)?;
        fs::create_dir(&destination)?;
        touch(&source, "a.jpg")?;
        touch(&destination, "unrelated.txt")?;

        let request = MoveRequest {
            source_dir: source.clone(),
            destination_dir: destination.clone(),
            exclude: Vec::new(),
            begin: EPOCH_SENTINEL.to_string(),
            end: EPOCH_SENTINEL.to_string(),
        };
        let outcome = service.apply(&OperationRequest::Move(request));

        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert!(destination.join("a.jpg").exists());
        assert!(destination.join("unrelated.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_filename_aborts_without_an_event() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let temp = TempDir::new()?;
        let source = temp.path().join("camera");
        let destination = temp.path().join("clips");
        fs::create_dir(&source)?;
        fs::create_dir(&destination)?;
        touch(&source, "a.jpg")?;

        let request = StartRequest {
            source_dir: source.clone(),
            destination_dir: destination,
            filename: "bad/name".to_string(),
            format: OutputFormat::Gif,
            exclude: Vec::new(),
            begin: EPOCH_SENTINEL.to_string(),
            end: EPOCH_SENTINEL.to_string(),
        };
        let outcome = service.apply(&OperationRequest::Start(request));

        assert_eq!(outcome, Outcome::Aborted);
        assert!(source.join("a.jpg").exists());
        assert_eq!(bus.last_event_id(), None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_surfaces_a_typed_error() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus);
        let temp = TempDir::new()?;

        let request = delete_request(&temp.path().join("missing"));
        let result = service.execute(&OperationRequest::Delete(request));

        assert!(matches!(
            result,
            Err(SnapOpsError::InvalidRequest {
                field: "sourcepath",
                reason: "not_a_directory",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_timestamp_aborts_before_any_mutation() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let temp = TempDir::new()?;
        touch(temp.path(), "a.jpg")?;

        let mut request = delete_request(temp.path());
        request.begin = "2024-01-01 00:00:00".to_string();
        let outcome = service.apply(&OperationRequest::Delete(request));

        assert_eq!(outcome, Outcome::Aborted);
        assert!(temp.path().join("a.jpg").exists());
        assert_eq!(bus.last_event_id(), None);
        Ok(())
    }

    #[tokio::test]
    async fn result_events_carry_sequential_ids() -> Result<()> {
        let bus = EventBus::with_capacity(16);
        let service = SnapshotService::new(bus.clone());
        let temp = TempDir::new()?;
        touch(temp.path(), "a.jpg")?;
        touch(temp.path(), "b.jpg")?;

        let mut first = delete_request(temp.path());
        first.exclude = vec!["b.jpg".to_string()];
        let Outcome::Completed { event_id: first_id, .. } =
            service.apply(&OperationRequest::Delete(first))
        else {
            panic!("expected first completion");
        };
        let Outcome::Completed { event_id: second_id, .. } =
            service.apply(&OperationRequest::Delete(delete_request(temp.path())))
        else {
            panic!("expected second completion");
        };

        assert_eq!(second_id, first_id + 1);
        assert_eq!(bus.last_event_id(), Some(second_id));
        Ok(())
    }
}
