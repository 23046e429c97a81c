//! Event payload types published after snapshot operations.

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted on the channel.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Typed result events surfaced after a completed snapshot operation.
///
/// The begin/end fields echo the bounds exactly as they appeared in the
/// request (sentinel included); they are never recomputed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A clip artifact was rendered from the selected snapshots.
    ClipRendered {
        /// File name of the rendered artifact, extension included.
        output_file: String,
        /// Directory the snapshots were read from.
        source_dir: String,
        /// Directory the artifact was written to.
        destination_dir: String,
        /// Number of snapshots encoded into the clip.
        snapshot_count: usize,
        /// Names of the encoded snapshots, in frame order.
        snapshots: Vec<String>,
        /// Begin bound as requested.
        begin: String,
        /// End bound as requested.
        end: String,
    },
    /// Selected snapshots were removed from the source directory.
    SnapshotsDeleted {
        /// Directory the snapshots were removed from.
        source_dir: String,
        /// Number of removed snapshots.
        snapshot_count: usize,
        /// Names of the removed snapshots.
        snapshots: Vec<String>,
        /// Begin bound as requested.
        begin: String,
        /// End bound as requested.
        end: String,
    },
    /// Selected snapshots were moved to another directory.
    SnapshotsMoved {
        /// Directory the snapshots were moved out of.
        source_dir: String,
        /// Directory the snapshots were moved into.
        destination_dir: String,
        /// Number of moved snapshots.
        snapshot_count: usize,
        /// Names of the moved snapshots.
        snapshots: Vec<String>,
        /// Begin bound as requested.
        begin: String,
        /// End bound as requested.
        end: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for subscribers filtering by kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClipRendered { .. } => "clip_rendered",
            Self::SnapshotsDeleted { .. } => "snapshots_deleted",
            Self::SnapshotsMoved { .. } => "snapshots_moved",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned at publish time.
    pub id: EventId,
    /// Instant the event was published.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub event: Event,
}
