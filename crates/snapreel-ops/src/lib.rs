#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Snapshot maintenance operations for the snapreel platform component.
//!
//! Three services share one selection step: render a directory of camera
//! snapshots into a clip (`start`), delete a filtered set of snapshots
//! (`delete`), or move them to another directory (`move`). Each successful
//! invocation publishes exactly one result event on the component channel.
//!
//! Layout: `model` (requests and validation), `select` (the shared
//! candidate selection), `encoder` (clip rendering), `service` (operation
//! handlers and notification).

pub mod encoder;
pub mod error;
pub mod model;
pub mod select;
pub mod service;

pub use encoder::ClipJob;
pub use error::{SnapOpsError, SnapOpsResult};
pub use model::{
    DeleteRequest, EPOCH_SENTINEL, MoveRequest, OperationRequest, OutputFormat, StartRequest,
    TimeWindow,
};
pub use select::Snapshot;
pub use service::{Outcome, SnapshotService};
