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

//! Event channel for the snapshot maintenance component.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events to late subscribers. Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows,
//! the oldest events are dropped.
//!
//! Layout: `payloads.rs` (event enum and envelope), `routing.rs` (the bus
//! and subscriber stream), `topics.rs` (channel identifiers).

pub mod payloads;
pub mod routing;
pub mod topics;

pub use payloads::{Event, EventEnvelope, EventId};
pub use routing::{EventBus, EventStream};
pub use topics::CHANNEL;
