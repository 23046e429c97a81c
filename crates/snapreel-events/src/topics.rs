//! Channel identifiers for the component's event surface.

/// Name of the dispatcher channel result events are published on.
pub const CHANNEL: &str = "snapreel";

/// Machine-friendly discriminator for subscribers.
#[must_use]
pub const fn event_kind(event: &crate::payloads::Event) -> &'static str {
    event.kind()
}
