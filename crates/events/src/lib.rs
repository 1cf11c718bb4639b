//! VizCode event bus.
//!
//! Building blocks for observing generation progress:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`] / [`JobEventKind`] — the typed job lifecycle events the
//!   orchestrator emits, one per state transition.

pub mod bus;

pub use bus::{EventBus, JobEvent, JobEventKind};
