//! VizCode domain core: model catalog, credit accounting, the generation
//! job state machine, and the bounded generation history.
//!
//! This crate is pure domain logic with no async runtime or I/O. The
//! orchestration layer (`vizcode-engine`) drives the state machines defined
//! here; the HTTP layer (`vizcode-api`) exposes read/write surfaces over
//! them.

pub mod credits;
pub mod error;
pub mod history;
pub mod job;
pub mod model;
pub mod sync;
pub mod types;

pub use credits::{CreditAccount, CreditLedger, RefundPolicy};
pub use error::CoreError;
pub use history::{HistoryEntry, HistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use job::{
    Artifact, FileKind, FileSpec, FileStatus, GenerationJob, JobRequest, JobStatus,
};
pub use model::{ModelDescriptor, ModelRegistry, Tier};
pub use types::{AccountId, EntryId, JobId, Timestamp};
