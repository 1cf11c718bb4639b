//! Shared type aliases used across the workspace.

/// Generation jobs are identified by a random UUIDv4.
pub type JobId = uuid::Uuid;

/// History entries are identified by a random UUIDv4.
pub type EntryId = uuid::Uuid;

/// Accounts are keyed by an opaque string id issued by the (external)
/// signup flow.
pub type AccountId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
