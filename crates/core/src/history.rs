//! Bounded, most-recent-first record of completed generation jobs.
//!
//! The store keeps at most `capacity` entries with ring-buffer semantics:
//! appending at capacity evicts the oldest entry. Entries are immutable
//! snapshots; `restore` hands out a copy and never mutates the store.

use std::collections::VecDeque;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::job::{Artifact, GenerationJob};
use crate::sync;
use crate::types::{EntryId, Timestamp};

/// Default number of retained entries.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// Immutable snapshot of a succeeded generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: EntryId,
    pub prompt: String,
    pub model_id: String,
    pub artifact: Artifact,
    pub created_at: Timestamp,
}

impl HistoryEntry {
    /// Snapshot a finished job. The artifact is copied, so the entry shares
    /// no state with the (soon to be discarded) job.
    pub fn from_job(job: &GenerationJob) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            prompt: job.prompt.clone(),
            model_id: job.model_id.clone(),
            artifact: job.artifact().clone(),
            created_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Append-only, capped-size store of [`HistoryEntry`] values.
///
/// Thread-safe via an interior `RwLock`; designed to be shared as
/// `Arc<HistoryStore>` between the orchestrator (writer) and the API
/// (reader).
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    entries: RwLock<VecDeque<HistoryEntry>>,
}

impl HistoryStore {
    /// Create a store retaining at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert at the head, evicting the oldest entry beyond capacity.
    pub fn append(&self, entry: HistoryEntry) {
        let mut entries = sync::write(&self.entries);
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// All entries, most-recent first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        sync::read(&self.entries).iter().cloned().collect()
    }

    /// Remove a specific entry. Returns `false` (no-op) when absent.
    pub fn remove(&self, id: EntryId) -> bool {
        let mut entries = sync::write(&self.entries);
        match entries.iter().position(|e| e.id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Read-only lookup used to repopulate a new editing session.
    pub fn restore(&self, id: EntryId) -> Option<HistoryEntry> {
        sync::read(&self.entries).iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        sync::read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
