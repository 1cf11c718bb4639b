//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`JobEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application: the
//! orchestrator publishes, the HTTP event stream (and anything else that
//! cares about job progress) subscribes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vizcode_core::types::{JobId, Timestamp};
use vizcode_core::Artifact;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// What happened, for one transition of one job.
///
/// The serialized `type` tag doubles as the taxonomy tag the frontend keys
/// its messaging on, so every failure mode stays distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    /// A manifest file moved `Pending -> Generating`.
    FileStarted { file: String },
    /// A manifest file moved `Generating -> Completed`; its content is now
    /// part of the (in-progress) artifact.
    FileCompleted { file: String },
    /// A manifest file moved `Generating -> Error`. The job halts after this.
    FileFailed { file: String, error: String },
    /// Every file completed; carries the full assembled artifact.
    JobSucceeded { artifact: Artifact },
    /// The job halted on a file failure or timeout.
    JobFailed { error: String },
    /// The job was cancelled by the user.
    JobCancelled,
}

impl JobEventKind {
    /// Stable event name, used as the SSE event type and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            JobEventKind::FileStarted { .. } => "file_started",
            JobEventKind::FileCompleted { .. } => "file_completed",
            JobEventKind::FileFailed { .. } => "file_failed",
            JobEventKind::JobSucceeded { .. } => "job_succeeded",
            JobEventKind::JobFailed { .. } => "job_failed",
            JobEventKind::JobCancelled => "job_cancelled",
        }
    }

    /// Whether this event ends the job's event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEventKind::JobSucceeded { .. }
                | JobEventKind::JobFailed { .. }
                | JobEventKind::JobCancelled
        )
    }
}

/// One job lifecycle event.
///
/// `seq` increases by one per event within a job, starting at 1, so
/// subscribers can merge a journal replay with the live feed without
/// duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: JobId,
    pub seq: u64,
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub kind: JobEventKind,
}

impl JobEvent {
    pub fn new(job_id: JobId, seq: u64, kind: JobEventKind) -> Self {
        Self {
            job_id,
            seq,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobEvent`].
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the per-job journal kept by the orchestrator remains the source of
    /// record for replay.
    pub fn publish(&self, event: JobEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
