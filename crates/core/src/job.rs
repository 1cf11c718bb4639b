//! Generation job: request validation and the per-file status state machine.
//!
//! A job owns an ordered manifest of target files. Each file moves through
//! `Pending -> Generating -> Completed` (or `Generating -> Error`); no
//! transition may skip `Generating`. The overall job status is derived from
//! the file statuses, with cancellation as an explicit terminal override.
//!
//! Transition methods return [`CoreError::InvalidTransition`] on any illegal
//! move, so sequencing cannot be corrupted by callers: the orchestrator is
//! the only driver, and even it cannot jump a file straight to `Completed`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{AccountId, JobId, Timestamp};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Declared output type of one manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// A UI component module.
    Component,
    /// A stylesheet.
    Style,
    /// A utility/helper module.
    Util,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileKind::Component => "component",
            FileKind::Style => "style",
            FileKind::Util => "util",
        };
        f.write_str(s)
    }
}

/// One entry of a job's file manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Output file name, e.g. `"component.tsx"`.
    pub name: String,
    /// Declared output type.
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileSpec {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Status of a single manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStatus::Pending => "pending",
            FileStatus::Generating => "generating",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Overall status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Generated output, keyed by manifest file name in manifest order.
pub type Artifact = IndexMap<String, String>;

/// A validated request to create a generation job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub account_id: AccountId,
    pub prompt: String,
    pub model_id: String,
    pub files: Vec<FileSpec>,
}

/// A manifest file together with its current status.
#[derive(Debug, Clone)]
pub struct FileSlot {
    pub spec: FileSpec,
    status: FileStatus,
}

impl FileSlot {
    pub fn status(&self) -> FileStatus {
        self.status
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Name of the file whose generation step failed.
    pub file: String,
    /// Human-readable failure description.
    pub message: String,
}

/// One prompt-to-artifact generation request spanning multiple files.
///
/// Owned exclusively by the orchestrator while active; once finalized the
/// resulting artifact is copied into a history entry, after which the two
/// share no state.
#[derive(Debug)]
pub struct GenerationJob {
    pub id: JobId,
    pub account_id: AccountId,
    /// Prompt text, trimmed. Non-empty by construction.
    pub prompt: String,
    pub model_id: String,
    pub created_at: Timestamp,
    files: Vec<FileSlot>,
    artifact: Artifact,
    failure: Option<JobFailure>,
    cancelled: bool,
}

impl GenerationJob {
    /// Validate a request and create a job with every file `Pending`.
    ///
    /// Rejections: [`CoreError::EmptyPrompt`] for a whitespace-only prompt,
    /// [`CoreError::EmptyManifest`] for an empty manifest, and
    /// [`CoreError::Validation`] for duplicate manifest file names (the
    /// artifact is keyed by name).
    pub fn new(request: JobRequest) -> Result<Self, CoreError> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(CoreError::EmptyPrompt);
        }
        if request.files.is_empty() {
            return Err(CoreError::EmptyManifest);
        }

        let mut seen = std::collections::HashSet::with_capacity(request.files.len());
        for spec in &request.files {
            if !seen.insert(spec.name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate manifest file name '{}'",
                    spec.name
                )));
            }
        }

        let files = request
            .files
            .into_iter()
            .map(|spec| FileSlot {
                spec,
                status: FileStatus::Pending,
            })
            .collect();

        Ok(Self {
            id: uuid::Uuid::new_v4(),
            account_id: request.account_id,
            prompt,
            model_id: request.model_id,
            created_at: chrono::Utc::now(),
            files,
            artifact: Artifact::new(),
            failure: None,
            cancelled: false,
        })
    }

    pub fn files(&self) -> &[FileSlot] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// The artifact accumulated so far. Complete only once the job has
    /// succeeded; cleared on failure or cancellation.
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    /// Overall job status.
    ///
    /// Cancellation overrides the derived status; otherwise the status is a
    /// pure function of the file statuses (see [`derived_status`]).
    pub fn status(&self) -> JobStatus {
        if self.cancelled {
            JobStatus::Cancelled
        } else {
            derived_status(&self.files)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    // -- transitions (orchestrator-driven) ----------------------------------

    /// `Pending -> Generating`. Returns the file's spec for the caller.
    pub fn begin_file(&mut self, index: usize) -> Result<FileSpec, CoreError> {
        let slot = self.slot_mut(index)?;
        if slot.status != FileStatus::Pending {
            return Err(CoreError::InvalidTransition {
                file: slot.spec.name.clone(),
                from: slot.status,
                to: FileStatus::Generating,
            });
        }
        slot.status = FileStatus::Generating;
        Ok(slot.spec.clone())
    }

    /// `Generating -> Completed`, recording the produced content.
    pub fn complete_file(&mut self, index: usize, content: String) -> Result<(), CoreError> {
        let slot = self.slot_mut(index)?;
        if slot.status != FileStatus::Generating {
            return Err(CoreError::InvalidTransition {
                file: slot.spec.name.clone(),
                from: slot.status,
                to: FileStatus::Completed,
            });
        }
        slot.status = FileStatus::Completed;
        let name = slot.spec.name.clone();
        self.artifact.insert(name, content);
        Ok(())
    }

    /// `Generating -> Error`. Marks the job failed and discards any content
    /// produced by earlier files.
    pub fn fail_file(&mut self, index: usize, message: impl Into<String>) -> Result<(), CoreError> {
        let slot = self.slot_mut(index)?;
        if slot.status != FileStatus::Generating {
            return Err(CoreError::InvalidTransition {
                file: slot.spec.name.clone(),
                from: slot.status,
                to: FileStatus::Error,
            });
        }
        slot.status = FileStatus::Error;
        let file = slot.spec.name.clone();
        self.failure = Some(JobFailure {
            file,
            message: message.into(),
        });
        self.artifact.clear();
        Ok(())
    }

    /// Mark the job cancelled and discard any accumulated content.
    ///
    /// Idempotent; performs no file transitions (files keep whatever status
    /// they had when the halt was observed).
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
        self.artifact.clear();
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut FileSlot, CoreError> {
        let len = self.files.len();
        self.files.get_mut(index).ok_or_else(|| {
            CoreError::Validation(format!(
                "File index {index} out of range for manifest of {len}"
            ))
        })
    }
}

/// Derive the overall status from file statuses alone.
///
/// - `Running` while any file is `Generating`.
/// - `Failed` as soon as any file is `Error` (fail-fast leaves later files
///   `Pending`; they never complete).
/// - `Succeeded` when every file is `Completed`.
/// - `Queued` otherwise (work not started yet).
pub fn derived_status(files: &[FileSlot]) -> JobStatus {
    if files.iter().any(|f| f.status == FileStatus::Generating) {
        JobStatus::Running
    } else if files.iter().any(|f| f.status == FileStatus::Error) {
        JobStatus::Failed
    } else if !files.is_empty() && files.iter().all(|f| f.status == FileStatus::Completed) {
        JobStatus::Succeeded
    } else {
        JobStatus::Queued
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
