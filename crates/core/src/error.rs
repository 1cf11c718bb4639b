//! Domain error taxonomy.
//!
//! Every rejection a caller can observe maps to exactly one variant here,
//! so the HTTP layer can render distinct messaging per failure kind
//! (e.g. "insufficient credits — upgrade" vs. "generation failed — retry").

use crate::job::FileStatus;

/// Core domain error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The prompt was empty (or whitespace only) after trimming.
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    /// The file manifest contained no entries.
    #[error("File manifest must not be empty")]
    EmptyManifest,

    /// The requested model id does not exist in the registry.
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// The account cannot afford the selected model.
    #[error("Insufficient credits: model costs {required}, {available} available")]
    InsufficientCredits { required: u32, available: u32 },

    /// An entity lookup failed.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A file-status transition violated the state machine.
    ///
    /// Only the orchestrator drives transitions; seeing this error means a
    /// sequencing bug, not bad user input.
    #[error("Invalid status transition for '{file}': {from} -> {to}")]
    InvalidTransition {
        file: String,
        from: FileStatus,
        to: FileStatus,
    },

    /// A general validation failure with a human-readable message.
    #[error("{0}")]
    Validation(String),
}

impl CoreError {
    /// For [`CoreError::InsufficientCredits`], the number of credits the
    /// account is short by. `None` for every other variant.
    pub fn shortfall(&self) -> Option<u32> {
        match self {
            CoreError::InsufficientCredits {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }
}
