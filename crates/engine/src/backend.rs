//! The seam between the orchestrator and whatever actually produces code.
//!
//! A backend generates the content of one manifest file at a time. The
//! orchestrator owns sequencing, timeouts, and cancellation; a backend just
//! produces content or fails.

use async_trait::async_trait;
use vizcode_core::{FileSpec, ModelDescriptor};

/// A generation step failed inside the backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Produces generated content for manifest files.
///
/// Implementations must be cancellation-safe: the orchestrator may drop the
/// returned future at any await point (user cancel or timeout).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce the content of one manifest file.
    async fn generate_file(
        &self,
        prompt: &str,
        model: &ModelDescriptor,
        file: &FileSpec,
    ) -> Result<String, BackendError>;
}
