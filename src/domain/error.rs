// ============================================================
// Layer 3 — Training Errors
// ============================================================
// The failure modes the loop distinguishes. Everything else
// (I/O, tensor conversion) travels as plain anyhow errors with
// context attached; these variants are the ones callers and
// tests match on via `err.downcast_ref::<TrainError>()`.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::mode::Mode;

#[derive(Debug, Error)]
pub enum TrainError {
    /// A required option is missing, has the wrong type, or fails validation.
    /// Raised before the first epoch starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A loader produced zero batches, so no epoch mean can be formed.
    #[error("{mode} loader yielded no batches")]
    EmptyLoader { mode: Mode },

    /// Explicit device placement was requested but cannot be honoured.
    #[error("device unavailable: {0}")]
    Device(String),

    /// Creating the checkpoint directory or serialising the model failed.
    #[error("failed to write checkpoint '{}': {source}", path.display())]
    CheckpointWrite {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
