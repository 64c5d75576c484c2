//! Error types for the learned path and the optimization loop.
//!
//! Plumbing (file reads, HTTP) uses `anyhow`; these enums exist where callers
//! need to branch on the kind of failure.

use std::time::Duration;

use thiserror::Error;

/// Why a learned-program invocation produced no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion transport failed: {0}")]
    Transport(String),

    #[error("Malformed completion: {0}")]
    MalformedCompletion(String),
}

impl InvocationError {
    /// True when the backend itself failed rather than returning bad output
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transport(_))
    }
}

/// Reasons an optimization run aborts before producing a result
#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Dataset {source_name} has no usable examples ({skipped} malformed lines skipped)")]
    EmptyDataset { source_name: String, skipped: usize },

    #[error("Base program configuration is invalid: {0}")]
    InvalidBaseConfig(String),

    #[error("Completion backend unreachable: every example failed on the base configuration ({0})")]
    BackendUnreachable(String),

    #[error("Completion backend could not be configured: {0}")]
    Backend(String),
}

pub type OptimizeResult<T> = std::result::Result<T, OptimizeError>;
