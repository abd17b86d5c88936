//! Error types for vendo-core.

use thiserror::Error;

/// Errors that can occur while building or executing a scheduling run.
#[derive(Error, Debug)]
pub enum VendoError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream data broke an invariant the scheduler relies on.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Run log error: {0}")]
    RunLog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for vendo operations.
pub type VendoResult<T> = Result<T, VendoError>;
