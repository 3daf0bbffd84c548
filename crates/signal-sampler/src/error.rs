//! Sampler error types.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Sampler error type.
///
/// Nothing here is fatal to the driver loop. Each variant is logged where it
/// happens and the affected tick's effect is skipped.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Transport-level failure talking to the simulation server, including timeouts.
    #[error("simulation server unreachable at {endpoint}: {source}")]
    ServerUnreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("simulation server returned {status} for {endpoint}")]
    ServerError { endpoint: String, status: StatusCode },

    /// The server answered 2xx but the body was not the expected JSON.
    #[error("invalid response body from {endpoint}: {source}")]
    InvalidResponse {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Target signal id absent from a fetched state mapping.
    #[error("signal {signal_id} not present in server state")]
    MissingSignal { signal_id: String },

    /// The record store could not be opened, written, flushed, or read back.
    #[error("record store {} failed: {source}", .path.display())]
    StoreWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row in the record store could not be parsed back.
    #[error("corrupt record store {} at line {line}: {reason}", .path.display())]
    CorruptStore {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Configuration rejected before startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SamplerError {
    /// Whether the error came from talking to the simulation server.
    pub fn is_server_failure(&self) -> bool {
        matches!(
            self,
            Self::ServerUnreachable { .. } | Self::ServerError { .. } | Self::InvalidResponse { .. }
        )
    }
}

/// Result type for sampler operations.
pub type Result<T> = std::result::Result<T, SamplerError>;
