//! Oracle error types

use thiserror::Error;

/// Errors from the external subscription oracle.
///
/// Every variant is handled the same way by the gate: fail open.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle did not answer within the caller's deadline
    #[error("Oracle timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// Transport-level failure reaching the oracle
    #[error("Oracle connection failed: {source}")]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The oracle answered with something we could not interpret
    #[error("Oracle protocol error: {reason}")]
    Protocol { reason: String },
}
