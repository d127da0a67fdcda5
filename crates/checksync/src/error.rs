//! Error taxonomy for reconciliation passes.

use thiserror::Error;

/// Errors surfaced by the checklist/label reconciliation core.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The document contains one envelope marker but not the other. The
    /// engine cannot guess region boundaries, so this is always propagated
    /// rather than treated as an empty checklist.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// The HTTP request itself failed (network, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub accepted the request but answered with an error status.
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// One or more of a batch of independent operations failed. Every
    /// operation in the batch is still attempted before this is raised.
    #[error("{} of {attempted} reconciliation operations failed", .failures.len())]
    Aggregated {
        /// Number of operations the pass attempted.
        attempted: usize,
        /// The individual failures, in attempt order.
        failures: Vec<SyncError>,
    },
}

impl SyncError {
    /// Collapse a set of independently-attempted operation results into a
    /// single aggregated error, or `Ok` when none failed.
    pub fn aggregate(attempted: usize, failures: Vec<SyncError>) -> Result<(), SyncError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Aggregated {
                attempted,
                failures,
            })
        }
    }
}
