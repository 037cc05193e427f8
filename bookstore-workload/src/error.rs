//! Error types of the workload driver.

use bookstore_service::ServiceError;
use thiserror::Error;

/// Errors that can occur while generating load against a bookstore.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller passed an out-of-range count or an inconsistent configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The bookstore rejected a request.
    ///
    /// Workers recover from these and count the interaction as failed.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// A worker panicked or hit a broken invariant, which invalidates the whole run.
    #[error("worker {worker} failed")]
    FatalTask {
        /// Index of the failed worker.
        worker: usize,
        /// Why the worker failed.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Per-interaction metrics of two workers could not be combined.
    #[error("failed to merge metrics: {0}")]
    Metrics(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type for workload operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
