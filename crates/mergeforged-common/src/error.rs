//! Common error types used throughout mergeforged.
//!
//! This module provides the error type shared by the job registry and the
//! CLI front-end: lookups of unknown jobs, admission refusals, bad input and
//! I/O failures.

/// Common error type for mergeforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested job or resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The concurrent job limit has been reached.
    #[error("Job limit reached: {limit} merges already running")]
    JobLimitReached {
        /// The configured maximum number of concurrent jobs.
        limit: usize,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("job 42");
        assert_eq!(err.to_string(), "Not found: job 42");

        let err = Error::JobLimitReached { limit: 5 };
        assert_eq!(err.to_string(), "Job limit reached: 5 merges already running");

        let err = Error::invalid_input("need at least 2 video files");
        assert_eq!(err.to_string(), "Invalid input: need at least 2 video files");

        let err = Error::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_io_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
