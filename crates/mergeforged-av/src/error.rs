//! Error types for mergeforged-av.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while merging media files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The stream inspector failed or produced unparsable output.
    #[error("failed to probe {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// The probed file has no video stream.
    #[error("no video stream in {}", path.display())]
    NoVideoStream { path: PathBuf },

    /// An external tool exited unsuccessfully or could not be run.
    #[error("{tool} failed during {stage}: {message}")]
    ToolFailed {
        tool: String,
        stage: String,
        status: Option<ExitStatus>,
        message: String,
    },

    /// A produced file is missing or lacks required streams.
    #[error("verification failed for {}: {message}", path.display())]
    Verification { path: PathBuf, message: String },

    /// A working-file operation failed.
    #[error("failed to {op} {}: {source}", path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The job was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a probe error.
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(
        tool: impl Into<String>,
        stage: impl Into<String>,
        status: Option<ExitStatus>,
        message: impl Into<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            stage: stage.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a verification error.
    pub fn verification(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Verification {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error from a working-file operation.
    pub fn filesystem(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from job cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
