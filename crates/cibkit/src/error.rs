//! Error types for CIB operations.
//!
//! Errors are categorized so the retry engine can tell a transient cluster
//! hiccup (a failed or slow command) from a problem with the desired state
//! itself. Each variant carries the id, field or command line involved so
//! the message alone is enough to find the offending declaration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Categories of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Command failures and timeouts, retried up to the attempt budget
    Transient,
    /// Invalid desired state or an unusable cluster, never retried
    Fatal,
}

impl ErrorCategory {
    /// Whether this error category is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transient => "Cluster command failed or timed out",
            Self::Fatal => "Invalid configuration or cluster state",
        }
    }
}

/// Errors that can occur while reading or patching the CIB.
#[derive(Debug, Error)]
pub enum Error {
    /// The CIB dump command failed or returned nothing
    #[error("could not dump CIB XML: {reason}")]
    CibUnavailable {
        /// Why the dump could not be obtained
        reason: String,
    },

    /// The CIB dump is not well-formed XML
    #[error("could not parse CIB XML: {message}")]
    CibParse {
        /// Parser message
        message: String,
    },

    /// The configured CIB file could not be read
    #[error("could not read CIB file {path}: {source}")]
    CibFile {
        /// Path from the `cib_file` option
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// The codec could not build an element from the supplied fields
    #[error("could not create XML patch for {kind} '{id}'")]
    PatchBuild {
        /// Element tag that was being built
        kind: String,
        /// Constraint id, empty when the fields carried none
        id: String,
    },

    /// A constraint references a primitive that is not configured
    #[error("primitive '{id}' does not exist")]
    MissingPrimitive {
        /// Id of the missing primitive
        id: String,
    },

    /// Required constraint fields are absent at flush time
    #[error("constraint '{id}' does not contain all the required fields (missing: {})", .missing.join(", "))]
    IncompleteConstraint {
        /// Constraint id
        id: String,
        /// Names of the absent fields
        missing: Vec<&'static str>,
    },

    /// Another element of the constraints section already uses this id
    #[error("id '{id}' is already used by a {existing} element")]
    IdConflict {
        /// The contested id
        id: String,
        /// Tag of the element holding the id
        existing: String,
    },

    /// A score that is neither an integer nor an infinity token
    #[error("score '{0}' is invalid, should be +/- INFINITY (or inf) or an integer")]
    InvalidScore(String),

    /// A declared object that cannot be reconciled as written
    #[error("invalid declaration '{name}': {message}")]
    InvalidDeclaration {
        /// Name of the declared object
        name: String,
        /// What is wrong with it
        message: String,
    },

    /// A cluster command exited non-zero or could not be started
    #[error("command failed: {command}: {stderr}")]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Standard error output (or the spawn error)
        stderr: String,
        /// Exit status, if the process ran to completion
        status: Option<i32>,
    },

    /// A single attempt exceeded its deadline
    #[error("command timed out after {}s: {command}", .timeout.as_secs())]
    Timeout {
        /// Command line that was killed
        command: String,
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// The retry budget ran out while failure-on-timeout was requested
    #[error("execution timeout after {seconds} seconds ({attempts} attempts){}", .last_error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Attempts multiplied by the inter-attempt delay
        seconds: u64,
        /// Message of the last failed attempt
        last_error: Option<String>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CommandFailed { .. } | Error::Timeout { .. } => ErrorCategory::Transient,
            _ => ErrorCategory::Fatal,
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

/// Result type for CIB operations.
pub type Result<T> = std::result::Result<T, Error>;
