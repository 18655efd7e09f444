//! Error types for ECM Core
//!
//! Two classes of failure leave the engine:
//! - Hard stops, returned as [`EngineError`] (nothing attributable per case yet)
//! - Recovered per-case errors, which never appear here; they are accumulated
//!   as human-readable strings on the result

use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Candidate retrieval failed before any case could be attributed
    #[error("case creation failed: {0}")]
    CaseCreation(#[source] StoreError),

    /// Bulk-cases retrieval failed while preparing a bulk edit
    #[error("bulk cases retrieval failed: {0}")]
    BulkRetrieval(#[source] StoreError),

    /// Acting user could not be resolved
    #[error("identity resolution failed: {0}")]
    Identity(#[from] IdentityError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Referenced multiple is not in the store
    #[error("multiple not found: {0}")]
    MultipleNotFound(String),
}

impl EngineError {
    /// Check if the caller may retry the whole operation
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CaseCreation(e) | Self::BulkRetrieval(e) => e.is_transient(),
            Self::Identity(IdentityError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

/// Case store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Network or upstream failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Case not found
    #[error("case not found: {0}")]
    NotFound(String),

    /// Event token unknown or already used
    #[error("invalid event token for case {0}")]
    InvalidEventToken(String),

    /// Platform refused the submitted data
    #[error("case {case_id} rejected the event: {reason}")]
    Rejected { case_id: String, reason: String },
}

impl StoreError {
    /// Whether the failure is worth retrying
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Update propagator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropagationError {
    /// Queue at capacity
    #[error("propagation queue full (capacity: {0})")]
    QueueFull(usize),

    /// Consumer has gone away
    #[error("propagation queue closed")]
    Closed,

    /// Nothing to send
    #[error("no cases to propagate to")]
    NoTargets,
}

/// Identity resolver errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Token rejected
    #[error("token not recognised")]
    InvalidToken,

    /// Identity service unreachable
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File extension not supported
    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    /// Parse failure
    #[error("invalid config in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Value out of range
    #[error("invalid config value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse_error(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Snapshot file errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot file could not be read or written
    #[error("io error on snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content is not valid JSON for a store
    #[error("invalid snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create JSON error for path
    pub fn json_error(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
