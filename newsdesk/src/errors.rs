//! Error types for the newsdesk pipeline.
//!
//! Collaborator failures carry an [`ErrorKind`] and a `retryable` flag so the
//! retry policy can decide without inspecting messages. Only
//! [`PipelineError`] ever escapes a pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::Stage;

/// Classification of a failure, recorded on every failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A call exceeded the per-call timeout.
    Timeout,
    /// Connection or I/O failure talking to a remote endpoint.
    Transport,
    /// The remote endpoint asked us to slow down.
    RateLimited,
    /// The remote endpoint failed on its side (5xx).
    ServerError,
    /// The request was rejected as invalid.
    MalformedInput,
    /// Credentials were missing or rejected.
    Authentication,
    /// The remote endpoint answered with something unusable.
    InvalidResponse,
    /// The processed-item store could not be read or written.
    Persistence,
    /// The run was cancelled while the call was pending.
    Cancelled,
}

impl ErrorKind {
    /// Kinds the default retry policy treats as transient.
    pub const DEFAULT_RETRYABLE: [Self; 5] = [
        Self::Timeout,
        Self::Transport,
        Self::RateLimited,
        Self::ServerError,
        Self::InvalidResponse,
    ];

    /// Kind for an HTTP status that is not a success.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::MalformedInput,
        }
    }

    /// Whether an error of this kind is worth retrying by default.
    #[must_use]
    pub fn is_transient(self) -> bool {
        Self::DEFAULT_RETRYABLE.contains(&self)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::MalformedInput => "malformed_input",
            Self::Authentication => "authentication",
            Self::InvalidResponse => "invalid_response",
            Self::Persistence => "persistence",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Failure reported by a summarizer, drafter or publisher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Text generation failed.
    #[error("generation failed ({kind}): {message}")]
    Generation {
        /// Failure classification.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
        /// Whether the collaborator considers a retry sensible.
        retryable: bool,
    },

    /// Publishing failed.
    #[error("publish failed ({kind}): {message}")]
    Publish {
        /// Failure classification.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
        /// Whether the collaborator considers a retry sensible.
        retryable: bool,
    },

    /// The call did not finish within the per-call timeout.
    #[error("call timed out after {elapsed_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        elapsed_ms: u64,
    },

    /// The run was cancelled while the call was waiting to retry.
    #[error("cancelled: {reason}")]
    Cancelled {
        /// Cancellation reason.
        reason: String,
    },
}

impl CollaboratorError {
    /// Generation failure with the default retryability for `kind`.
    pub fn generation(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Generation {
            kind,
            message: message.into(),
            retryable: kind.is_transient(),
        }
    }

    /// Publish failure with the default retryability for `kind`.
    pub fn publish(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Publish {
            kind,
            message: message.into(),
            retryable: kind.is_transient(),
        }
    }

    /// Overrides the retryable flag.
    #[must_use]
    pub fn with_retryable(mut self, value: bool) -> Self {
        match &mut self {
            Self::Generation { retryable, .. } | Self::Publish { retryable, .. } => {
                *retryable = value;
            }
            Self::Timeout { .. } | Self::Cancelled { .. } => {}
        }
        self
    }

    /// The failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Generation { kind, .. } | Self::Publish { kind, .. } => *kind,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether the collaborator flagged this failure as retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation { retryable, .. } | Self::Publish { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            Self::Cancelled { .. } => false,
        }
    }
}

/// Failure of the processed-item store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The persisted document could not be (de)serialized.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persisted document has a layout this build does not understand.
    #[error("unsupported store version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found on disk.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A stage transition that would break monotonicity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid stage transition for item '{item_id}': {from} -> {to}")]
pub struct TransitionError {
    /// The item whose record rejected the transition.
    pub item_id: String,
    /// Current stage.
    pub from: Stage,
    /// Requested stage.
    pub to: Stage,
}

/// A collaborator could not be set up, or the feed source could not start
/// producing items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name} failed to initialize: {message}")]
pub struct InitializationError {
    /// Name of the failing component.
    pub source_name: String,
    /// What went wrong.
    pub message: String,
}

impl InitializationError {
    /// Creates a new initialization error.
    pub fn new(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// An item could not be read mid-sequence; the feed is truncated there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("feed read error: {0}")]
pub struct FeedError(pub String);

/// The main error type for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fatal failure before any item was processed.
    #[error("{0}")]
    Initialization(#[from] InitializationError),
}
