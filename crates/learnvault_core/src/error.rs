//! Error types for learnvault_core operations.

use thiserror::Error;

/// Coarse classification of every failure the core can report.
///
/// Callers branch on this instead of matching individual variants: the
/// first two kinds are recoverable by the user, `ParseFailure` disables
/// editing for one payload, and the remaining kinds are surfaced as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Read of a path that does not exist.
    NotFound,
    /// Write precondition did not match the current version.
    Conflict,
    /// Payload could not be decoded or encoded for its category.
    ParseFailure,
    /// Network, authentication or server error on a remote call.
    TransportFailure,
    /// Catalog bootstrap did not fully succeed.
    PartialJoinFailure,
    /// The request was rejected locally before reaching a remote.
    Rejected,
}

/// Core error type for learnvault_core operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The repository has no file at the given path (or revision).
    #[error("file not found: {path}")]
    NotFound {
        /// Repository-relative path
        path: String,
    },

    /// The write precondition no longer matches the path's current version.
    #[error("write conflict on {path}: the file was changed since it was read")]
    Conflict {
        /// Repository-relative path
        path: String,
        /// Version token the write was conditioned on, if any
        expected: Option<String>,
    },

    /// Content could not be decoded or encoded.
    #[error("could not parse {what}: {reason}")]
    ParseFailure {
        /// What was being parsed (e.g. "spreadsheet", "text payload")
        what: String,
        /// Description of the failure
        reason: String,
    },

    /// The content category has no decoded preview.
    #[error("preview is not supported for {category} files")]
    PreviewUnsupported {
        /// Display name of the category
        category: String,
    },

    /// A remote call failed (network, authentication, server).
    #[error("{operation} failed: {message}")]
    Transport {
        /// Name of the remote operation
        operation: String,
        /// HTTP status code, when a response was received
        status: Option<u16>,
        /// Description of the failure
        message: String,
    },

    /// The concurrent catalog bootstrap did not fully succeed.
    #[error("catalog bootstrap failed for: {}", failed.join(", "))]
    PartialJoin {
        /// Names of the reads that failed
        failed: Vec<String>,
    },

    /// The file write succeeded but the record submission did not.
    #[error("file {path} was written (revision {revision}) but saving the record failed: {message}")]
    PartialFailure {
        /// Path that was written
        path: String,
        /// Revision produced by the write
        revision: String,
        /// Catalog failure description
        message: String,
    },

    /// The target was read at a historical revision and cannot be written.
    #[error("{path} was opened at revision {revision} and is read-only")]
    ReadOnly {
        /// Repository-relative path
        path: String,
        /// Pinned revision
        revision: String,
    },

    /// The path is not a valid repository path.
    #[error("invalid repository path: {0:?}")]
    InvalidPath(String),

    /// The record fields are not acceptable for submission.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// No record with the given id exists in the loaded catalog.
    #[error("record not found: {0}")]
    RecordNotFound(i64),

    /// Invalid edit session state transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state
        from: String,
        /// Target state
        to: String,
    },

    /// A submission for the record is still in flight.
    #[error("record {0} has a submission in flight")]
    SessionBusy(i64),

    /// The operation needs a staged edit or a loaded preview first.
    #[error("nothing to edit: {0}")]
    NothingStaged(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during local file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Shorthand for a transport failure without an HTTP status.
    pub(crate) fn transport(operation: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// Shorthand for a parse failure.
    pub(crate) fn parse(what: &str, reason: impl ToString) -> Self {
        Self::ParseFailure {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Projects the error onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::ParseFailure { .. } | Self::PreviewUnsupported { .. } => {
                ErrorKind::ParseFailure
            }
            Self::Transport { .. } | Self::PartialFailure { .. } => ErrorKind::TransportFailure,
            Self::PartialJoin { .. } => ErrorKind::PartialJoinFailure,
            Self::ReadOnly { .. }
            | Self::InvalidPath(_)
            | Self::InvalidRecord(_)
            | Self::RecordNotFound(_)
            | Self::InvalidStateTransition { .. }
            | Self::SessionBusy(_)
            | Self::NothingStaged(_)
            | Self::ConfigError(_)
            | Self::Io(_) => ErrorKind::Rejected,
        }
    }

    /// Returns true for failures the user can resolve by re-reading and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Conflict)
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { .. } => Some(
                "Someone else changed this file. Re-open it to load the latest version, then apply your edit again.",
            ),
            Self::NotFound { .. } => Some("Check the path with 'learnvault files list'."),
            Self::Transport {
                status: Some(401) | Some(403),
                ..
            } => Some("The repository credential was rejected. Run 'learnvault login' again."),
            Self::Transport { .. } => {
                Some("The remote service could not be reached. Nothing was retried automatically.")
            }
            Self::PartialJoin { .. } => {
                Some("The catalog is shown empty. Check the catalog service and reload.")
            }
            Self::PartialFailure { .. } => Some(
                "The file change is already in the repository. Save the record again to link it.",
            ),
            Self::ReadOnly { .. } => {
                Some("Open the current version of the file to edit it.")
            }
            Self::SessionBusy(_) => Some("Wait for the pending save to finish."),
            Self::ConfigError(_) => Some("Check the [repository] section of your config file."),
            _ => None,
        }
    }
}

/// Convenience Result type for learnvault_core operations.
pub type Result<T> = std::result::Result<T, VaultError>;
