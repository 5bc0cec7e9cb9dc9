use std::fmt;
use thiserror::Error;

/// Coarse classification shared by every error type in the workspace.
///
/// The UI layer decides how to present a failure from its kind alone:
/// transient faults are retried silently, validation faults become a form
/// message, persistence faults become an explicit error dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Serial disconnect, decode error, temporarily locked file.
    TransientIo,
    /// Directory, ledger or image file absent.
    MissingResource,
    /// Required field empty or malformed.
    Validation,
    /// Write failure while saving state.
    Persistence,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransientIo => write!(f, "transient I/O fault"),
            Self::MissingResource => write!(f, "missing resource"),
            Self::Validation => write!(f, "validation fault"),
            Self::Persistence => write!(f, "persistence fault"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("Invalid badge id: {0}")]
    InvalidBadgeId(String),

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid ledger status: {0}")]
    InvalidStatus(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid mode transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

impl Error {
    /// Classify this error into one of the four fault kinds.
    pub fn kind(&self) -> FaultKind {
        match self {
            Error::InvalidBadgeId(_)
            | Error::MissingField { .. }
            | Error::InvalidStatus(_)
            | Error::InvalidTimestamp(_)
            | Error::InvalidStateTransition { .. } => FaultKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
