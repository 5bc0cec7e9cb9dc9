use badgegate_core::FaultKind;
use std::path::PathBuf;
use thiserror::Error;

/// Storage-specific error types for the badge kiosk.
///
/// These errors represent failures while reading or rewriting the directory
/// document, the access ledger and the managed image directory.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading a file failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or replacing a file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger could not be parsed
    #[error("Ledger format error: {0}")]
    Csv(#[from] csv::Error),

    /// Entity not found in the directory
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// A file the operation depends on does not exist
    #[error("Missing resource: {0}")]
    MissingResource(PathBuf),

    /// Data validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] badgegate_core::Error),
}

impl StorageError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn badge_not_found(id: &str) -> Self {
        Self::NotFound {
            entity_type: "badge".to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }

    /// Classify this error into one of the four fault kinds.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                FaultKind::MissingResource
            }
            Self::Read { .. } | Self::Csv(_) => FaultKind::TransientIo,
            Self::Write { .. } => FaultKind::Persistence,
            Self::NotFound { .. } | Self::MissingResource(_) => FaultKind::MissingResource,
            Self::Validation(_) => FaultKind::Validation,
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_write_is_persistence_fault() {
        let error = StorageError::write("users.json", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(error.kind(), FaultKind::Persistence);
    }

    #[test]
    fn test_read_kinds() {
        let missing = StorageError::read("users.json", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.kind(), FaultKind::MissingResource);

        let locked = StorageError::read("users.json", io::Error::from(io::ErrorKind::WouldBlock));
        assert_eq!(locked.kind(), FaultKind::TransientIo);
    }

    #[test]
    fn test_not_found_display() {
        let error = StorageError::badge_not_found("A1B2");
        assert_eq!(error.to_string(), "Entity not found: badge with id=A1B2");
        assert_eq!(error.kind(), FaultKind::MissingResource);
    }
}
