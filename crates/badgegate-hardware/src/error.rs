//! Error types for reader channel operations.
//!
//! Every variant except [`HardwareError::InitializationFailed`] describes a
//! fault the reader loop recovers from by skipping the current poll cycle.

use badgegate_core::FaultKind;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to a badge reader.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The reader went away mid-session.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// A read or write on the link failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Bytes that do not form a badge line: bad UTF-8, overlong line.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// The port could not be opened at startup.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background reader task ended abnormally.
    #[error("Reader task failed: {0}")]
    TaskFailed(String),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed(message.into())
    }

    /// A port that never opened is a missing resource; everything else is
    /// transient and costs at most one poll cycle.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::InitializationFailed { .. } => FaultKind::MissingResource,
            _ => FaultKind::TransientIo,
        }
    }
}

#[cfg(feature = "serial")]
impl From<serialport::Error> for HardwareError {
    fn from(error: serialport::Error) -> Self {
        match error.kind() {
            serialport::ErrorKind::NoDevice => Self::disconnected(error.description),
            _ => Self::communication(error.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("/dev/ttyUSB0");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: /dev/ttyUSB0");
        assert_eq!(error.kind(), FaultKind::TransientIo);
    }

    #[test]
    fn test_invalid_data_error() {
        let error = HardwareError::invalid_data("line is not UTF-8");
        assert_eq!(error.to_string(), "Invalid data: line is not UTF-8");
    }

    #[test]
    fn test_initialization_failed_is_missing_resource() {
        let error = HardwareError::initialization_failed("no such port");
        assert_eq!(error.kind(), FaultKind::MissingResource);
    }
}
