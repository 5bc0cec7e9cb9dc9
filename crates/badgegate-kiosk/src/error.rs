//! Kiosk error types.

use crate::mode::KioskMode;
use crate::registration::FormError;
use badgegate_core::FaultKind;
use badgegate_storage::StorageError;

pub type KioskResult<T> = std::result::Result<T, KioskError>;

/// Errors reported to the view while handling a UI action or a scan.
///
/// None of these stop the kiosk.
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    /// Rejected mode change or malformed input.
    #[error(transparent)]
    Core(#[from] badgegate_core::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{action} is not available in {mode} mode")]
    NotAvailable {
        action: &'static str,
        mode: KioskMode,
    },
}

impl KioskError {
    pub fn not_available(action: &'static str, mode: KioskMode) -> Self {
        Self::NotAvailable { action, mode }
    }

    /// Classify this error into one of the four fault kinds.
    pub fn kind(&self) -> FaultKind {
        match self {
            KioskError::Core(e) => e.kind(),
            KioskError::Storage(e) => e.kind(),
            KioskError::Form(_)
            | KioskError::InvalidCredentials
            | KioskError::NotAvailable { .. } => FaultKind::Validation,
        }
    }
}
