//! Pending enrollment form.
//!
//! The form lives on the kiosk task and is filled piecewise: an operator
//! arms the capture control, a badge scan fills the card field, and the name
//! and portrait are typed or picked. Submitting validates the fields in a
//! fixed order and only then touches the directory.

use crate::messages::KioskMessages;
use badgegate_core::{BadgeId, BadgeRecord};
use badgegate_storage::DirectoryStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::KioskResult;

/// Validation failures for a submitted form, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Please scan an RFID card first")]
    MissingCard,

    #[error("Please enter a name")]
    MissingName,

    #[error("Please select an image")]
    MissingImage,
}

/// State of the "scan card" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureState {
    #[default]
    Ready,
    Waiting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    captured_id: Option<BadgeId>,
    name: String,
    image: Option<PathBuf>,
    capture: CaptureState,
    status: String,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured_id(&self) -> Option<&BadgeId> {
        self.captured_id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture
    }

    /// Last status line shown under the form.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Arm the capture control.
    pub fn begin_capture(&mut self) {
        self.capture = CaptureState::Waiting;
        self.status = KioskMessages::WAITING_FOR_CARD.to_string();
    }

    /// Fill the card field from a scan. A later scan overwrites it.
    pub fn capture(&mut self, id: BadgeId) {
        self.status = KioskMessages::card_captured(id.as_str());
        self.captured_id = Some(id);
        self.capture = CaptureState::Ready;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_image(&mut self, image: impl Into<PathBuf>) {
        self.image = Some(image.into());
    }

    /// Check the fields and build the record they describe.
    ///
    /// # Errors
    ///
    /// Reports the first missing field: card, then name, then image.
    pub fn validate(&self) -> Result<BadgeRecord, FormError> {
        let id = self.captured_id.clone().ok_or(FormError::MissingCard)?;
        if self.name.trim().is_empty() {
            return Err(FormError::MissingName);
        }
        let image = self.image.clone().ok_or(FormError::MissingImage)?;

        BadgeRecord::new(id, &self.name, image).map_err(|_| FormError::MissingName)
    }

    /// Validate, register and clear the form.
    ///
    /// On any failure the form keeps its fields and its status line carries
    /// the error text; validation failures never reach the directory.
    pub fn submit(&mut self, store: &mut DirectoryStore) -> KioskResult<BadgeRecord> {
        let record = match self.validate() {
            Ok(record) => record,
            Err(e) => {
                self.status = e.to_string();
                return Err(e.into());
            }
        };

        match store.register_or_update(record) {
            Ok(record) => {
                *self = Self {
                    status: KioskMessages::user_registered(&record.display_name),
                    ..Self::default()
                };
                Ok(record)
            }
            Err(e) => {
                self.status = format!("Error registering user: {e}");
                Err(e.into())
            }
        }
    }

    /// Clear every field, including the status line.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
