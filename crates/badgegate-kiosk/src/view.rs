//! Presentation seam.
//!
//! The kiosk task calls into a [`KioskView`] after every state change. The
//! view only renders; it never calls back into the kiosk. Front ends send
//! operator input through the kiosk's `UiAction` queue instead.

use crate::decision::AccessDecision;
use crate::error::KioskError;
use crate::mode::KioskMode;
use crate::registration::RegistrationForm;
use badgegate_core::{AccessEvent, BadgeRecord};

pub trait KioskView: Send {
    /// Idle "ready to scan" screen.
    fn show_idle(&mut self);

    /// Outcome of a scan on the idle screen.
    fn show_decision(&mut self, decision: &AccessDecision);

    /// The kiosk entered `mode`.
    fn show_mode(&mut self, mode: KioskMode);

    fn show_form(&mut self, form: &RegistrationForm);

    fn show_records(&mut self, records: &[BadgeRecord]);

    fn show_ledger(&mut self, events: &[AccessEvent]);

    /// Informational message for the operator.
    fn show_notice(&mut self, message: &str);

    /// A scan or action failed.
    fn show_fault(&mut self, error: &KioskError);
}
