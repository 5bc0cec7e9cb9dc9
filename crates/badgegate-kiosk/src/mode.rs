//! Kiosk mode machine.
//!
//! The kiosk is always in exactly one of three modes, and a scanned badge is
//! routed according to it:
//!
//! - `Scanning`: the public idle screen; a scan is an access attempt
//! - `Registering`: an operator is enrolling a badge; a scan fills the form
//! - `AdminMenu`: an operator is in the admin panel; scans are ignored
//!
//! # Valid Transitions
//!
//! - Scanning ↔ AdminMenu
//! - AdminMenu ↔ Registering
//! - Registering → Scanning
//!
//! Requesting the current mode is accepted and records nothing. Only UI
//! actions move the machine; badge scans never do.
//!
//! # Examples
//!
//! ```
//! use badgegate_kiosk::{KioskMode, ModeMachine};
//!
//! let mut machine = ModeMachine::new();
//! assert_eq!(machine.current_mode(), KioskMode::Scanning);
//!
//! machine.transition_to(KioskMode::AdminMenu).unwrap();
//! assert!(machine.transition_to(KioskMode::AdminMenu).unwrap().is_none());
//! assert_eq!(machine.history().len(), 1);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use badgegate_core::{Error, Result};

/// Maximum number of mode transitions to keep in history.
const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KioskMode {
    /// Idle screen; scans are access attempts.
    Scanning,

    /// Enrollment form is open; scans fill its card field.
    Registering,

    /// Admin panel is open; scans are ignored.
    AdminMenu,
}

impl fmt::Display for KioskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            KioskMode::Scanning => "scanning",
            KioskMode::Registering => "registering",
            KioskMode::AdminMenu => "admin menu",
        };
        write!(f, "{mode}")
    }
}

impl KioskMode {
    /// Check if moving to `target` is allowed from this mode.
    ///
    /// ```
    /// use badgegate_kiosk::KioskMode;
    ///
    /// assert!(KioskMode::Scanning.can_transition_to(KioskMode::AdminMenu));
    /// assert!(!KioskMode::Scanning.can_transition_to(KioskMode::Registering));
    /// ```
    pub fn can_transition_to(self, target: KioskMode) -> bool {
        matches!(
            (self, target),
            (KioskMode::Scanning, KioskMode::AdminMenu)
                | (KioskMode::AdminMenu, KioskMode::Scanning | KioskMode::Registering)
                | (KioskMode::Registering, KioskMode::AdminMenu | KioskMode::Scanning)
        )
    }

    /// Whether operator actions (enrollment, edits, ledger maintenance) are
    /// available in this mode.
    pub fn is_operator(self) -> bool {
        !matches!(self, KioskMode::Scanning)
    }
}

/// A single recorded mode change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeTransition {
    pub from: KioskMode,
    pub to: KioskMode,

    /// Not serialized; set to the time of deserialization when read back.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl ModeTransition {
    pub fn new(from: KioskMode, to: KioskMode) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Mode machine with a bounded transition history.
///
/// Not thread-safe; it is owned by the kiosk task.
#[derive(Debug)]
pub struct ModeMachine {
    current_mode: KioskMode,
    mode_entered_at: Instant,
    history: VecDeque<ModeTransition>,
}

impl ModeMachine {
    /// Create a machine in `Scanning`.
    pub fn new() -> Self {
        Self {
            current_mode: KioskMode::Scanning,
            mode_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_mode(&self) -> KioskMode {
        self.current_mode
    }

    pub fn time_in_current_mode(&self) -> Duration {
        self.mode_entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<ModeTransition> {
        &self.history
    }

    /// Get the last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<ModeTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Move to `new_mode`.
    ///
    /// Returns `Ok(None)` when already in `new_mode`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the move is not allowed;
    /// the machine is left unchanged.
    ///
    /// ```
    /// use badgegate_kiosk::{KioskMode, ModeMachine};
    ///
    /// let mut machine = ModeMachine::new();
    /// assert!(machine.transition_to(KioskMode::Registering).is_err());
    /// assert_eq!(machine.current_mode(), KioskMode::Scanning);
    /// ```
    pub fn transition_to(&mut self, new_mode: KioskMode) -> Result<Option<ModeTransition>> {
        if new_mode == self.current_mode {
            return Ok(None);
        }
        if !self.current_mode.can_transition_to(new_mode) {
            return Err(Error::InvalidStateTransition {
                from: self.current_mode.to_string(),
                to: new_mode.to_string(),
            });
        }

        let transition = ModeTransition::new(self.current_mode, new_mode);
        self.current_mode = new_mode;
        self.mode_entered_at = Instant::now();

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(Some(transition))
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}
