//! Operator- and visitor-facing text.
//!
//! Kept in one place so console and graphical front ends show the same
//! wording.

use std::path::Path;

pub struct KioskMessages;

impl KioskMessages {
    /// Idle screen headline.
    pub const READY: &'static str = "Ready to Scan";

    /// Idle screen footer.
    pub const PLACE_CARD: &'static str = "Please place your card on the reader";

    pub const ALLOWED: &'static str = "Allowed";
    pub const NOT_ALLOWED: &'static str = "Not Allowed";
    pub const WELCOME: &'static str = "Welcome! You may proceed.";
    pub const NO_PERMISSION: &'static str = "Sorry, you don't have permission.";

    /// Shown while the enrollment form waits for a card.
    pub const WAITING_FOR_CARD: &'static str = "Please scan the RFID card now";

    pub const INVALID_LOGIN: &'static str = "Invalid username or password";
    pub const LOGS_CLEARED: &'static str = "All logs have been cleared.";
    pub const USER_DELETED: &'static str = "User deleted successfully!";

    pub fn card_captured(id: &str) -> String {
        format!("Card ID {id} scanned successfully!")
    }

    pub fn user_registered(name: &str) -> String {
        format!("User {name} successfully registered!")
    }

    pub fn user_updated(name: &str) -> String {
        format!("User {name} updated successfully!")
    }

    pub fn logs_exported(destination: &Path) -> String {
        format!("Logs exported to {}", destination.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_non_empty() {
        for message in [
            KioskMessages::READY,
            KioskMessages::PLACE_CARD,
            KioskMessages::ALLOWED,
            KioskMessages::NOT_ALLOWED,
            KioskMessages::WELCOME,
            KioskMessages::NO_PERMISSION,
            KioskMessages::WAITING_FOR_CARD,
            KioskMessages::INVALID_LOGIN,
            KioskMessages::LOGS_CLEARED,
            KioskMessages::USER_DELETED,
        ] {
            assert!(!message.is_empty());
        }
    }

    #[test]
    fn test_formatted_messages() {
        assert_eq!(
            KioskMessages::card_captured("C3D4"),
            "Card ID C3D4 scanned successfully!"
        );
        assert_eq!(
            KioskMessages::user_registered("Alice"),
            "User Alice successfully registered!"
        );
        assert_eq!(
            KioskMessages::logs_exported(Path::new("/tmp/out.csv")),
            "Logs exported to /tmp/out.csv"
        );
    }
}
