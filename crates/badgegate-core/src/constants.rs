//! Core constants for the badge kiosk.
//!
//! This module defines the fixed values shared by the reader loop, the
//! store and the kiosk runtime: wire bytes, ledger column layout, default
//! timings and default file locations.
//!
//! # Usage
//!
//! ```
//! use badgegate_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(ACK_AUTHORIZED, b'1');
//! assert_eq!(LEDGER_HEADER.len(), 4);
//!
//! let reset = Duration::from_millis(DEFAULT_IDLE_RESET_MS);
//! assert_eq!(reset.as_secs(), 3);
//! ```

// ============================================================================
// Reader Link
// ============================================================================

/// Byte written back to the reader when the badge is enrolled.
pub const ACK_AUTHORIZED: u8 = b'1';

/// Byte written back to the reader when the badge is unknown.
pub const ACK_NOT_AUTHORIZED: u8 = b'0';

/// Line terminator on the reader link.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest line accepted from the reader before the buffer is discarded.
///
/// Badge UIDs are at most a few dozen characters; anything longer is line
/// noise from a misconfigured baud rate.
pub const MAX_LINE_LENGTH: usize = 256;

/// Default serial baud rate of the reader firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default serial port of the reader.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Serial read timeout in milliseconds.
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Timing
// ============================================================================

/// Interval between reader polls (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Delay before the scanning screen returns to idle after a decision (milliseconds).
pub const DEFAULT_IDLE_RESET_MS: u64 = 3000;

/// Capacity of the reader-to-kiosk hand-off queue.
pub const READER_QUEUE_CAPACITY: usize = 32;

// ============================================================================
// Ledger
// ============================================================================

/// Header row of the access ledger.
pub const LEDGER_HEADER: [&str; 4] = ["Timestamp", "Card ID", "Name", "Status"];

/// Ledger timestamp format (second resolution, local time).
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status column value for a granted attempt.
pub const STATUS_GRANTED: &str = "ACCESS GRANTED";

/// Status column value for a denied attempt.
pub const STATUS_DENIED: &str = "ACCESS DENIED";

/// Actor name recorded for badges that are not enrolled.
pub const UNKNOWN_USER: &str = "Unknown User";

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default directory document path.
pub const DEFAULT_DIRECTORY_FILE: &str = "users.json";

/// Default ledger path.
pub const DEFAULT_LEDGER_FILE: &str = "access_logs.csv";

/// Default managed image directory.
pub const DEFAULT_IMAGES_DIR: &str = "user_images";

// ============================================================================
// Administration
// ============================================================================

/// Factory operator user name.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Factory operator password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
