//! Badge reader link for the kiosk.
//!
//! This crate owns everything between the wire and the kiosk's event queue:
//!
//! - [`BadgeChannel`] - a line-oriented link that yields raw card tokens and
//!   accepts single-byte acknowledgements
//! - [`SerialBadgeChannel`] - the real reader on a serial port (feature
//!   `serial`, on by default)
//! - [`MockBadgeChannel`] - a programmable link for tests and demos
//! - [`ReaderLoop`] - the background task that polls a channel, drops repeated
//!   tokens, acknowledges the reader and forwards [`ReaderEvent`]s
//!
//! # Design
//!
//! - **Async-first**: channel operations are native `async fn` in traits
//!   (Rust 1.90 + Edition 2024).
//! - **Enum dispatch**: the loop holds an [`AnyBadgeChannel`] rather than a
//!   trait object, so its future stays `Send`.
//! - **Never fatal**: link faults are logged and the cycle is skipped; only
//!   shutdown (or the kiosk going away) stops the loop.
//!
//! # Examples
//!
//! ```no_run
//! use badgegate_core::EnrolledIds;
//! use badgegate_hardware::{AnyBadgeChannel, ReaderConfig, ReaderLoop, SerialBadgeChannel, SerialConfig};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> badgegate_hardware::Result<()> {
//!     let channel = SerialBadgeChannel::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//!     let (_tx, enrolled) = watch::channel(EnrolledIds::default());
//!
//!     let mut reader = ReaderLoop::new(AnyBadgeChannel::from(channel), enrolled, ReaderConfig::default()).start();
//!     while let Some(event) = reader.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod error;
pub mod line;
pub mod mock;
pub mod reader;
#[cfg(feature = "serial")]
pub mod serial;
pub mod traits;
pub mod types;

pub use devices::AnyBadgeChannel;
pub use error::{HardwareError, Result};
pub use mock::{MockBadgeChannel, MockBadgeChannelHandle};
pub use reader::{ReaderConfig, ReaderControl, ReaderEvent, ReaderHandle, ReaderLoop, ReaderSession};
#[cfg(feature = "serial")]
pub use serial::{SerialBadgeChannel, SerialConfig};
pub use traits::BadgeChannel;
pub use types::{Ack, ChannelInfo, Transport};
