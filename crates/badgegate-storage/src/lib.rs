//! Storage layer for the badge kiosk.
//!
//! This crate persists the two pieces of durable state the kiosk owns:
//!
//! - [`DirectoryStore`] - the enrolled badges, a JSON document loaded once at
//!   startup and rewritten whole (temp file + rename) after every mutation
//! - [`Ledger`] - the append-only CSV record of every access decision
//!
//! plus [`ImageAssets`], the managed directory that holds badge portraits.
//!
//! # Single Writer
//!
//! The store performs no internal locking around the directory: it is owned
//! by the kiosk's UI task, which is the only context that mutates it. Other
//! tasks (the reader loop) observe the enrolled id set through a
//! `tokio::sync::watch` snapshot obtained from [`DirectoryStore::subscribe`].
//! The ledger serializes appends and clears with a mutex so it can be
//! shared with administrative tooling.
//!
//! # Failure Policy
//!
//! Missing or malformed files never prevent startup: a broken directory
//! document loads as empty and a missing ledger reads as empty. Write
//! failures are returned as [`StorageError::Write`], classified as
//! persistence faults; the in-memory directory is not rolled back.
//!
//! # Examples
//!
//! ```no_run
//! use badgegate_core::{AccessEvent, BadgeId, BadgeRecord};
//! use badgegate_storage::{DirectoryStore, Ledger, StoreConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::under("/var/lib/badgegate");
//! let mut store = DirectoryStore::open(&config);
//! let ledger = Ledger::new(&config.ledger_file);
//!
//! let record = BadgeRecord::new(BadgeId::new("a1b2")?, "Alice", "/tmp/alice.png")?;
//! store.register_or_update(record)?;
//!
//! let event = match store.get("A1B2") {
//!     Some(record) => AccessEvent::now("A1B2", &record.display_name, badgegate_core::AccessOutcome::Granted),
//!     None => AccessEvent::unknown("A1B2"),
//! };
//! ledger.append(&event)?;
//! # Ok(())
//! # }
//! ```

mod atomic;

pub mod assets;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;

pub use assets::ImageAssets;
pub use config::StoreConfig;
pub use directory::{Directory, DirectoryStore, load_directory, save_directory};
pub use error::{StorageError, StorageResult};
pub use ledger::Ledger;
