//! Kiosk core: mode routing, access decisions and operator actions.
//!
//! The crate is front-end agnostic. A front end implements [`KioskView`],
//! feeds [`UiAction`]s into a queue and hands both, together with an
//! optional reader loop, to [`Kiosk::run`].
//!
//! ```no_run
//! use badgegate_kiosk::{Kiosk, KioskSettings, KioskView, UiAction};
//! use badgegate_storage::{DirectoryStore, Ledger, StoreConfig};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example<V: KioskView>(view: V) {
//! let config = StoreConfig::under("/var/lib/badgegate");
//! let store = DirectoryStore::open(&config);
//! let ledger = Ledger::new(&config.ledger_file);
//!
//! let (actions_tx, actions_rx) = mpsc::channel(16);
//! let kiosk = Kiosk::new(store, ledger, view, KioskSettings::default());
//!
//! actions_tx.send(UiAction::ListRecords).await.ok();
//! drop(actions_tx);
//! kiosk.run(None, actions_rx, CancellationToken::new()).await;
//! # }
//! ```

pub mod admin;
pub mod decision;
pub mod error;
pub mod kiosk;
pub mod messages;
pub mod mode;
pub mod registration;
pub mod view;

pub use admin::AdminCredentials;
pub use decision::{AccessDecision, decide};
pub use error::{KioskError, KioskResult};
pub use kiosk::{Kiosk, KioskSettings, UiAction};
pub use messages::KioskMessages;
pub use mode::{KioskMode, ModeMachine, ModeTransition};
pub use registration::{CaptureState, FormError, RegistrationForm};
pub use view::KioskView;
