//! Background reader loop.
//!
//! The loop owns the badge channel and runs in its own task. Each cycle it
//! polls for one line, normalizes and de-duplicates it, answers the reader
//! with an acknowledgement byte and forwards the accepted identifier to the
//! kiosk over a bounded channel.
//!
//! ```text
//! ┌────────────┐  poll_line   ┌─────────────┐  ReaderEvent   ┌────────────┐
//! │ BadgeChannel│────────────►│ Reader Loop │──────────────► │ Kiosk task │
//! │            │◄────────────│             │   (mpsc)       │            │
//! └────────────┘  ack byte    └──────▲──────┘                └─────┬──────┘
//!                                    │     enrolled ids (watch)    │
//!                                    └──── DirectoryStore ◄────────┘
//! ```
//!
//! Authorization for the acknowledgement byte is answered from a
//! `watch` snapshot of the enrolled id set, so the loop never touches the
//! directory itself. The access decision proper (and the ledger row) is made
//! by the kiosk after the event arrives.
//!
//! # Examples
//!
//! ```no_run
//! use badgegate_core::EnrolledIds;
//! use badgegate_hardware::mock::MockBadgeChannel;
//! use badgegate_hardware::reader::{ReaderConfig, ReaderEvent, ReaderLoop};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> badgegate_hardware::Result<()> {
//!     let (_enrolled_tx, enrolled_rx) = watch::channel(EnrolledIds::default());
//!     let (channel, reader) = MockBadgeChannel::new();
//!
//!     let mut handle = ReaderLoop::new(channel.into(), enrolled_rx, ReaderConfig::default()).start();
//!     reader.present("a1b2")?;
//!
//!     if let Some(ReaderEvent::CardAccepted { id, authorized }) = handle.recv().await {
//!         println!("{id} authorized={authorized}");
//!     }
//!
//!     handle.shutdown().await
//! }
//! ```

use crate::devices::AnyBadgeChannel;
use crate::traits::BadgeChannel;
use crate::types::Ack;
use crate::{HardwareError, Result};
use badgegate_core::constants::{DEFAULT_POLL_INTERVAL_MS, READER_QUEUE_CAPACITY};
use badgegate_core::{BadgeId, EnrolledIds};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Event forwarded from the reader loop to the kiosk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReaderEvent {
    /// A new badge was presented and acknowledged.
    CardAccepted {
        /// Normalized identifier.
        id: BadgeId,

        /// Whether the acknowledgement said "authorized".
        authorized: bool,
    },
}

/// Reader loop timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Delay between polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Capacity of the queue into the kiosk.
    pub queue_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            queue_capacity: READER_QUEUE_CAPACITY,
        }
    }
}

impl ReaderConfig {
    pub fn poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// De-duplication state for one presentation session.
///
/// A token identical to the last accepted one is dropped; anything else
/// replaces it. The kiosk clears the session when its idle screen returns,
/// which lets the same badge be presented again.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReaderSession {
    last_accepted: Option<BadgeId>,
}

impl ReaderSession {
    /// Normalize `raw` and decide whether it is a new presentation.
    ///
    /// Returns `None` for blank or malformed tokens and for repeats.
    pub fn accept(&mut self, raw: &str) -> Option<BadgeId> {
        let id = match BadgeId::new(raw) {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "Ignoring unusable token");
                return None;
            }
        };

        if self.last_accepted.as_ref() == Some(&id) {
            debug!(badge = %id, "Suppressing repeated token");
            return None;
        }

        self.last_accepted = Some(id.clone());
        Some(id)
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }

    pub fn last_accepted(&self) -> Option<&BadgeId> {
        self.last_accepted.as_ref()
    }
}

/// Cross-task control surface for a running reader loop.
///
/// Cheap to clone. A control that was never attached to a loop is still
/// valid; its requests simply have no effect.
#[derive(Debug, Clone, Default)]
pub struct ReaderControl {
    reset_requested: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl ReaderControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to forget the last accepted id before its next poll.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Signal the loop to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn take_reset(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }
}

/// Reader loop, ready to be started.
pub struct ReaderLoop {
    channel: AnyBadgeChannel,
    enrolled: watch::Receiver<EnrolledIds>,
    config: ReaderConfig,
    control: ReaderControl,
}

impl ReaderLoop {
    pub fn new(
        channel: AnyBadgeChannel,
        enrolled: watch::Receiver<EnrolledIds>,
        config: ReaderConfig,
    ) -> Self {
        Self {
            channel,
            enrolled,
            config,
            control: ReaderControl::new(),
        }
    }

    /// Drive the loop from an existing control instead of a fresh one.
    pub fn with_control(mut self, control: ReaderControl) -> Self {
        self.control = control;
        self
    }

    /// Spawn the loop and return a handle for receiving its events.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> ReaderHandle {
        let (event_tx, event_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let control = self.control.clone();
        let task = tokio::spawn(self.run(event_tx));

        ReaderHandle {
            event_rx,
            control,
            task,
        }
    }

    async fn run(mut self, event_tx: mpsc::Sender<ReaderEvent>) {
        let interval = self.config.poll_interval();
        let mut session = ReaderSession::default();
        let mut faulted = false;

        info!(
            channel = %self.channel.info(),
            interval_ms = self.config.poll_interval_ms,
            "Reader loop started"
        );

        while !self.control.is_shutdown() {
            if self.control.take_reset() {
                debug!("Reader session reset");
                session.reset();
            }

            match self.channel.poll_line().await {
                Ok(Some(line)) => {
                    if faulted {
                        info!("Reader link recovered");
                        faulted = false;
                    }
                    if let Some(id) = session.accept(&line)
                        && !self.forward(id, &event_tx).await
                    {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    if faulted {
                        debug!(error = %e, "Reader poll failed");
                    } else {
                        warn!(error = %e, kind = %e.kind(), "Reader poll failed");
                        faulted = true;
                    }
                }
            }

            tokio::select! {
                () = self.control.cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        info!("Reader loop stopped");
    }

    /// Acknowledge and forward one accepted id. Returns `false` when the
    /// loop should stop.
    async fn forward(&mut self, id: BadgeId, event_tx: &mpsc::Sender<ReaderEvent>) -> bool {
        let authorized = self.enrolled.borrow().contains(&id);

        let ack = Ack::from_enrolled(authorized);
        if let Err(e) = self.channel.acknowledge(ack).await {
            warn!(badge = %id, %ack, error = %e, "Failed to acknowledge badge");
        }

        info!(badge = %id, authorized, "Badge accepted");

        let event = ReaderEvent::CardAccepted { id, authorized };
        tokio::select! {
            biased;
            () = self.control.cancel.cancelled() => false,
            sent = event_tx.send(event) => {
                if sent.is_err() {
                    info!("Kiosk queue closed");
                }
                sent.is_ok()
            }
        }
    }
}

/// Handle to a running reader loop.
#[derive(Debug)]
pub struct ReaderHandle {
    event_rx: mpsc::Receiver<ReaderEvent>,
    control: ReaderControl,
    task: JoinHandle<()>,
}

impl ReaderHandle {
    /// Receive the next accepted badge.
    ///
    /// Returns `None` once the loop has stopped and its queue is drained.
    pub async fn recv(&mut self) -> Option<ReaderEvent> {
        self.event_rx.recv().await
    }

    pub fn control(&self) -> &ReaderControl {
        &self.control
    }

    /// Stop the loop and wait for its task to finish.
    ///
    /// # Errors
    ///
    /// Returns an error only if the loop task panicked.
    pub async fn shutdown(self) -> Result<()> {
        self.control.shutdown();
        drop(self.event_rx);

        match self.task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!(error = %e, "Reader loop task panicked");
                Err(HardwareError::task_failed(format!("reader loop panicked: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBadgeChannel, MockBadgeChannelHandle};
    use badgegate_core::constants::MAX_LINE_LENGTH;
    use std::collections::BTreeSet;

    fn enrolled(ids: &[&str]) -> EnrolledIds {
        Arc::new(
            ids.iter()
                .map(|id| BadgeId::new(*id).unwrap())
                .collect::<BTreeSet<_>>(),
        )
    }

    fn start_loop(
        ids: &[&str],
    ) -> (ReaderHandle, MockBadgeChannelHandle, watch::Sender<EnrolledIds>) {
        let (enrolled_tx, enrolled_rx) = watch::channel(enrolled(ids));
        let (channel, mock) = MockBadgeChannel::new();
        let config = ReaderConfig::default().poll_interval_ms(5);
        let handle = ReaderLoop::new(channel.into(), enrolled_rx, config).start();
        (handle, mock, enrolled_tx)
    }

    async fn next_event(handle: &mut ReaderHandle) -> ReaderEvent {
        tokio::time::timeout(Duration::from_secs(2), handle.recv())
            .await
            .expect("timed out waiting for reader event")
            .expect("reader queue closed")
    }

    async fn assert_quiet(handle: &mut ReaderHandle) {
        let result = tokio::time::timeout(Duration::from_millis(60), handle.recv()).await;
        assert!(result.is_err(), "unexpected event: {result:?}");
    }

    fn accepted(id: &str, authorized: bool) -> ReaderEvent {
        ReaderEvent::CardAccepted {
            id: BadgeId::new(id).unwrap(),
            authorized,
        }
    }

    #[test]
    fn test_session_dedupes_consecutive_tokens() {
        let mut session = ReaderSession::default();

        assert_eq!(session.accept("a1b2").map(String::from), Some("A1B2".into()));
        assert_eq!(session.accept(" A1B2 "), None);
        assert_eq!(session.accept("C3D4").map(String::from), Some("C3D4".into()));
        assert_eq!(session.accept("a1b2").map(String::from), Some("A1B2".into()));
    }

    #[test]
    fn test_session_filters_blank_tokens() {
        let mut session = ReaderSession::default();
        assert_eq!(session.accept(""), None);
        assert_eq!(session.accept("   "), None);
        assert_eq!(session.last_accepted(), None);
    }

    #[test]
    fn test_session_reset_allows_repeat() {
        let mut session = ReaderSession::default();
        assert!(session.accept("A1B2").is_some());
        session.reset();
        assert!(session.accept("A1B2").is_some());
    }

    #[test]
    fn test_config_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.queue_capacity, 32);
    }

    #[tokio::test]
    async fn test_loop_acks_before_forwarding() {
        let (mut handle, mock, _enrolled) = start_loop(&["A1B2"]);

        mock.present("a1b2").unwrap();
        assert_eq!(next_event(&mut handle).await, accepted("A1B2", true));
        assert_eq!(mock.acks(), vec![Ack::Authorized]);

        mock.present("ZZ99").unwrap();
        assert_eq!(next_event(&mut handle).await, accepted("ZZ99", false));
        assert_eq!(mock.acks(), vec![Ack::Authorized, Ack::NotAuthorized]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_suppresses_repeats_until_reset() {
        let (mut handle, mock, _enrolled) = start_loop(&[]);

        mock.present("A1B2").unwrap();
        mock.present("a1b2").unwrap();
        mock.present(" A1B2").unwrap();
        assert_eq!(next_event(&mut handle).await, accepted("A1B2", false));
        assert_quiet(&mut handle).await;
        assert_eq!(mock.acks().len(), 1);

        handle.control().request_reset();
        mock.present("A1B2").unwrap();
        assert_eq!(next_event(&mut handle).await, accepted("A1B2", false));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_sees_enrollment_changes() {
        let (mut handle, mock, enrolled_tx) = start_loop(&[]);

        mock.present("C3D4").unwrap();
        assert_eq!(next_event(&mut handle).await, accepted("C3D4", false));

        enrolled_tx.send_replace(enrolled(&["C3D4"]));
        handle.control().request_reset();
        mock.present("C3D4").unwrap();
        assert_eq!(next_event(&mut handle).await, accepted("C3D4", true));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_survives_faults_and_bad_bytes() {
        let (mut handle, mock, _enrolled) = start_loop(&[]);

        mock.inject_fault("framing error").unwrap();
        mock.send_raw(vec![0xFF, 0xFE, b'\n']).unwrap();
        mock.present("").unwrap();
        mock.present("A1B2").unwrap();

        assert_eq!(next_event(&mut handle).await, accepted("A1B2", false));
        assert_eq!(mock.acks(), vec![Ack::NotAuthorized]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_ignores_tail_of_overlong_line() {
        let (mut handle, mock, _enrolled) = start_loop(&["TAIL"]);

        mock.send_raw(vec![b'A'; MAX_LINE_LENGTH + 10]).unwrap();
        mock.send_raw(b"TAIL\n".to_vec()).unwrap();
        mock.present("C3D4").unwrap();

        assert_eq!(next_event(&mut handle).await, accepted("C3D4", false));
        assert_eq!(mock.acks(), vec![Ack::NotAuthorized]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_keeps_running_after_disconnect() {
        let (handle, mock, _enrolled) = start_loop(&[]);
        drop(mock);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.task.is_finished());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_within_one_interval() {
        let (enrolled_tx, enrolled_rx) = watch::channel(enrolled(&[]));
        let (channel, _mock) = MockBadgeChannel::new();
        let config = ReaderConfig::default().poll_interval_ms(10_000);
        let handle = ReaderLoop::new(channel.into(), enrolled_rx, config).start();

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown should not wait for the poll interval")
            .unwrap();
        drop(enrolled_tx);
    }

    #[tokio::test]
    async fn test_loop_ends_when_queue_closes() {
        let (enrolled_tx, enrolled_rx) = watch::channel(enrolled(&[]));
        let (channel, mock) = MockBadgeChannel::new();
        let config = ReaderConfig::default().poll_interval_ms(5);
        let ReaderHandle { event_rx, task, .. } =
            ReaderLoop::new(channel.into(), enrolled_rx, config).start();

        drop(event_rx);
        mock.present("A1B2").unwrap();

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("loop should stop once the kiosk queue is gone")
            .unwrap();
        drop(enrolled_tx);
    }

    #[test]
    fn test_detached_control_is_inert() {
        let control = ReaderControl::new();
        control.request_reset();
        assert!(control.take_reset());
        assert!(!control.take_reset());

        control.shutdown();
        assert!(control.is_shutdown());
    }
}
