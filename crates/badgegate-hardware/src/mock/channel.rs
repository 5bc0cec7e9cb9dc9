//! Mock badge channel for testing and development.
//!
//! This module provides a simulated reader link that can be driven
//! programmatically: tests present cards, inject raw bytes or link faults,
//! and inspect the acknowledgements the reader loop wrote back.

use crate::line::LineAssembler;
use crate::traits::BadgeChannel;
use crate::types::{Ack, ChannelInfo, Transport};
use crate::{HardwareError, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Simulated badge reader link.
///
/// # Examples
///
/// ```
/// use badgegate_hardware::mock::MockBadgeChannel;
/// use badgegate_hardware::traits::BadgeChannel;
/// use badgegate_hardware::types::Ack;
///
/// #[tokio::main]
/// async fn main() -> badgegate_hardware::Result<()> {
///     let (mut channel, handle) = MockBadgeChannel::new();
///
///     handle.present("a1b2")?;
///     assert_eq!(channel.poll_line().await?.as_deref(), Some("a1b2"));
///
///     channel.acknowledge(Ack::Authorized).await?;
///     assert_eq!(handle.acks(), vec![Ack::Authorized]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockBadgeChannel {
    /// Inbound chunks from the handle
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,

    /// Acknowledgements written by the reader loop
    acks: Arc<Mutex<Vec<Ack>>>,

    lines: LineAssembler,
    name: String,
}

impl MockBadgeChannel {
    /// Create a new mock channel with the default name.
    pub fn new() -> (Self, MockBadgeChannelHandle) {
        Self::with_name("Mock Badge Reader")
    }

    /// Create a new mock channel with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockBadgeChannelHandle) {
        let name = name.into();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let acks = Arc::new(Mutex::new(Vec::new()));

        let channel = Self {
            inbound_rx,
            acks: Arc::clone(&acks),
            lines: LineAssembler::default(),
            name: name.clone(),
        };
        let handle = MockBadgeChannelHandle {
            inbound_tx,
            acks,
            name,
        };

        (channel, handle)
    }
}

impl BadgeChannel for MockBadgeChannel {
    async fn poll_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.lines.next_line()? {
                return Ok(Some(line));
            }

            match self.inbound_rx.try_recv() {
                Ok(Inbound::Bytes(bytes)) => self.lines.push(&bytes)?,
                Ok(Inbound::Fault(message)) => return Err(HardwareError::communication(message)),
                Err(mpsc::error::TryRecvError::Empty) => return Ok(None),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    return Err(HardwareError::disconnected(self.name.clone()));
                }
            }
        }
    }

    async fn acknowledge(&mut self, ack: Ack) -> Result<()> {
        self.acks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ack);
        Ok(())
    }

    fn info(&self) -> ChannelInfo {
        ChannelInfo::new(self.name.clone(), Transport::Mock)
    }
}

/// Internal inbound item for the mock channel.
#[derive(Debug)]
enum Inbound {
    Bytes(Vec<u8>),
    Fault(String),
}

/// Handle for driving a [`MockBadgeChannel`].
///
/// Dropping every clone of the handle disconnects the channel; subsequent
/// polls fail with [`HardwareError::Disconnected`] once buffered input has
/// been drained.
#[derive(Debug, Clone)]
pub struct MockBadgeChannelHandle {
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    acks: Arc<Mutex<Vec<Ack>>>,
    name: String,
}

impl MockBadgeChannelHandle {
    /// Present a card: send `token` followed by the line terminator.
    pub fn present(&self, token: &str) -> Result<()> {
        let mut bytes = token.as_bytes().to_vec();
        bytes.push(b'\n');
        self.send_raw(bytes)
    }

    /// Send raw bytes exactly as given, without adding a terminator.
    pub fn send_raw(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.send(Inbound::Bytes(bytes.into()))
    }

    /// Make the next poll fail with a communication error.
    pub fn inject_fault(&self, message: impl Into<String>) -> Result<()> {
        self.send(Inbound::Fault(message.into()))
    }

    /// Acknowledgements written so far, oldest first.
    pub fn acks(&self) -> Vec<Ack> {
        self.acks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, item: Inbound) -> Result<()> {
        self.inbound_tx
            .send(item)
            .map_err(|_| HardwareError::disconnected(self.name.clone()))
    }
}
