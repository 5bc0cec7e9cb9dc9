//! Enum wrapper for badge channel dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the reader loop cannot
//! hold a `Box<dyn BadgeChannel>`. [`AnyBadgeChannel`] provides concrete
//! dispatch instead, which also keeps the loop's future `Send` so it can be
//! handed to `tokio::spawn`.
//!
//! # Examples
//!
//! ```
//! use badgegate_hardware::devices::AnyBadgeChannel;
//! use badgegate_hardware::mock::MockBadgeChannel;
//! use badgegate_hardware::traits::BadgeChannel;
//!
//! let (channel, _handle) = MockBadgeChannel::new();
//! let channel = AnyBadgeChannel::from(channel);
//! assert_eq!(channel.info().name, "Mock Badge Reader");
//! ```

use crate::mock::MockBadgeChannel;
#[cfg(feature = "serial")]
use crate::serial::SerialBadgeChannel;
use crate::traits::BadgeChannel;
use crate::types::{Ack, ChannelInfo};
use crate::Result;

#[derive(Debug)]
#[non_exhaustive]
pub enum AnyBadgeChannel {
    /// Reader on a serial port.
    #[cfg(feature = "serial")]
    Serial(SerialBadgeChannel),

    /// Mock channel for development and testing.
    Mock(MockBadgeChannel),
}

impl BadgeChannel for AnyBadgeChannel {
    async fn poll_line(&mut self) -> Result<Option<String>> {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(channel) => channel.poll_line().await,
            Self::Mock(channel) => channel.poll_line().await,
        }
    }

    async fn acknowledge(&mut self, ack: Ack) -> Result<()> {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(channel) => channel.acknowledge(ack).await,
            Self::Mock(channel) => channel.acknowledge(ack).await,
        }
    }

    fn info(&self) -> ChannelInfo {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(channel) => channel.info(),
            Self::Mock(channel) => channel.info(),
        }
    }
}

#[cfg(feature = "serial")]
impl From<SerialBadgeChannel> for AnyBadgeChannel {
    fn from(channel: SerialBadgeChannel) -> Self {
        Self::Serial(channel)
    }
}

impl From<MockBadgeChannel> for AnyBadgeChannel {
    fn from(channel: MockBadgeChannel) -> Self {
        Self::Mock(channel)
    }
}
