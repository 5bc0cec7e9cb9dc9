//! Badge channel trait.
//!
//! A badge channel is the byte link to a reader: it yields newline-terminated
//! lines carrying raw card identifiers and accepts single-byte
//! acknowledgements. Implementations must not block for longer than one
//! read timeout; the reader loop relies on `poll_line` returning promptly so
//! it can notice shutdown within one polling interval.

use crate::Result;
use crate::types::{Ack, ChannelInfo};

/// Line-oriented link to a badge reader.
///
/// Only `Send` is required. A channel is owned by exactly one reader task,
/// and serial port handles are not `Sync`.
///
/// # Examples
///
/// ```
/// use badgegate_hardware::traits::BadgeChannel;
/// use badgegate_hardware::types::Ack;
/// use badgegate_hardware::Result;
///
/// async fn answer_next<C: BadgeChannel>(channel: &mut C) -> Result<Option<String>> {
///     let line = channel.poll_line().await?;
///     if line.is_some() {
///         channel.acknowledge(Ack::NotAuthorized).await?;
///     }
///     Ok(line)
/// }
/// ```
pub trait BadgeChannel: Send {
    /// Return the next complete line if one is available, without waiting
    /// for more input.
    ///
    /// The returned line has its terminator removed but is otherwise raw;
    /// trimming and case folding happen in the reader loop.
    ///
    /// # Errors
    ///
    /// Returns an error when the link fails or the line is not valid UTF-8.
    /// A failed line is consumed and will not be returned again.
    async fn poll_line(&mut self) -> Result<Option<String>>;

    /// Write an acknowledgement byte to the reader.
    async fn acknowledge(&mut self, ack: Ack) -> Result<()>;

    /// Describe this channel.
    fn info(&self) -> ChannelInfo;
}
