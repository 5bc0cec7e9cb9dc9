//! Types shared by every badge channel implementation.

use badgegate_core::constants::{ACK_AUTHORIZED, ACK_NOT_AUTHORIZED};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Single-byte response written back to the reader after a card is accepted.
///
/// The reader firmware lights its own indicator from this byte, so it must be
/// written once per accepted card and never for suppressed repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ack {
    /// The badge is enrolled.
    Authorized,
    /// The badge is not enrolled.
    NotAuthorized,
}

impl Ack {
    pub fn from_enrolled(enrolled: bool) -> Self {
        if enrolled {
            Self::Authorized
        } else {
            Self::NotAuthorized
        }
    }

    /// Wire byte for this acknowledgement.
    pub fn byte(self) -> u8 {
        match self {
            Self::Authorized => ACK_AUTHORIZED,
            Self::NotAuthorized => ACK_NOT_AUTHORIZED,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ACK_AUTHORIZED => Some(Self::Authorized),
            ACK_NOT_AUTHORIZED => Some(Self::NotAuthorized),
            _ => None,
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorized => write!(f, "authorized"),
            Self::NotAuthorized => write!(f, "not authorized"),
        }
    }
}

/// Kind of link a channel talks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Serial,
    Mock,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// Badge channel information.
///
/// Used for log fields and the operator console's status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel name (e.g., "/dev/ttyUSB0", "Mock Badge Reader").
    pub name: String,

    /// Link type.
    pub transport: Transport,

    /// Link speed in bits per second, when the link has one.
    pub baud_rate: Option<u32>,
}

impl ChannelInfo {
    pub fn new(name: impl Into<String>, transport: Transport) -> Self {
        Self {
            name: name.into(),
            transport,
            baud_rate: None,
        }
    }

    /// Set the link speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.baud_rate {
            Some(baud) => write!(f, "{} ({}, {} baud)", self.name, self.transport, baud),
            None => write!(f, "{} ({})", self.name, self.transport),
        }
    }
}
