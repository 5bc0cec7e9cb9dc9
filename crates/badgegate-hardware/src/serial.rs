//! Serial-line badge reader.
//!
//! The reader firmware prints each card identifier followed by `\n` and
//! waits for a single acknowledgement byte. The port is opened with a short
//! read timeout and only read when the driver reports pending bytes, so
//! [`SerialBadgeChannel::poll_line`] never waits on the wire. Acknowledgements
//! go through a cloned handle on the blocking pool, so a stalled write never
//! holds an async worker.

use crate::line::LineAssembler;
use crate::traits::BadgeChannel;
use crate::types::{Ack, ChannelInfo, Transport};
use crate::{HardwareError, Result};
use badgegate_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT, DEFAULT_SERIAL_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path or name (e.g., "/dev/ttyUSB0", "COM3").
    pub port: String,

    /// Line speed in bits per second.
    pub baud_rate: u32,

    /// Read/write timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Badge reader attached to a serial port.
pub struct SerialBadgeChannel {
    port: Box<dyn serialport::SerialPort>,
    writer: Arc<Mutex<Box<dyn serialport::SerialPort>>>,
    config: SerialConfig,
    lines: LineAssembler,
}

impl fmt::Debug for SerialBadgeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialBadgeChannel")
            .field("config", &self.config)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl SerialBadgeChannel {
    /// Open the configured port.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InitializationFailed`] when the port cannot be
    /// opened. Callers typically log this and continue without a reader.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.timeout())
            .open()
            .map_err(|e| {
                HardwareError::initialization_failed(format!("{}: {}", config.port, e.description))
            })?;

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "Serial badge reader opened"
        );

        Self::from_port(port, config.clone())
    }

    fn from_port(port: Box<dyn serialport::SerialPort>, config: SerialConfig) -> Result<Self> {
        let writer = port.try_clone().map_err(|e| {
            HardwareError::initialization_failed(format!("{}: {}", config.port, e.description))
        })?;

        Ok(Self {
            port,
            writer: Arc::new(Mutex::new(writer)),
            config,
            lines: LineAssembler::default(),
        })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn fill(&mut self) -> Result<()> {
        let available = self.port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(());
        }

        let mut chunk = vec![0u8; available];
        let read = match self.port.read(&mut chunk) {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        debug!(port = %self.config.port, bytes = read, "Serial bytes received");
        self.lines.push(&chunk[..read])
    }
}

impl BadgeChannel for SerialBadgeChannel {
    async fn poll_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.lines.next_line()? {
            return Ok(Some(line));
        }
        self.fill()?;
        self.lines.next_line()
    }

    async fn acknowledge(&mut self, ack: Ack) -> Result<()> {
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut port = writer.lock().unwrap_or_else(PoisonError::into_inner);
            port.write_all(&[ack.byte()])?;
            port.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| HardwareError::task_failed(format!("serial acknowledgement: {e}")))?
    }

    fn info(&self) -> ChannelInfo {
        ChannelInfo::new(self.config.port.clone(), Transport::Serial)
            .with_baud_rate(self.config.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::SerialPort;

    #[test]
    fn test_default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_builder() {
        let config = SerialConfig::new("COM3").baud_rate(115_200).timeout_ms(250);
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout_ms, 250);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SerialConfig = serde_json::from_str(r#"{"port": "COM4"}"#).unwrap();
        assert_eq!(config.port, "COM4");
        assert_eq!(config.baud_rate, 9600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pty_round_trip() {
        let (host, mut device) = serialport::TTYPort::pair().unwrap();
        device.set_timeout(Duration::from_secs(1)).unwrap();
        let mut channel =
            SerialBadgeChannel::from_port(Box::new(host), SerialConfig::new("pty")).unwrap();

        device.write_all(b"a1b2\r\n").unwrap();
        let mut line = None;
        for _ in 0..50 {
            line = channel.poll_line().await.unwrap();
            if line.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(line.as_deref(), Some("a1b2"));

        channel.acknowledge(Ack::Authorized).await.unwrap();
        let mut byte = [0u8; 1];
        device.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], b'1');
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig::new("/dev/badgegate-no-such-port");
        let error = SerialBadgeChannel::open(&config).unwrap_err();
        assert!(matches!(error, HardwareError::InitializationFailed { .. }));
    }
}
