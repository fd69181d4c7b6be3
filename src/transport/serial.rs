//! Serial port transport
//!
//! Wraps a `serialport::SerialPort`. Reads never block: the number of bytes
//! waiting in the OS buffer is queried first and only that many are read.
//! Writes temporarily switch the port timeout to the caller's deadline.

use super::Transport;
use crate::config::SerialConfig;
use crate::error::{PlotterError, Result};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// Transport backed by a real serial port
pub struct SerialTransport {
    /// Port settings
    config: SerialConfig,
    /// Open port handle
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create a closed transport for the given settings
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }

    /// Port settings
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.config.read_timeout_ms)
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| PlotterError::Transport(format!("{} is not open", self.config.port)))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .timeout(self.read_timeout())
            .open()?;
        tracing::info!(
            "Opened {} @ {} baud",
            self.config.port,
            self.config.baud_rate
        );

        // Many boards reset when the port opens; give them time to boot
        if self.config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.settle_ms));
        }

        self.port = Some(port);
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let port = self.port_mut()?;
        let waiting = port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; waiting];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8], deadline: Duration) -> Result<()> {
        let read_timeout = self.read_timeout();
        let port = self.port_mut()?;
        port.set_timeout(deadline)?;

        let result = port.write_all(data).and_then(|()| port.flush());

        if let Err(e) = port.set_timeout(read_timeout) {
            tracing::warn!("Failed to restore read timeout: {}", e);
        }

        result.map_err(|e| match e.kind() {
            ErrorKind::TimedOut => PlotterError::WriteTimeout(deadline),
            _ => PlotterError::Io(e),
        })
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Closed {}", self.config.port);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn name(&self) -> String {
        self.config.port.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_transport_reports_errors() {
        let mut transport = SerialTransport::new(SerialConfig::new("/dev/does-not-exist", 9600));
        assert!(!transport.is_open());
        assert!(transport.read_available().is_err());
        assert!(transport
            .write(b"hi\r\n", Duration::from_millis(10))
            .is_err());
        transport.close();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_open_without_port_is_config_error() {
        let mut transport = SerialTransport::new(SerialConfig::default());
        let err = transport.open().unwrap_err();
        assert_eq!(err.config_field(), Some("port"));
    }
}
