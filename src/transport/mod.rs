//! Byte transports feeding an ingest session
//!
//! This module provides a common trait for everything an
//! [`IngestSession`](crate::ingest::IngestSession) can read from, enabling
//! both real serial ports (via the `serialport` crate) and scripted in-memory
//! transports for tests and demos.
//!
//! # Components
//!
//! - [`Transport`] - The trait the reader thread and `send` operate on
//! - [`SerialTransport`] - `serialport`-backed implementation
//! - [`ScriptedTransport`] / [`ScriptedHandle`] - in-memory transport driven
//!   from another thread
//! - [`available_ports`] - Enumerate serial ports on this machine

pub mod scripted;
pub mod serial;

pub use scripted::{ScriptedHandle, ScriptedTransport, SignalPattern};
pub use serial::SerialTransport;

use crate::error::Result;
use std::time::Duration;

/// Unified interface for byte-stream transports
///
/// Implementations must be `Send`: the reader thread calls
/// [`read_available`](Transport::read_available) while the presentation side
/// calls [`write`](Transport::write), serialized by the session's lock.
///
/// # Example
///
/// ```ignore
/// fn drain(transport: &mut dyn Transport) -> Result<Vec<u8>> {
///     let mut all = Vec::new();
///     loop {
///         let chunk = transport.read_available()?;
///         if chunk.is_empty() {
///             return Ok(all);
///         }
///         all.extend(chunk);
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Open the underlying device
    fn open(&mut self) -> Result<()>;

    /// Return whatever bytes are available right now, possibly none.
    ///
    /// Must not block waiting for data.
    fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Write all of `data`, failing with
    /// [`PlotterError::WriteTimeout`](crate::PlotterError::WriteTimeout) if the
    /// device does not accept it within `deadline`
    fn write(&mut self, data: &[u8], deadline: Duration) -> Result<()>;

    /// Close the device; closing a closed transport is a no-op
    fn close(&mut self);

    /// Check whether the device is open
    fn is_open(&self) -> bool;

    /// Short human readable name used in logs
    fn name(&self) -> String;
}

/// Information about a serial port found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device name to pass to [`SerialConfig`](crate::config::SerialConfig)
    pub name: String,
    /// USB identification, when the port is a USB device
    pub usb: Option<UsbPortInfo>,
}

/// USB details of a serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbPortInfo {
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
    /// Serial number (if available)
    pub serial_number: Option<String>,
    /// Product string (if available)
    pub product: Option<String>,
}

impl PortInfo {
    /// Get a display-friendly name for this port
    pub fn display_name(&self) -> String {
        match &self.usb {
            Some(usb) => {
                let product = usb.product.as_deref().unwrap_or("USB serial");
                match &usb.serial_number {
                    Some(serial) => format!(
                        "{} - {} ({:04x}:{:04x}) - {}",
                        self.name, product, usb.vendor_id, usb.product_id, serial
                    ),
                    None => format!(
                        "{} - {} ({:04x}:{:04x})",
                        self.name, product, usb.vendor_id, usb.product_id
                    ),
                }
            }
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let usb = match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Some(UsbPortInfo {
                vendor_id: usb.vid,
                product_id: usb.pid,
                serial_number: usb.serial_number,
                product: usb.product,
            }),
            _ => None,
        };
        Self {
            name: info.port_name,
            usb,
        }
    }
}

/// List the serial ports available on this machine
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    tracing::debug!("Found {} serial ports", ports.len());
    Ok(ports.into_iter().map(PortInfo::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_display_name() {
        let plain = PortInfo {
            name: "/dev/ttyS0".into(),
            usb: None,
        };
        assert_eq!(plain.to_string(), "/dev/ttyS0");

        let usb = PortInfo {
            name: "COM3".into(),
            usb: Some(UsbPortInfo {
                vendor_id: 0x0483,
                product_id: 0x5740,
                serial_number: Some("ABC123".into()),
                product: Some("STM32 VCP".into()),
            }),
        };
        assert_eq!(usb.display_name(), "COM3 - STM32 VCP (0483:5740) - ABC123");
    }

    #[test]
    fn test_port_info_from_driver() {
        let info = serialport::SerialPortInfo {
            port_name: "/dev/ttyACM0".into(),
            port_type: serialport::SerialPortType::UsbPort(serialport::UsbPortInfo {
                vid: 0x2341,
                pid: 0x0043,
                serial_number: None,
                manufacturer: None,
                product: None,
            }),
        };
        let port = PortInfo::from(info);
        assert_eq!(port.name, "/dev/ttyACM0");
        assert_eq!(
            port.display_name(),
            "/dev/ttyACM0 - USB serial (2341:0043)"
        );
    }
}
