//! Serial port transport for desktop using serialport crate

use crate::transport::RfidTransport;
use log::debug;
use std::io::ErrorKind;
use std::time::Duration;

/// Baud rate the reader ships with
pub const DEFAULT_BAUD_RATE: u32 = 57600;
/// Read timeout applied when the port is opened
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 100;
/// USB-serial bridge found on the supported readers
pub const DEFAULT_PORT_FILTER: &str = "CH340";

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, serialport::Error> {
        Self::with_timeout(port_name, baud_rate, DEFAULT_READ_TIMEOUT_MS)
    }

    pub fn with_timeout(port_name: &str, baud_rate: u32, timeout_ms: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(timeout_ms as u64))
            .open()?;
        port.clear(serialport::ClearBuffer::Input)?;
        debug!("Opened {} at {} baud", port_name, baud_rate);

        Ok(Self { port })
    }
}

impl RfidTransport for SerialTransport {
    type Error = std::io::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.port, data)
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        self.port
            .set_timeout(Duration::from_millis(timeout_ms as u64))
            .map_err(std::io::Error::other)?;
        match std::io::Read::read(&mut self.port, buf) {
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(std::io::Error::other)
    }
}

/// List serial ports whose USB product or manufacturer string contains `filter`.
/// An empty filter returns every port.
pub fn available_ports(filter: &str) -> Result<Vec<String>, serialport::Error> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .filter(|port| filter.is_empty() || port_matches(&port.port_type, filter))
        .map(|port| port.port_name)
        .collect())
}

fn port_matches(port_type: &serialport::SerialPortType, filter: &str) -> bool {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => [&info.product, &info.manufacturer]
            .into_iter()
            .flatten()
            .any(|s| s.contains(filter)),
        _ => false,
    }
}
