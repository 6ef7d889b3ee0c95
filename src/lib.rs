//! Polling scanner for serial UHF RFID readers.
//!
//! Sends a CRC16-framed inventory command on a fixed interval, classifies
//! each reply, suppresses repeated reads of the same tag and forwards every
//! new tag to a [`StatusSink`] and, optionally, a [`Notifier`].
//!
//! # Features
//!
//! - `serial` - Serial port transport for desktop using serialport crate
//! - `http` - HTTP GET notifier using reqwest
//! - `cli` - the `uhf-scan` binary
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use uhf_scan::{LogSink, ScanLoop, ScanOptions, SerialTransport};
//!
//! let mut scanner: ScanLoop<SerialTransport> = ScanLoop::new(ScanOptions::default(), Arc::new(LogSink))?;
//! scanner.configure_serial("/dev/ttyUSB0", "7")?;
//! scanner.start()?;
//! ```

pub mod codec;
pub mod config;
mod notifier;
mod scanner;
mod transport;
mod types;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use codec::{crc16, decode, encode, encode_hex, parse_hex, CommandSet, BROADCAST_ADDRESS};
pub use config::{ConfigError, NotifierConfig, ReaderConfig, ScanConfig};
pub use notifier::Notifier;
pub use scanner::{LogSink, ScanLoop, ScanOptions, Session, StatusSink};
pub use transport::RfidTransport;
pub use types::{NotifyError, ResponseOutcome, ScanEvent, ScanState, UhfError, NO_UID};

#[cfg(feature = "http")]
pub use notifier::HttpNotifier;

#[cfg(feature = "serial")]
pub use serial::{available_ports, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_PORT_FILTER, DEFAULT_READ_TIMEOUT_MS};
