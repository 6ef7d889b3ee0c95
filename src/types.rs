//! Types for RFID scanning

use std::fmt;

use thiserror::Error;

/// Last-accepted UID before any tag has been read
pub const NO_UID: &str = "00000000";

/// Classified reader response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Nothing came back within the read timeout
    NoResponse,
    /// Reader answered but no tag was in range
    CardNotDetected,
    /// Tag identifier, 6 uppercase hex characters
    Uid(String),
}

/// Lifecycle of a [`ScanLoop`](crate::ScanLoop)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No serial channel open
    Idle,
    /// Channel open, not polling
    Ready,
    /// Polling cycle running
    Scanning,
}

/// Status reported to a [`StatusSink`](crate::StatusSink)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Configured { port: String, position: String },
    PortError(String),
    /// Rejected operator-entered position
    InvalidPosition(String),
    Started,
    Stopped,
    TagAccepted(String),
    CardNotDetected,
    DuplicateSuppressed(String),
    PortDisconnected,
    CycleError(String),
    NotifySent { uid: String, status: u16 },
    NotifyFailed { uid: String, error: String },
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::Configured { port, position } => {
                write!(f, "Connected to port {} (position {})", port, position)
            }
            ScanEvent::PortError(msg) => write!(f, "Port error: {}", msg),
            ScanEvent::InvalidPosition(position) => {
                write!(f, "Invalid position {:?}: must be a number", position)
            }
            ScanEvent::Started => f.write_str("Scanning started"),
            ScanEvent::Stopped => f.write_str("Scanning stopped"),
            ScanEvent::TagAccepted(uid) => f.write_str(uid),
            ScanEvent::CardNotDetected => f.write_str("Card not detected"),
            ScanEvent::DuplicateSuppressed(_) => f.write_str("Duplicate data"),
            ScanEvent::PortDisconnected => f.write_str("Port disconnected"),
            ScanEvent::CycleError(msg) => write!(f, "Scan error: {}", msg),
            ScanEvent::NotifySent { status, .. } => write!(f, "API Response: {}", status),
            ScanEvent::NotifyFailed { error, .. } => write!(f, "API Error: {}", error),
        }
    }
}

/// Errors that can occur during RFID operations
#[derive(Debug, Error)]
pub enum UhfError {
    /// Command template is not a hex byte sequence
    #[error("invalid hex command template {template:?}: {reason}")]
    InvalidHex { template: String, reason: String },
    /// Serial channel could not be opened
    #[error("port error: {0}")]
    Port(String),
    /// Open channel stopped answering
    #[error("port disconnected")]
    PortDisconnected,
    /// Transport layer error (serial, mock, etc.)
    #[error("transport error: {0}")]
    Transport(String),
    /// Invalid parameter passed to a function
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Operation not allowed in the current state
    #[error("cannot {action} while {state:?}")]
    InvalidState { action: &'static str, state: ScanState },
}

/// Failure of a single notification attempt
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
