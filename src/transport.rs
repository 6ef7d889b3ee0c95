/// Byte channel to an RFID reader.
/// Implement this trait for different backends (serial port, test doubles, etc.)
///
/// Dropping the transport releases the underlying device.
pub trait RfidTransport: Send {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Write data to the transport
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read data with a timeout in milliseconds.
    /// Returns `Ok(0)` when nothing arrived before the timeout.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Discard anything left in the input buffer
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}
