//! Serial port trait
//!
//! Abstracts over the two UART links (Bluetooth module, touch display)
//! so the controller can run against real hardware, channel-backed
//! adapters, or in-memory simulations.

/// Errors a serial port can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortError {
    /// Transient condition: the port cannot accept more data right now.
    /// The caller should retry on a later poll.
    Busy,
    /// Permanent condition: the port is gone and will not recover
    Closed,
}

impl PortError {
    /// Whether retrying later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Busy)
    }
}

/// Non-blocking byte-stream port.
///
/// Both methods must return immediately. `read` reports zero bytes when
/// nothing has arrived; `write` accepts a partial count when the transmit
/// buffer is nearly full, and [`PortError::Busy`] when it is completely
/// full.
pub trait SerialPort {
    /// Read available bytes into `buf`, returning how many were read
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PortError>;

    /// Write bytes from `buf`, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize, PortError>;
}
