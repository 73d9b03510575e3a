//! In-memory port and collaborator implementations
//!
//! The whole controller runs against these under test: bytes the
//! "hardware" would deliver are injected with [`SimPort::inject`], and
//! everything the controller wrote is inspected with
//! [`SimPort::take_written`].

use heapless::{Deque, Vec};

use crate::traits::{PortError, SerialPort, VolumeControl, VolumeDirection};

const SIM_BUF: usize = 2048;

/// Simulated serial port backed by in-memory queues
#[derive(Debug, Default)]
pub struct SimPort {
    rx: Deque<u8, SIM_BUF>,
    tx: Vec<u8, SIM_BUF>,
    busy: bool,
    closed: bool,
}

impl SimPort {
    /// Create an open, idle port
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the controller to read
    pub fn inject(&mut self, bytes: &[u8]) {
        for &b in bytes {
            // Oldest bytes drop first on overflow, like a real FIFO overrun
            if self.rx.push_back(b).is_err() {
                self.rx.pop_front();
                let _ = self.rx.push_back(b);
            }
        }
    }

    /// Drain and return everything the controller wrote
    pub fn take_written(&mut self) -> Vec<u8, SIM_BUF> {
        core::mem::take(&mut self.tx)
    }

    /// Bytes written and not yet taken
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Make writes fail with [`PortError::Busy`] until cleared
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Make all operations fail with [`PortError::Closed`]
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl SerialPort for SimPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PortError> {
        if self.closed {
            return Err(PortError::Closed);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, PortError> {
        if self.closed {
            return Err(PortError::Closed);
        }
        if self.busy {
            return Err(PortError::Busy);
        }
        let free = SIM_BUF - self.tx.len();
        let n = buf.len().min(free);
        if n == 0 && !buf.is_empty() {
            return Err(PortError::Busy);
        }
        let _ = self.tx.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// Recorded volume collaborator call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeCall {
    Volume(VolumeDirection),
    Mute,
}

/// Simulated volume collaborator that records every call
#[derive(Debug, Default)]
pub struct SimVolume {
    calls: Vec<VolumeCall, 32>,
}

impl SimVolume {
    /// Create a collaborator with no recorded calls
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> &[VolumeCall] {
        &self.calls
    }
}

impl VolumeControl for SimVolume {
    fn send_volume(&mut self, direction: VolumeDirection) {
        let _ = self.calls.push(VolumeCall::Volume(direction));
    }

    fn send_mute(&mut self) {
        let _ = self.calls.push(VolumeCall::Mute);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_then_read() {
        let mut port = SimPort::new();
        port.inject(&[1, 2, 3]);

        let mut buf = [0u8; 8];
        assert_eq!(port.read(&mut buf), Ok(3));
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(port.read(&mut buf), Ok(0));
    }

    #[test]
    fn test_write_captured() {
        let mut port = SimPort::new();
        assert_eq!(port.write(b"abc"), Ok(3));
        assert_eq!(port.take_written().as_slice(), b"abc");
        assert!(port.written().is_empty());
    }

    #[test]
    fn test_busy_and_closed() {
        let mut port = SimPort::new();
        port.set_busy(true);
        assert_eq!(port.write(b"x"), Err(PortError::Busy));
        assert!(PortError::Busy.is_transient());

        port.close();
        let mut buf = [0u8; 1];
        assert_eq!(port.read(&mut buf), Err(PortError::Closed));
        assert!(!PortError::Closed.is_transient());
    }
}
