//! Channel-backed port implementations
//!
//! The controller core sees non-blocking ports; these adapters map that
//! interface onto the static chunk channels fed by the UART tasks.

use ampbench_core::traits::{PortError, SerialPort, VolumeControl, VolumeDirection};

use crate::channels::{Chunk, LinkChannel, VolumeRequest, CHUNK_SIZE, VOLUME_REQUESTS};

/// A serial port backed by a pair of chunk channels
pub struct ChannelPort {
    rx: &'static LinkChannel,
    tx: &'static LinkChannel,
    /// Remainder of a received chunk the caller's buffer could not hold
    pending: Chunk,
    offset: usize,
}

impl ChannelPort {
    pub fn new(rx: &'static LinkChannel, tx: &'static LinkChannel) -> Self {
        Self {
            rx,
            tx,
            pending: Chunk::new(),
            offset: 0,
        }
    }
}

impl SerialPort for ChannelPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PortError> {
        let mut n = 0;
        loop {
            while self.offset < self.pending.len() && n < buf.len() {
                buf[n] = self.pending[self.offset];
                n += 1;
                self.offset += 1;
            }
            if n == buf.len() {
                return Ok(n);
            }
            match self.rx.try_receive() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                Err(_) => return Ok(n),
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, PortError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let take = buf.len().min(CHUNK_SIZE);
        let mut chunk = Chunk::new();
        // Cannot fail: take is clamped to the chunk capacity
        let _ = chunk.extend_from_slice(&buf[..take]);
        match self.tx.try_send(chunk) {
            Ok(()) => Ok(take),
            Err(_) => Err(PortError::Busy),
        }
    }
}

/// Volume collaborator backed by the request channel
pub struct ChannelVolume;

impl VolumeControl for ChannelVolume {
    fn send_volume(&mut self, direction: VolumeDirection) {
        let request = match direction {
            VolumeDirection::Up => VolumeRequest::Up,
            VolumeDirection::Down => VolumeRequest::Down,
        };
        // Fire-and-forget: a full channel means the collaborator is
        // already saturated with requests
        let _ = VOLUME_REQUESTS.try_send(request);
    }

    fn send_mute(&mut self) {
        let _ = VOLUME_REQUESTS.try_send(VolumeRequest::Mute);
    }
}
