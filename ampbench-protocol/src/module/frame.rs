//! Frame encoding and decoding for the Bluetooth module protocol.
//!
//! Frame format:
//! - START (1 byte): 0xAA synchronization byte
//! - LENGTH (2 bytes): big-endian, counts opcode + payload
//! - OPCODE (1 byte): command or event identifier
//! - PAYLOAD (0-250 bytes): opcode-specific data
//! - CHECKSUM (1 byte): makes the sum of LENGTH, OPCODE, PAYLOAD and
//!   CHECKSUM bytes zero mod 256
//!
//! The decoder never blocks: it accumulates whatever bytes have arrived and
//! emits frames once they are complete. On a checksum mismatch only the
//! leading START byte is discarded, so a valid frame hiding inside the
//! corrupted span is still found.

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xAA;

/// Maximum payload size in bytes (opcode excluded)
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Maximum complete frame size (START + LENGTH + OPCODE + MAX_PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 1 + 2 + 1 + MAX_PAYLOAD_SIZE + 1;

/// Rolling receive buffer size. Sized for several max-length frames so a
/// burst arriving between polls is not lost.
pub const RX_BUFFER_SIZE: usize = 1024;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Opcode (command or event identifier)
    pub opcode: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given opcode and payload
    pub fn new(opcode: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            opcode,
            payload: payload_vec,
        })
    }

    /// Create a frame with no payload
    pub fn empty(opcode: u8) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    /// Calculate the checksum over length bytes, opcode, and payload.
    ///
    /// Two's complement of the byte sum: adding the checksum to the sum of
    /// the covered bytes yields zero mod 256.
    fn calculate_checksum(len_hi: u8, len_lo: u8, opcode: u8, payload: &[u8]) -> u8 {
        let mut sum = len_hi.wrapping_add(len_lo).wrapping_add(opcode);
        for &byte in payload {
            sum = sum.wrapping_add(byte);
        }
        0u8.wrapping_sub(sum)
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = 5 + self.payload.len(); // START + LENGTH(2) + OPCODE + payload + CHECKSUM
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = (self.payload.len() + 1) as u16; // opcode counts toward length
        let len_hi = (length >> 8) as u8;
        let len_lo = length as u8;
        let checksum = Self::calculate_checksum(len_hi, len_lo, self.opcode, &self.payload);

        buffer[0] = FRAME_START;
        buffer[1] = len_hi;
        buffer[2] = len_lo;
        buffer[3] = self.opcode;
        buffer[4..4 + self.payload.len()].copy_from_slice(&self.payload);
        buffer[4 + self.payload.len()] = checksum;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Incremental frame decoder over a rolling byte buffer
///
/// Bytes are appended with [`extend`](FrameDecoder::extend) (or via
/// [`feed`](FrameDecoder::feed)) and complete frames are drained with
/// [`poll`](FrameDecoder::poll). Incomplete input is held until more bytes
/// arrive; it is never an error.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    buf: Vec<u8, RX_BUFFER_SIZE>,
    checksum_errors: u32,
}

impl FrameDecoder {
    /// Create a new decoder with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes to the rolling buffer.
    ///
    /// If the buffer would overflow, the oldest bytes are discarded; the
    /// resync scan recovers framing from whatever remains.
    pub fn extend(&mut self, bytes: &[u8]) {
        let bytes = if bytes.len() > RX_BUFFER_SIZE {
            &bytes[bytes.len() - RX_BUFFER_SIZE..]
        } else {
            bytes
        };

        let free = RX_BUFFER_SIZE - self.buf.len();
        if bytes.len() > free {
            self.consume(bytes.len() - free);
        }
        // Cannot fail: room was just made
        let _ = self.buf.extend_from_slice(bytes);
    }

    /// Append bytes and iterate the frames they complete
    pub fn feed<'d>(&'d mut self, bytes: &[u8]) -> FrameIter<'d> {
        self.extend(bytes);
        FrameIter { decoder: self }
    }

    /// Try to extract the next complete frame from the buffer.
    ///
    /// Returns `None` when the buffer holds no complete frame (more bytes
    /// are needed), `Some(Err(..))` when a frame failed its checksum (one
    /// byte has been discarded and scanning continues on the next call),
    /// and `Some(Ok(frame))` for each valid frame.
    pub fn poll(&mut self) -> Option<Result<Frame, FrameError>> {
        loop {
            let start = match self.buf.iter().position(|&b| b == FRAME_START) {
                Some(i) => i,
                None => {
                    // Nothing usable buffered
                    self.buf.clear();
                    return None;
                }
            };
            if start > 0 {
                self.consume(start);
            }

            // Need START + LENGTH(2) + OPCODE before any further decision
            if self.buf.len() < 4 {
                return None;
            }

            let declared = ((self.buf[1] as usize) << 8) | self.buf[2] as usize;
            if declared == 0 || declared > MAX_PAYLOAD_SIZE + 1 {
                // Length field is nonsense, so this 0xAA was not a frame start
                self.consume(1);
                continue;
            }

            let total = 3 + declared + 1;
            if self.buf.len() < total {
                // Partial frame: hold and wait for more input
                return None;
            }

            let sum = self.buf[1..total]
                .iter()
                .fold(0u8, |acc, &b| acc.wrapping_add(b));
            if sum != 0 {
                self.checksum_errors = self.checksum_errors.wrapping_add(1);
                // Drop the leading marker only; the next valid frame may
                // start inside the corrupted span
                self.consume(1);
                return Some(Err(FrameError::InvalidChecksum));
            }

            let opcode = self.buf[3];
            let mut payload = Vec::new();
            // Cannot fail: declared - 1 <= MAX_PAYLOAD_SIZE checked above
            let _ = payload.extend_from_slice(&self.buf[4..3 + declared]);
            self.consume(total);
            return Some(Ok(Frame { opcode, payload }));
        }
    }

    /// Number of checksum failures seen since construction
    pub fn checksum_errors(&self) -> u32 {
        self.checksum_errors
    }

    /// Number of bytes currently held in the rolling buffer
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Remove `n` bytes from the front of the buffer
    fn consume(&mut self, n: usize) {
        let len = self.buf.len();
        let n = n.min(len);
        self.buf.as_mut_slice().copy_within(n..len, 0);
        self.buf.truncate(len - n);
    }
}

/// Iterator over frames completed by a [`FrameDecoder::feed`] call
pub struct FrameIter<'d> {
    decoder: &'d mut FrameDecoder,
}

impl Iterator for FrameIter<'_> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encode_no_payload() {
        let frame = Frame::empty(0x0F); // READ_BD_ADDR
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 5);
        assert_eq!(buffer[0], FRAME_START);
        assert_eq!(buffer[1], 0x00); // len_hi
        assert_eq!(buffer[2], 0x01); // len_lo (opcode only)
        assert_eq!(buffer[3], 0x0F); // opcode
        assert_eq!(buffer[4], 0xF0); // checksum: -(0x00 + 0x01 + 0x0F)
    }

    #[test]
    fn test_frame_encode_with_payload() {
        let frame = Frame::new(0x02, &[0x00, 0x51]).unwrap(); // MMI action
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 7);
        assert_eq!(buffer[1], 0x00);
        assert_eq!(buffer[2], 0x03); // opcode + 2 payload bytes
        assert_eq!(buffer[3], 0x02);
        assert_eq!(buffer[4], 0x00);
        assert_eq!(buffer[5], 0x51);
        // Sum of bytes after the marker must be zero mod 256
        let sum: u8 = buffer[1..7].iter().fold(0u8, |a, &b| a.wrapping_add(b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::new(0x1C, &[0x05, 0x00]).unwrap();
        let encoded = original.encode_to_vec().unwrap();

        let mut decoder = FrameDecoder::new();
        let parsed = decoder.feed(&encoded).next().unwrap().unwrap();

        assert_eq!(parsed.opcode, original.opcode);
        assert_eq!(parsed.payload, original.payload);
    }

    #[test]
    fn test_decoder_split_across_boundaries() {
        let frame = Frame::new(0x01, &[0x06]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();

        let mut decoder = FrameDecoder::new();
        // Feed one byte at a time; the frame completes only on the last
        for &byte in &encoded[..encoded.len() - 1] {
            assert!(decoder.feed(&[byte]).next().is_none());
        }
        let parsed = decoder
            .feed(&encoded[encoded.len() - 1..])
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(parsed.opcode, 0x01);
        assert_eq!(parsed.payload.as_slice(), &[0x06]);
    }

    #[test]
    fn test_decoder_resync_after_garbage() {
        let frame = Frame::empty(0x14);
        let encoded = frame.encode_to_vec().unwrap();

        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x12, 0x34]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut decoder = FrameDecoder::new();
        let parsed = decoder.feed(&data).next().unwrap().unwrap();
        assert_eq!(parsed.opcode, 0x14);
    }

    #[test]
    fn test_decoder_checksum_failure_single_byte_discard() {
        let good = Frame::new(0x01, &[0x06]).unwrap();
        let mut corrupted = good.encode_to_vec().unwrap();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        let valid = Frame::new(0x10, &[0x02]).unwrap();
        let encoded_valid = valid.encode_to_vec().unwrap();

        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&corrupted).unwrap();
        data.extend_from_slice(&encoded_valid).unwrap();

        let mut decoder = FrameDecoder::new();
        let results: Vec<Result<Frame, FrameError>, 8> = decoder.feed(&data).collect();

        // Exactly one decoded frame: the valid one
        let frames: Vec<&Frame, 8> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, 0x10);
        assert_eq!(decoder.checksum_errors(), 1);
    }

    #[test]
    fn test_decoder_junk_only_clears_buffer() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&[0x01, 0x02, 0x03, 0xFF]).next().is_none());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_bogus_length_resyncs() {
        // 0xAA followed by an impossible length, then a valid frame
        let valid = Frame::empty(0x0F);
        let encoded = valid.encode_to_vec().unwrap();

        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&[FRAME_START, 0xFF, 0xFF]).unwrap();
        data.extend_from_slice(&encoded).unwrap();

        let mut decoder = FrameDecoder::new();
        let parsed = decoder.feed(&data).find_map(|r| r.ok()).unwrap();
        assert_eq!(parsed.opcode, 0x0F);
    }

    #[test]
    fn test_decoder_multiple_frames_one_feed() {
        let a = Frame::new(0x01, &[0x06]).unwrap();
        let b = Frame::new(0x10, &[0x03]).unwrap();

        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(&a.encode_to_vec().unwrap()).unwrap();
        data.extend_from_slice(&b.encode_to_vec().unwrap()).unwrap();

        let mut decoder = FrameDecoder::new();
        let frames: Vec<Frame, 4> = decoder.feed(&data).filter_map(|r| r.ok()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].opcode, 0x01);
        assert_eq!(frames[1].opcode, 0x10);
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::new(0x02, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }
}
