//! AVRCP response parsing and metadata reassembly
//!
//! The module tunnels AVRCP over two event opcodes: vendor responses
//! (play status, notifications) and vendor-dependent responses carrying
//! element-attribute fragments. A metadata response for a long title can
//! span several fragments; [`MetadataAssembler`] stitches them back into
//! one [`AttributeMap`].
//!
//! The assembler does not own a clock. A sequence whose final fragment
//! never arrives is held until a new first fragment supersedes it or the
//! caller applies its own timeout via [`MetadataAssembler::reset`].

use heapless::{String, Vec};

use super::command::PDU_GET_ELEMENT_ATTRIBUTES;

// Element attribute ids
pub const ATTR_TITLE: u32 = 1;
pub const ATTR_ARTIST: u32 = 2;
pub const ATTR_ALBUM: u32 = 3;
pub const ATTR_TRACK_NUMBER: u32 = 4;
pub const ATTR_TOTAL_TRACKS: u32 = 5;
pub const ATTR_GENRE: u32 = 6;
pub const ATTR_DURATION: u32 = 7;

/// Highest attribute id carried in an [`AttributeMap`]
pub const ATTR_ID_MAX: u32 = 7;

/// Maximum decoded text length per attribute
pub const ATTR_TEXT_MAX: usize = 64;

/// Reassembly buffer size (full attribute set for the longest metadata seen)
pub const REASSEMBLY_BUF_SIZE: usize = 512;

/// Header of an AVC vendor response: database index, PDU id, packet type,
/// and the PDU parameter bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorResponse<'a> {
    pub db: u8,
    pub pdu: u8,
    pub packet_type: u8,
    pub params: &'a [u8],
}

impl<'a> VendorResponse<'a> {
    /// Parse a vendor-response event payload, `None` if truncated
    pub fn parse(params: &'a [u8]) -> Option<Self> {
        // db byte, then a 6-byte company/header block, pdu, packet type,
        // 2-byte big-endian parameter length
        if params.len() < 11 {
            return None;
        }
        let db = params[0];
        let p = &params[1..];
        let pdu = p[6];
        let packet_type = p[7];
        let plen = u16::from_be_bytes([p[8], p[9]]) as usize;
        if p.len() < 10 + plen {
            return None;
        }
        Some(Self {
            db,
            pdu,
            packet_type,
            params: &p[10..10 + plen],
        })
    }
}

/// Decoded GetPlayStatus response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlayStatus {
    /// Track length in milliseconds (0xFFFFFFFF when unsupported)
    pub length_ms: u32,
    /// Playback position in milliseconds
    pub position_ms: u32,
    /// Transport status byte (stopped/playing/paused/...)
    pub status: u8,
}

impl PlayStatus {
    /// Parse GetPlayStatus PDU parameters, `None` if truncated
    pub fn parse(params: &[u8]) -> Option<Self> {
        if params.len() < 9 {
            return None;
        }
        Some(Self {
            length_ms: u32::from_be_bytes([params[0], params[1], params[2], params[3]]),
            position_ms: u32::from_be_bytes([params[4], params[5], params[6], params[7]]),
            status: params[8],
        })
    }
}

/// Decoded RegisterNotification response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// The current track changed; metadata should be re-fetched
    TrackChanged,
    /// Playback position update
    PlaybackPosChanged { position_ms: u32 },
    /// Any other registered event
    Other { event_id: u8 },
}

impl Notification {
    /// Parse RegisterNotification PDU parameters, `None` if empty
    pub fn parse(params: &[u8]) -> Option<Self> {
        let event_id = *params.first()?;
        Some(match event_id {
            0x02 => Notification::TrackChanged,
            0x05 if params.len() >= 5 => Notification::PlaybackPosChanged {
                position_ms: u32::from_be_bytes([params[1], params[2], params[3], params[4]]),
            },
            _ => Notification::Other { event_id },
        })
    }
}

/// One fragment of a (possibly multi-packet) element-attributes response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrFragment<'a> {
    /// AVRCP response code
    pub response: u8,
    /// Set on the last fragment of the sequence
    pub is_final: bool,
    /// Attribute record count; valid only on the final fragment
    pub attr_count: u8,
    /// Total reassembled length; valid only on the first fragment
    pub total_len: u16,
    /// This fragment's slice of the attribute records
    pub chunk: &'a [u8],
}

impl<'a> AttrFragment<'a> {
    /// Parse a vendor-dependent response payload into a fragment.
    ///
    /// Returns `None` for other PDU ids or truncated payloads.
    pub fn parse(params: &'a [u8]) -> Option<Self> {
        if params.len() < 7 || params[0] != PDU_GET_ELEMENT_ATTRIBUTES {
            return None;
        }
        // params[1] is reserved
        Some(Self {
            response: params[2],
            is_final: params[3] == 0x01,
            attr_count: params[4],
            total_len: u16::from_be_bytes([params[5], params[6]]),
            chunk: &params[7..],
        })
    }
}

/// Decoded element attributes, keyed by attribute id (1-7)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    values: [Option<String<ATTR_TEXT_MAX>>; ATTR_ID_MAX as usize],
}

impl AttributeMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded text for an attribute id, `None` if absent or out of range
    pub fn get(&self, id: u32) -> Option<&str> {
        if (1..=ATTR_ID_MAX).contains(&id) {
            self.values[(id - 1) as usize].as_deref()
        } else {
            None
        }
    }

    /// Track duration in milliseconds, parsed from the duration attribute
    pub fn duration_ms(&self) -> Option<u32> {
        self.get(ATTR_DURATION)?.trim().parse().ok()
    }

    /// Whether no attribute was decoded
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    fn set(&mut self, id: u32, raw: &[u8]) {
        if !(1..=ATTR_ID_MAX).contains(&id) {
            return;
        }
        let mut text = String::new();
        push_str_lossy(&mut text, raw);
        self.values[(id - 1) as usize] = Some(text);
    }
}

/// Append bytes as UTF-8, replacing invalid sequences instead of failing.
/// Text exceeding the string's capacity is truncated.
fn push_str_lossy<const N: usize>(dst: &mut String<N>, mut bytes: &[u8]) {
    loop {
        match core::str::from_utf8(bytes) {
            Ok(s) => {
                push_truncated(dst, s);
                return;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                // Safe: from_utf8 vouched for this prefix
                if let Ok(s) = core::str::from_utf8(valid) {
                    push_truncated(dst, s);
                }
                let _ = dst.push('\u{FFFD}');
                let skip = e.error_len().unwrap_or(rest.len());
                if skip >= rest.len() {
                    return;
                }
                bytes = &rest[skip..];
            }
        }
    }
}

fn push_truncated<const N: usize>(dst: &mut String<N>, s: &str) {
    for ch in s.chars() {
        if dst.push(ch).is_err() {
            return;
        }
    }
}

/// Reassembles multi-fragment element-attribute responses
#[derive(Debug, Clone, Default)]
pub struct MetadataAssembler {
    expected_len: Option<u16>,
    buf: Vec<u8, REASSEMBLY_BUF_SIZE>,
}

impl MetadataAssembler {
    /// Create an idle assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sequence is currently accumulating
    pub fn in_progress(&self) -> bool {
        self.expected_len.is_some()
    }

    /// Abandon any partially accumulated sequence
    pub fn reset(&mut self) {
        self.expected_len = None;
        self.buf.clear();
    }

    /// Feed one fragment; returns the completed map on the final fragment.
    ///
    /// The first fragment of a sequence (any fragment arriving while idle)
    /// captures the expected total length and implicitly abandons whatever
    /// a stalled previous sequence left behind.
    pub fn feed(&mut self, frag: &AttrFragment<'_>) -> Option<AttributeMap> {
        if self.expected_len.is_none() {
            self.expected_len = Some(frag.total_len);
            self.buf.clear();
        }

        // Accumulate; an overlong sequence is clamped and the truncation
        // below keeps record parsing within the declared length
        let room = REASSEMBLY_BUF_SIZE - self.buf.len();
        let take = frag.chunk.len().min(room);
        let _ = self.buf.extend_from_slice(&frag.chunk[..take]);

        if !frag.is_final {
            return None;
        }

        let expected = self.expected_len.take().unwrap_or(0) as usize;
        let len = self.buf.len().min(expected);
        let map = parse_records(&self.buf[..len], frag.attr_count);
        self.buf.clear();
        Some(map)
    }
}

/// Parse reassembled attribute records: 4-byte big-endian attribute id,
/// 2-byte big-endian value length, value bytes. Records with out-of-range
/// ids are skipped without aborting the rest.
fn parse_records(data: &[u8], attr_count: u8) -> AttributeMap {
    let mut map = AttributeMap::new();
    let mut idx = 0usize;

    for _ in 0..attr_count {
        if idx + 6 > data.len() {
            break;
        }
        let id = u32::from_be_bytes([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        let vlen = u16::from_be_bytes([data[idx + 4], data[idx + 5]]) as usize;
        idx += 6;
        if idx + vlen > data.len() {
            break;
        }
        map.set(id, &data[idx..idx + vlen]);
        idx += vlen;
    }

    map
}
