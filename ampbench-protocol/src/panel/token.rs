//! Action token extraction from the display's byte stream
//!
//! Frames are delimited by the 3-byte terminator. A frame starting with the
//! page marker is a page-change notification; anything else must pass the
//! token charset (A-Z, 0-9, underscore, space) and match the vocabulary
//! exactly. Line noise — common while the display boots — fails validation
//! and is silently discarded. Accepted tokens are debounced: a repeat
//! within the debounce window of the last acceptance is suppressed.

use heapless::Vec;

use crate::module::eq::EqPreset;

/// Frame terminator on both directions of the display link
pub const TERMINATOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// First byte of a page-change notification frame
pub const PAGE_MARKER: u8 = 0x66;

/// Repeated-token suppression window
pub const DEBOUNCE_MS: u64 = 100;

/// Rolling receive buffer size
pub const RX_BUFFER_SIZE: usize = 256;

/// Maximum inputs surfaced per feed call; the rest stay buffered
pub const MAX_INPUTS: usize = 6;

/// A validated action token from the display's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Token {
    /// `BT_POWER`: toggle module power
    Power,
    /// `BT_PAIR`: enter pairing mode
    Pair,
    /// `BT_PLAY`: play/pause toggle
    Play,
    /// `BT_NEXT`: cycle to the next equalizer preset
    Next,
    /// `BT_PREV`: previous track
    Prev,
    /// `BT_VOLUP`: volume up (BLE collaborator)
    VolumeUp,
    /// `BT_VOLDN`: volume down (BLE collaborator)
    VolumeDown,
    /// `EQ_*`: select a specific equalizer preset
    Eq(EqPreset),
}

impl Token {
    /// Exact vocabulary match; no substring matching, so embedded text
    /// cannot be misread as an action
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Some(match bytes {
            b"BT_POWER" => Token::Power,
            b"BT_PAIR" => Token::Pair,
            b"BT_PLAY" => Token::Play,
            b"BT_NEXT" => Token::Next,
            b"BT_PREV" => Token::Prev,
            b"BT_VOLUP" => Token::VolumeUp,
            b"BT_VOLDN" => Token::VolumeDown,
            b"EQ_OFF" => Token::Eq(EqPreset::Off),
            b"EQ_SOFT" => Token::Eq(EqPreset::Soft),
            b"EQ_BASS" => Token::Eq(EqPreset::Bass),
            b"EQ_TREBLE" => Token::Eq(EqPreset::Treble),
            b"EQ_CLASSICAL" => Token::Eq(EqPreset::Classical),
            b"EQ_ROCK" => Token::Eq(EqPreset::Rock),
            b"EQ_JAZZ" => Token::Eq(EqPreset::Jazz),
            b"EQ_POP" => Token::Eq(EqPreset::Pop),
            b"EQ_DANCE" => Token::Eq(EqPreset::Dance),
            b"EQ_RNB" => Token::Eq(EqPreset::Rnb),
            b"EQ_USER" => Token::Eq(EqPreset::User),
            _ => return None,
        })
    }
}

/// One input extracted from the display stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelInput {
    /// An accepted (debounced) action token
    Token(Token),
    /// The display switched to another page
    PageChange(u8),
}

/// Whether a byte belongs to the token charset (A-Z, 0-9, `_`, space)
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_' || b == b' '
}

/// Incremental token parser with debounce
#[derive(Debug, Clone, Default)]
pub struct TokenParser {
    buf: Vec<u8, RX_BUFFER_SIZE>,
    last_token: Option<Token>,
    last_token_at: u64,
    invalid_frames: u32,
    unknown_tokens: u32,
}

impl TokenParser {
    /// Create a parser with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes; returns the inputs completed by them.
    ///
    /// `now_ms` is a monotonic timestamp used for debounce. Frames beyond
    /// [`MAX_INPUTS`] stay buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8], now_ms: u64) -> Vec<PanelInput, MAX_INPUTS> {
        self.extend(bytes);

        let mut inputs = Vec::new();
        while !inputs.is_full() {
            let Some(end) = self.find_terminator() else {
                break;
            };

            let mut frame = [0u8; RX_BUFFER_SIZE];
            frame[..end].copy_from_slice(&self.buf[..end]);
            self.consume(end + TERMINATOR.len());
            let frame = &frame[..end];

            if frame.len() >= 2 && frame[0] == PAGE_MARKER {
                // Cannot fail: inputs is not full (loop condition)
                let _ = inputs.push(PanelInput::PageChange(frame[1]));
                continue;
            }

            if let Some(token) = self.validate(frame) {
                if self.debounced(token, now_ms) {
                    continue;
                }
                self.last_token = Some(token);
                self.last_token_at = now_ms;
                let _ = inputs.push(PanelInput::Token(token));
            }
        }

        inputs
    }

    /// Frames that failed charset validation (line noise)
    pub fn invalid_frames(&self) -> u32 {
        self.invalid_frames
    }

    /// Charset-valid frames that matched no vocabulary entry
    pub fn unknown_tokens(&self) -> u32 {
        self.unknown_tokens
    }

    fn extend(&mut self, bytes: &[u8]) {
        let bytes = if bytes.len() > RX_BUFFER_SIZE {
            &bytes[bytes.len() - RX_BUFFER_SIZE..]
        } else {
            bytes
        };
        let free = RX_BUFFER_SIZE - self.buf.len();
        if bytes.len() > free {
            self.consume(bytes.len() - free);
        }
        let _ = self.buf.extend_from_slice(bytes);
    }

    fn find_terminator(&self) -> Option<usize> {
        self.buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
    }

    fn consume(&mut self, n: usize) {
        let len = self.buf.len();
        let n = n.min(len);
        self.buf.as_mut_slice().copy_within(n..len, 0);
        self.buf.truncate(len - n);
    }

    /// Validate a frame against the charset and vocabulary.
    ///
    /// Boot noise often precedes the token within the same frame, so bytes
    /// before the first charset byte are skipped before validation.
    fn validate(&mut self, frame: &[u8]) -> Option<Token> {
        let Some(start) = frame.iter().position(|&b| is_token_byte(b)) else {
            if !frame.is_empty() {
                self.invalid_frames = self.invalid_frames.wrapping_add(1);
            }
            return None;
        };
        let candidate = &frame[start..];

        if !candidate.iter().all(|&b| is_token_byte(b)) {
            self.invalid_frames = self.invalid_frames.wrapping_add(1);
            return None;
        }

        // Trim padding spaces; the charset admits them but the vocabulary
        // match is exact
        let trimmed = trim_spaces(candidate);
        match Token::from_bytes(trimmed) {
            Some(token) => Some(token),
            None => {
                self.unknown_tokens = self.unknown_tokens.wrapping_add(1);
                None
            }
        }
    }

    fn debounced(&self, token: Token, now_ms: u64) -> bool {
        self.last_token == Some(token)
            && now_ms.saturating_sub(self.last_token_at) < DEBOUNCE_MS
    }
}

fn trim_spaces(mut bytes: &[u8]) -> &[u8] {
    while let [b' ', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' '] = bytes {
        bytes = rest;
    }
    bytes
}
