//! Wire protocols for the ampbench remote
//!
//! This crate defines the two serial protocols the controller speaks:
//!
//! - [`module`]: the Bluetooth audio module's binary UART protocol.
//!   Checksummed frames, command construction, event classification, and
//!   AVRCP metadata reassembly.
//! - [`panel`]: the touch display's ASCII protocol. Terminator-delimited
//!   action tokens with debounce, page-change notifications, and outbound
//!   text commands.
//!
//! # Module frame format
//!
//! ```text
//! ┌───────┬────────┬────────┬────────┬─────────────┬──────────┐
//! │ START │ LEN_HI │ LEN_LO │ OPCODE │ PAYLOAD     │ CHECKSUM │
//! │ 0xAA  │ 1B     │ 1B     │ 1B     │ 0–250B      │ 1B       │
//! └───────┴────────┴────────┴────────┴─────────────┴──────────┘
//! ```
//!
//! The 16-bit big-endian length counts opcode + payload. The checksum makes
//! the byte sum from LEN_HI through CHECKSUM zero mod 256.
//!
//! Both parsers operate on rolling buffers: bytes may arrive split across
//! any boundary, and corruption is recovered by resynchronizing without
//! discarding bytes that may start the next valid frame.

#![no_std]
#![deny(unsafe_code)]

pub mod module;
pub mod panel;

pub use module::avrcp::{AttrFragment, AttributeMap, MetadataAssembler};
pub use module::command::ModuleCommand;
pub use module::eq::EqPreset;
pub use module::event::ModuleEvent;
pub use module::frame::{Frame, FrameDecoder, FrameError, FRAME_START, MAX_PAYLOAD_SIZE};
pub use panel::token::{PanelInput, Token, TokenParser};
