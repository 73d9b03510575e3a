//! Bluetooth audio module protocol
//!
//! The module speaks an opaque binary protocol over UART. Commands and
//! events share one frame format; the subset implemented here covers power
//! (MMI actions), pairing, playback transport, equalizer presets, and AVRCP
//! track metadata.

pub mod avrcp;
pub mod command;
pub mod eq;
pub mod event;
pub mod frame;
