//! Touch display protocol
//!
//! The display speaks ASCII both ways, with every frame terminated by
//! `0xFF 0xFF 0xFF`. Outbound frames assign text-field properties
//! (`obj.txt="..."`); inbound frames are either action tokens from a fixed
//! vocabulary or a page-change notification (marker byte + page id).

pub mod text;
pub mod token;
