//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy
//! tasks. The UART pump tasks move raw byte chunks; the controller task
//! consumes and produces them through channel-backed ports.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Size of one byte chunk moved between a UART task and the controller
pub const CHUNK_SIZE: usize = 64;

/// A chunk of raw UART bytes
pub type Chunk = Vec<u8, CHUNK_SIZE>;

/// Channel capacity for byte chunks on each link direction
const LINK_CHANNEL_SIZE: usize = 8;

/// Channel capacity for volume requests
const VOLUME_CHANNEL_SIZE: usize = 8;

/// A byte-chunk channel for one direction of one UART link
pub type LinkChannel = Channel<CriticalSectionRawMutex, Chunk, LINK_CHANNEL_SIZE>;

/// Bytes received from the Bluetooth module UART
pub static MODULE_RX: LinkChannel = Channel::new();

/// Bytes to transmit on the Bluetooth module UART
pub static MODULE_TX: LinkChannel = Channel::new();

/// Bytes received from the touch display UART
pub static PANEL_RX: LinkChannel = Channel::new();

/// Bytes to transmit on the touch display UART
pub static PANEL_TX: LinkChannel = Channel::new();

/// A request for the BLE volume collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VolumeRequest {
    Up,
    Down,
    Mute,
}

/// Volume requests from the controller to the collaborator task
pub static VOLUME_REQUESTS: Channel<CriticalSectionRawMutex, VolumeRequest, VOLUME_CHANNEL_SIZE> =
    Channel::new();
