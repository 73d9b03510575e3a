//! Volume collaborator trait
//!
//! Volume never touches the Bluetooth module: it is relayed to a separate
//! BLE collaborator that emits consumer-control reports to the connected
//! phone. The relay is fire-and-forget; a dropped report is not an error
//! the controller can act on.

/// Volume adjustment direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VolumeDirection {
    Up,
    Down,
}

/// Trait for the BLE volume collaborator
pub trait VolumeControl {
    /// Request a single volume step in the given direction
    fn send_volume(&mut self, direction: VolumeDirection);

    /// Request a mute toggle
    fn send_mute(&mut self);
}
