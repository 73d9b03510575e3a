//! Hardware abstraction traits
//!
//! These traits define the interface between the controller logic and
//! hardware-specific implementations.

pub mod port;
pub mod volume;

pub use port::{PortError, SerialPort};
pub use volume::{VolumeControl, VolumeDirection};
