//! Board-agnostic controller logic for the Bluetooth amplifier firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Port and collaborator traits (serial links, BLE volume)
//! - Bluetooth module session state machine (power, connection, EQ,
//!   play-status polling, metadata reassembly)
//! - Paced display command queue and page-aware display state
//! - The orchestrator tying display input to module commands
//! - Simulated ports for host-side testing

#![no_std]
#![deny(unsafe_code)]

pub mod orchestrator;
pub mod panel;
pub mod queue;
pub mod session;
pub mod sim;
pub mod traits;

pub use orchestrator::{Orchestrator, OrchestratorStats};
pub use panel::PanelView;
pub use queue::CommandQueue;
pub use session::{ModuleSession, SessionUpdate};
pub use traits::{PortError, SerialPort, VolumeControl, VolumeDirection};
