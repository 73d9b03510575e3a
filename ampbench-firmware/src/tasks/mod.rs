//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod controller;
pub mod module_link;
pub mod panel_link;
pub mod volume;

pub use controller::controller_task;
pub use module_link::{module_rx_task, module_tx_task};
pub use panel_link::{panel_rx_task, panel_tx_task};
pub use volume::volume_task;
