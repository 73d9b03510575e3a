//! BLE volume collaborator task
//!
//! The collaborator is a separate BLE module wired to three request
//! lines. A short pulse on a line triggers one consumer-control report
//! (volume step or mute) to the connected phone. Volume never touches
//! the Bluetooth audio module.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::Timer;

use crate::channels::{VolumeRequest, VOLUME_REQUESTS};

/// Request line pulse width
const PULSE_MS: u64 = 50;

/// Minimum gap between pulses
const PULSE_GAP_MS: u64 = 30;

/// Volume task - pulses the collaborator request lines
#[embassy_executor::task]
pub async fn volume_task(
    mut up: Output<'static>,
    mut down: Output<'static>,
    mut mute: Output<'static>,
) {
    info!("Volume task started");

    loop {
        let request = VOLUME_REQUESTS.receive().await;
        debug!("Volume request: {:?}", request);

        let line = match request {
            VolumeRequest::Up => &mut up,
            VolumeRequest::Down => &mut down,
            VolumeRequest::Mute => &mut mute,
        };
        line.set_high();
        Timer::after_millis(PULSE_MS).await;
        line.set_low();
        Timer::after_millis(PULSE_GAP_MS).await;
    }
}
