//! ampbench - Bluetooth amplifier bench controller firmware
//!
//! Main firmware binary for RP2040-based boards. Bridges a Bluetooth
//! audio module (binary framed UART) and a touch display (ASCII token
//! UART), with volume relayed to a separate BLE collaborator.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{UART0, UART1};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

mod channels;
mod ports;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

// Static cells for UART buffers (must live forever)
static MODULE_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static MODULE_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static PANEL_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static PANEL_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ampbench firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Bluetooth module on UART0, 115200 8N1
    let mut module_config = UartConfig::default();
    module_config.baudrate = 115_200;
    let module_uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, module_config);
    let module_uart = module_uart.into_buffered(
        Irqs,
        MODULE_TX_BUF.init([0u8; 256]),
        MODULE_RX_BUF.init([0u8; 256]),
    );
    let (module_tx, module_rx) = module_uart.split();
    info!("Module UART initialized");

    // Touch display on UART1, 9600 8N1 (the display default)
    let mut panel_config = UartConfig::default();
    panel_config.baudrate = 9600;
    let panel_uart = Uart::new_blocking(p.UART1, p.PIN_4, p.PIN_5, panel_config);
    let panel_uart = panel_uart.into_buffered(
        Irqs,
        PANEL_TX_BUF.init([0u8; 256]),
        PANEL_RX_BUF.init([0u8; 256]),
    );
    let (panel_tx, panel_rx) = panel_uart.split();
    info!("Panel UART initialized");

    // Request lines to the BLE volume collaborator
    let vol_up = Output::new(p.PIN_10, Level::Low);
    let vol_down = Output::new(p.PIN_11, Level::Low);
    let vol_mute = Output::new(p.PIN_12, Level::Low);

    // Spawn tasks
    spawner.spawn(tasks::module_rx_task(module_rx)).unwrap();
    spawner.spawn(tasks::module_tx_task(module_tx)).unwrap();
    spawner.spawn(tasks::panel_rx_task(panel_rx)).unwrap();
    spawner.spawn(tasks::panel_tx_task(panel_tx)).unwrap();
    spawner
        .spawn(tasks::volume_task(vol_up, vol_down, vol_mute))
        .unwrap();
    spawner.spawn(tasks::controller_task()).unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
