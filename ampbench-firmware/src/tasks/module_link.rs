//! Bluetooth module UART pump tasks
//!
//! The RX task forwards raw chunks to the controller; framing and
//! checksum handling live in the controller core, not here.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embedded_io_async::{Read, Write};

use crate::channels::{Chunk, CHUNK_SIZE, MODULE_RX, MODULE_TX};

/// Module RX task - forwards received bytes to the controller
#[embassy_executor::task]
pub async fn module_rx_task(mut rx: BufferedUartRx) {
    info!("Module RX task started");

    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("Module RX: {} bytes", n);
                let mut chunk = Chunk::new();
                let _ = chunk.extend_from_slice(&buf[..n]);
                if MODULE_RX.try_send(chunk).is_err() {
                    warn!("Module RX channel full, dropping {} bytes", n);
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Module UART read error: {:?}", e);
            }
        }
    }
}

/// Module TX task - writes controller frames out to the module
#[embassy_executor::task]
pub async fn module_tx_task(mut tx: BufferedUartTx) {
    info!("Module TX task started");

    loop {
        let chunk = MODULE_TX.receive().await;
        if let Err(e) = tx.write_all(&chunk).await {
            warn!("Module UART write error: {:?}", e);
        }
    }
}
