//! Touch display UART pump tasks
//!
//! Token parsing and command pacing live in the controller core; these
//! tasks only move bytes.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embedded_io_async::{Read, Write};

use crate::channels::{Chunk, CHUNK_SIZE, PANEL_RX, PANEL_TX};

/// Display RX task - forwards touch tokens to the controller
#[embassy_executor::task]
pub async fn panel_rx_task(mut rx: BufferedUartRx) {
    info!("Panel RX task started");

    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("Panel RX: {} bytes", n);
                let mut chunk = Chunk::new();
                let _ = chunk.extend_from_slice(&buf[..n]);
                if PANEL_RX.try_send(chunk).is_err() {
                    warn!("Panel RX channel full, dropping {} bytes", n);
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Panel UART read error: {:?}", e);
            }
        }
    }
}

/// Display TX task - writes paced controller commands to the display
#[embassy_executor::task]
pub async fn panel_tx_task(mut tx: BufferedUartTx) {
    info!("Panel TX task started");

    loop {
        let chunk = PANEL_TX.receive().await;
        if let Err(e) = tx.write_all(&chunk).await {
            warn!("Panel UART write error: {:?}", e);
        }
    }
}
