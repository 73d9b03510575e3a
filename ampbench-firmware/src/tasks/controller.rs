//! Controller task
//!
//! Owns the whole controller core and pumps it on a fixed tick. All
//! protocol and timing decisions happen inside the core against the
//! monotonic millisecond timestamp supplied here.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use ampbench_core::Orchestrator;

use crate::channels::{MODULE_RX, MODULE_TX, PANEL_RX, PANEL_TX};
use crate::ports::{ChannelPort, ChannelVolume};

/// Controller tick interval
pub const TICK_INTERVAL_MS: u64 = 5;

/// How often the link counters are logged
const STATS_LOG_PERIOD_MS: u64 = 10_000;

/// Controller task - one poll per tick
#[embassy_executor::task]
pub async fn controller_task() {
    info!("Controller task started");

    let module = ChannelPort::new(&MODULE_RX, &MODULE_TX);
    let display = ChannelPort::new(&PANEL_RX, &PANEL_TX);
    let mut orchestrator = Orchestrator::new(module, display, ChannelVolume);

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));
    let start = Instant::now();
    let mut last_stats_at = 0u64;

    loop {
        ticker.next().await;
        let now_ms = start.elapsed().as_millis();

        orchestrator.poll(now_ms);

        if now_ms.saturating_sub(last_stats_at) >= STATS_LOG_PERIOD_MS {
            last_stats_at = now_ms;
            let stats = orchestrator.stats();
            debug!(
                "link stats: frames={} csum_errs={} unknown_evts={} bad_tokens={} failed_cmds={} dropped={}",
                stats.frames_decoded,
                stats.checksum_errors,
                stats.unknown_events,
                stats.invalid_token_frames,
                stats.failed_commands,
                stats.dropped_writes,
            );
            debug!(
                "session: powered={} connected={}",
                orchestrator.session().is_powered(),
                orchestrator.session().is_connected(),
            );
        }
    }
}
