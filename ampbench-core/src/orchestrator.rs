//! Cooperative controller loop
//!
//! One [`poll`](Orchestrator::poll) call pumps everything once: bytes in
//! from both ports, decoded events into the session, display tokens into
//! actions, session deadlines, and queued output back out. Nothing here
//! blocks; the firmware calls this from a single task on a fixed tick,
//! and the tests call it with hand-picked timestamps.

use heapless::Vec;

use ampbench_protocol::module::eq::EqPreset;
use ampbench_protocol::module::event::ModuleEvent;
use ampbench_protocol::module::frame::FrameDecoder;
use ampbench_protocol::panel::token::{PanelInput, Token, TokenParser, TERMINATOR};

use crate::panel::PanelView;
use crate::queue::CommandQueue;
use crate::session::{ModuleSession, SessionUpdate};
use crate::traits::{PortError, SerialPort, VolumeControl, VolumeDirection};

/// A second volume-down within this window sends mute instead
pub const MUTE_ASSIST_MS: u64 = 350;

const READ_CHUNK: usize = 64;
const PENDING_TX: usize = 512;

/// Counters exposed for firmware logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OrchestratorStats {
    /// Valid frames decoded from the module
    pub frames_decoded: u32,
    /// Module frames that failed their checksum
    pub checksum_errors: u32,
    /// Module events with opcodes the controller does not consume
    pub unknown_events: u32,
    /// Display frames rejected as line noise
    pub invalid_token_frames: u32,
    /// Commands that were rejected or never acknowledged
    pub failed_commands: u32,
    /// Output bytes dropped because a port was closed or a buffer full
    pub dropped_writes: u32,
}

/// The controller: module session on one side, display on the other,
/// volume relayed to the BLE collaborator
#[derive(Debug)]
pub struct Orchestrator<M, D, V> {
    module: M,
    display: D,
    volume: V,
    session: ModuleSession,
    decoder: FrameDecoder,
    tokens: TokenParser,
    view: PanelView,
    queue: CommandQueue,
    module_tx: Vec<u8, PENDING_TX>,
    display_tx: Vec<u8, PENDING_TX>,
    last_volume_down: Option<u64>,
    stats: OrchestratorStats,
}

impl<M: SerialPort, D: SerialPort, V: VolumeControl> Orchestrator<M, D, V> {
    /// Create a controller over the two ports and the volume collaborator.
    /// The display boot-sync commands are queued immediately.
    pub fn new(module: M, display: D, volume: V) -> Self {
        let mut queue = CommandQueue::new();
        queue.boot_sync();
        Self {
            module,
            display,
            volume,
            session: ModuleSession::new(),
            decoder: FrameDecoder::new(),
            tokens: TokenParser::new(),
            view: PanelView::new(),
            queue,
            module_tx: Vec::new(),
            display_tx: Vec::new(),
            last_volume_down: None,
            stats: OrchestratorStats::default(),
        }
    }

    /// Run one full pump cycle at the given monotonic time
    pub fn poll(&mut self, now_ms: u64) {
        self.pump_module_rx(now_ms);
        self.pump_display_rx(now_ms);
        self.session.poll(now_ms);
        self.apply_updates(now_ms);
        self.pump_module_tx();
        self.pump_display_tx(now_ms);
    }

    /// Session state, for firmware logging
    pub fn session(&self) -> &ModuleSession {
        &self.session
    }

    /// Current counters (live ones folded in from the parsers)
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            checksum_errors: self.decoder.checksum_errors(),
            unknown_events: self.session.unknown_events(),
            invalid_token_frames: self.tokens.invalid_frames(),
            ..self.stats
        }
    }

    /// The module-side port
    pub fn module_port_mut(&mut self) -> &mut M {
        &mut self.module
    }

    /// The display-side port
    pub fn display_port_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// The volume collaborator
    pub fn volume_mut(&mut self) -> &mut V {
        &mut self.volume
    }

    fn pump_module_rx(&mut self, now_ms: u64) {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.module.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => self.decoder.extend(&buf[..n]),
            }
        }
        while let Some(result) = self.decoder.poll() {
            let Ok(frame) = result else {
                continue; // counted by the decoder
            };
            self.stats.frames_decoded = self.stats.frames_decoded.wrapping_add(1);
            let event = ModuleEvent::from_frame(&frame);
            self.session.handle_event(&event, now_ms);
        }
    }

    fn pump_display_rx(&mut self, now_ms: u64) {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = match self.display.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            let inputs = self.tokens.feed(&buf[..n], now_ms);
            for input in inputs {
                self.handle_input(input, now_ms);
            }
        }
        // A burst can complete more frames than one feed call surfaces
        loop {
            let inputs = self.tokens.feed(&[], now_ms);
            if inputs.is_empty() {
                break;
            }
            for input in inputs {
                self.handle_input(input, now_ms);
            }
        }
    }

    fn handle_input(&mut self, input: PanelInput, now_ms: u64) {
        match input {
            PanelInput::PageChange(page) => self.view.page_changed(page, &mut self.queue),
            PanelInput::Token(token) => self.handle_token(token, now_ms),
        }
    }

    fn handle_token(&mut self, token: Token, now_ms: u64) {
        match token {
            Token::Power => self.session.power_toggle(now_ms),
            Token::Pair => self.session.enter_pairing(),
            Token::Play => self.session.play_pause(),
            Token::Prev => self.session.previous_track(),
            Token::Next => self.session.next_eq(now_ms),
            Token::Eq(preset) => self.session.set_eq(preset, now_ms),
            Token::VolumeUp => {
                self.volume.send_volume(VolumeDirection::Up);
                self.last_volume_down = None;
            }
            Token::VolumeDown => {
                let assist = self
                    .last_volume_down
                    .is_some_and(|at| now_ms.saturating_sub(at) < MUTE_ASSIST_MS);
                if assist {
                    self.volume.send_mute();
                    self.last_volume_down = None;
                } else {
                    self.volume.send_volume(VolumeDirection::Down);
                    self.last_volume_down = Some(now_ms);
                }
            }
        }
    }

    fn apply_updates(&mut self, _now_ms: u64) {
        while let Some(update) = self.session.take_update() {
            match update {
                SessionUpdate::Connected => {}
                SessionUpdate::Disconnected => self.view.clear_track_state(&mut self.queue),
                SessionUpdate::EqMode(mode) => {
                    self.view
                        .set_eq_label(EqPreset::label_for_mode(mode), &mut self.queue);
                }
                SessionUpdate::PlayPosition {
                    position_ms,
                    length_ms,
                } => self.view.set_times(position_ms, length_ms, &mut self.queue),
                SessionUpdate::Metadata(map) => self.view.set_metadata(&map, &mut self.queue),
                SessionUpdate::CommandFailed(_) => {
                    self.stats.failed_commands = self.stats.failed_commands.wrapping_add(1);
                }
            }
        }
    }

    fn pump_module_tx(&mut self) {
        loop {
            flush(&mut self.module, &mut self.module_tx, &mut self.stats);
            if !self.module_tx.is_empty() {
                // Port backpressure; retry on the next poll
                break;
            }
            let Some(frame) = self.session.take_frame() else {
                break;
            };
            match frame.encode_to_vec() {
                // Cannot fail: the pending buffer is empty and holds more
                // than one max-size frame
                Ok(bytes) => {
                    let _ = self.module_tx.extend_from_slice(&bytes);
                }
                Err(_) => {
                    self.stats.dropped_writes = self.stats.dropped_writes.wrapping_add(1);
                }
            }
        }
    }

    fn pump_display_tx(&mut self, now_ms: u64) {
        if self.display_tx.is_empty() {
            if let Some(cmd) = self.queue.poll(now_ms) {
                if self.display_tx.extend_from_slice(cmd.as_bytes()).is_err()
                    || self.display_tx.extend_from_slice(&TERMINATOR).is_err()
                {
                    self.stats.dropped_writes = self.stats.dropped_writes.wrapping_add(1);
                    self.display_tx.clear();
                }
            }
        }
        flush(&mut self.display, &mut self.display_tx, &mut self.stats);
    }
}

/// Write as much pending output as the port accepts right now
fn flush<P: SerialPort>(
    port: &mut P,
    pending: &mut Vec<u8, PENDING_TX>,
    stats: &mut OrchestratorStats,
) {
    while !pending.is_empty() {
        match port.write(pending) {
            Ok(0) | Err(PortError::Busy) => break,
            Ok(n) => {
                let len = pending.len();
                let n = n.min(len);
                pending.as_mut_slice().copy_within(n..len, 0);
                pending.truncate(len - n);
            }
            Err(PortError::Closed) => {
                stats.dropped_writes = stats.dropped_writes.wrapping_add(pending.len() as u32);
                pending.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimPort, SimVolume, VolumeCall};
    use ampbench_protocol::module::command::{OP_MMI_ACTION, OP_MUSIC_CONTROL};
    use ampbench_protocol::module::event::EVT_BTM_STATUS;
    use ampbench_protocol::module::frame::{Frame, FrameDecoder};

    type TestOrchestrator = Orchestrator<SimPort, SimPort, SimVolume>;

    fn orchestrator() -> TestOrchestrator {
        Orchestrator::new(SimPort::new(), SimPort::new(), SimVolume::new())
    }

    fn inject_token(o: &mut TestOrchestrator, token: &[u8]) {
        let mut data = Vec::<u8, 32>::new();
        data.extend_from_slice(token).unwrap();
        data.extend_from_slice(&TERMINATOR).unwrap();
        o.display_port_mut().inject(&data);
    }

    fn inject_module_event(o: &mut TestOrchestrator, opcode: u8, payload: &[u8]) {
        let bytes = Frame::new(opcode, payload).unwrap().encode_to_vec().unwrap();
        o.module_port_mut().inject(&bytes);
    }

    fn module_frames(o: &mut TestOrchestrator) -> Vec<Frame, 16> {
        let written = o.module_port_mut().take_written();
        let mut decoder = FrameDecoder::new();
        decoder.feed(&written).filter_map(|r| r.ok()).collect()
    }

    /// Poll repeatedly to let queue pacing drain, returning display output
    fn display_output(o: &mut TestOrchestrator, mut now: u64, polls: u32) -> heapless::Vec<u8, 2048> {
        for _ in 0..polls {
            o.poll(now);
            now += 35;
        }
        let mut out = heapless::Vec::new();
        let _ = out.extend_from_slice(o.display_port_mut().written());
        let _ = o.display_port_mut().take_written();
        out
    }

    /// Byte search; display output mixes text with 0xFF terminators
    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_play_token_sends_music_control() {
        let mut o = orchestrator();
        // Power first; transport is ignored while off
        inject_token(&mut o, b"BT_POWER");
        o.poll(0);
        module_frames(&mut o);

        inject_token(&mut o, b"BT_PLAY");
        o.poll(200);
        let frames = module_frames(&mut o);
        let mc = frames.iter().find(|f| f.opcode == OP_MUSIC_CONTROL).unwrap();
        assert_eq!(mc.payload.as_slice(), &[0x00, 0x07]);
    }

    #[test]
    fn test_power_token_starts_sequence() {
        let mut o = orchestrator();
        inject_token(&mut o, b"BT_POWER");
        o.poll(0);

        assert!(o.session().is_powered());
        let frames = module_frames(&mut o);
        let mmi = frames.iter().find(|f| f.opcode == OP_MMI_ACTION).unwrap();
        assert_eq!(mmi.payload.as_slice(), &[0x00, 0x51]);
    }

    #[test]
    fn test_transport_ignored_while_off() {
        let mut o = orchestrator();
        inject_token(&mut o, b"BT_PLAY");
        o.poll(0);
        assert!(module_frames(&mut o)
            .iter()
            .all(|f| f.opcode != OP_MUSIC_CONTROL));
    }

    #[test]
    fn test_volume_relayed_not_sent_to_module() {
        let mut o = orchestrator();
        inject_token(&mut o, b"BT_VOLUP");
        o.poll(0);

        assert_eq!(
            o.volume_mut().calls(),
            &[VolumeCall::Volume(VolumeDirection::Up)]
        );
        assert!(module_frames(&mut o).is_empty());
    }

    #[test]
    fn test_mute_assist_window() {
        let mut o = orchestrator();
        inject_token(&mut o, b"BT_VOLDN");
        o.poll(0);
        // Second press inside the window becomes mute
        inject_token(&mut o, b"BT_VOLDN");
        o.poll(200);
        // Window reset by the mute; this one is a plain decrement again
        inject_token(&mut o, b"BT_VOLDN");
        o.poll(400);

        assert_eq!(
            o.volume_mut().calls(),
            &[
                VolumeCall::Volume(VolumeDirection::Down),
                VolumeCall::Mute,
                VolumeCall::Volume(VolumeDirection::Down),
            ]
        );
    }

    #[test]
    fn test_slow_volume_presses_never_mute() {
        let mut o = orchestrator();
        inject_token(&mut o, b"BT_VOLDN");
        o.poll(0);
        inject_token(&mut o, b"BT_VOLDN");
        o.poll(500);

        assert_eq!(
            o.volume_mut().calls(),
            &[
                VolumeCall::Volume(VolumeDirection::Down),
                VolumeCall::Volume(VolumeDirection::Down),
            ]
        );
    }

    #[test]
    fn test_boot_sync_written_with_terminator() {
        let mut o = orchestrator();
        let out = display_output(&mut o, 0, 3);

        let mut expected = heapless::Vec::<u8, 32>::new();
        expected.extend_from_slice(b"bkcmd=3").unwrap();
        expected.extend_from_slice(&TERMINATOR).unwrap();
        assert!(out.starts_with(&expected));
    }

    #[test]
    fn test_eq_label_reaches_display() {
        let mut o = orchestrator();
        // Display reports page 0
        inject_token(&mut o, &[0x66, 0x00]);
        o.poll(0);
        // Module confirms EQ mode 5 (ROCK)
        inject_module_event(&mut o, 0x10, &[5]);

        let out = display_output(&mut o, 100, 8);
        assert!(contains(&out, b"tEQ0.txt=\"ROCK\""));
    }

    #[test]
    fn test_checksum_noise_counted() {
        let mut o = orchestrator();
        let mut bytes = Frame::new(0x01, &[0x06]).unwrap().encode_to_vec().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        o.module_port_mut().inject(&bytes);
        o.poll(0);

        assert_eq!(o.stats().checksum_errors, 1);
        assert_eq!(o.stats().frames_decoded, 0);
    }

    #[test]
    fn test_noise_token_counted() {
        let mut o = orchestrator();
        inject_token(&mut o, b"garbage!");
        o.poll(0);
        assert_eq!(o.stats().invalid_token_frames, 1);
    }

    #[test]
    fn test_busy_display_holds_output() {
        let mut o = orchestrator();
        o.display_port_mut().set_busy(true);
        o.poll(600);
        assert!(o.display_port_mut().written().is_empty());

        // Once the port recovers the held bytes go out
        o.display_port_mut().set_busy(false);
        o.poll(700);
        assert!(!o.display_port_mut().written().is_empty());
    }

    #[test]
    fn test_connected_module_drives_display_times() {
        let mut o = orchestrator();
        inject_token(&mut o, b"BT_POWER");
        o.poll(0);
        o.poll(200);
        o.poll(700);
        o.poll(850);
        // Confirm the forced EQ so no failure is reported
        inject_module_event(&mut o, 0x00, &[0x1C, 0x00]);
        o.poll(900);
        module_frames(&mut o);

        // Display on the now-playing page
        inject_token(&mut o, &[0x66, 0x01]);
        // Connection comes up
        inject_module_event(&mut o, EVT_BTM_STATUS, &[0x06]);
        o.poll(1_000);

        // Play status response: 3:20 total, 0:30 in
        let mut payload = heapless::Vec::<u8, 32>::new();
        payload.push(0x00).unwrap();
        payload.extend_from_slice(&[0u8; 6]).unwrap();
        payload.push(0x30).unwrap();
        payload.push(0x00).unwrap();
        payload.extend_from_slice(&9u16.to_be_bytes()).unwrap();
        payload.extend_from_slice(&200_000u32.to_be_bytes()).unwrap();
        payload.extend_from_slice(&30_000u32.to_be_bytes()).unwrap();
        payload.push(0x01).unwrap();
        inject_module_event(&mut o, 0x1A, &payload);

        let out = display_output(&mut o, 1_100, 16);
        assert!(contains(&out, b"tTIME_CUR.txt=\"0:30\""));
        assert!(contains(&out, b"tTime.txt=\"3:20\""));
    }
}
