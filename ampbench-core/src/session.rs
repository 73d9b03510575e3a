//! Bluetooth module session state machine
//!
//! Owns everything about the module link: the power on/off button
//! sequences, connection tracking with a grace period, equalizer mode
//! tracking, play-status polling, and metadata fetching with fragment
//! reassembly.
//!
//! The session never sleeps and never owns a clock. Every timed behavior
//! is a deadline checked in [`poll`](ModuleSession::poll) against the
//! caller-supplied monotonic millisecond timestamp. Outbound frames
//! accumulate in an internal queue drained with
//! [`take_frame`](ModuleSession::take_frame); state changes the display
//! cares about are drained with [`take_update`](ModuleSession::take_update).

use heapless::Deque;

use ampbench_protocol::module::avrcp::{
    AttrFragment, AttributeMap, MetadataAssembler, Notification, PlayStatus, VendorResponse,
};
use ampbench_protocol::module::command::{
    ModuleCommand, MC_PLAY_PAUSE, MC_PREV, MMI_ENTER_PAIRING, MMI_POWER_OFF_PRESS,
    MMI_POWER_OFF_RELEASE, MMI_POWER_ON_PRESS, MMI_POWER_ON_RELEASE,
    NOTIFY_PLAYBACK_POS_CHANGED, NOTIFY_PLAYBACK_STATUS_CHANGED, NOTIFY_TRACK_CHANGED,
    OP_EQ_MODE_SETTING, PDU_GET_PLAY_STATUS, PDU_REGISTER_NOTIFICATION,
};
use ampbench_protocol::module::eq::EqPreset;
use ampbench_protocol::module::event::{is_connected_status, ModuleEvent};
use ampbench_protocol::module::frame::Frame;

/// An evidence gap longer than this means the link is gone
pub const DISCONNECT_GRACE_MS: u64 = 2000;

/// Play-status polling period while connected
pub const PLAY_STATUS_PERIOD_MS: u64 = 1000;

/// Minimum spacing between metadata requests
pub const METADATA_THROTTLE_MS: u64 = 1500;

/// Metadata fetch delay after a connect edge (the module needs time to
/// bring AVRCP up)
pub const METADATA_DELAY_CONNECT_MS: u64 = 800;

/// Metadata fetch delay after a track change
pub const METADATA_DELAY_TRACK_MS: u64 = 250;

/// How long to wait for an expected command acknowledgement
pub const ACK_WINDOW_MS: u64 = 500;

/// A fragment sequence with no final fragment is abandoned after this
pub const REASSEMBLY_TIMEOUT_MS: u64 = 3000;

// Power sequence timing
const POWER_ON_PRESS_MS: u64 = 200;
const POWER_ON_SETTLE_MS: u64 = 500;
const LINK_INIT_SETTLE_MS: u64 = 150;
const POWER_OFF_PRESS_MS: u64 = 1500;

// Position-reset heuristic for track-change inference: a drop this large
// that lands near zero means a new track started
const POSITION_RESET_DROP_MS: u32 = 2500;
const POSITION_RESET_FLOOR_MS: u32 = 3000;

const TX_DEPTH: usize = 16;
const UPDATE_DEPTH: usize = 8;

/// State changes surfaced to the display layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// An audio connection became active
    Connected,
    /// The connection lapsed (grace period expired) or power went off
    Disconnected,
    /// The equalizer mode changed (a local request or a device indication)
    EqMode(u8),
    /// Playback position and track length from the module
    PlayPosition { position_ms: u32, length_ms: u32 },
    /// A completed track-metadata map
    Metadata(AttributeMap),
    /// A command was rejected or its acknowledgement never arrived
    CommandFailed(u8),
}

/// Power button sequence progress; each step is a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Power-on press sent; release due at the deadline
    OnPress(u64),
    /// Release sent; link init due once the module settles
    OnSettle(u64),
    /// Link init sent; EQ forced to a known preset at the deadline
    LinkInit(u64),
    /// Power-off press sent; release due at the deadline
    OffPress(u64),
}

#[derive(Debug, Clone, Copy)]
struct PendingEq {
    preset: EqPreset,
    deadline: u64,
}

/// The Bluetooth module session
#[derive(Debug)]
pub struct ModuleSession {
    phase: Phase,
    powered: bool,
    connected: bool,
    last_link_evidence: u64,
    eq_mode: u8,
    pending_eq: Option<PendingEq>,
    next_play_status_at: Option<u64>,
    metadata_due_at: Option<u64>,
    last_metadata_request: Option<u64>,
    reassembly_deadline: Option<u64>,
    assembler: MetadataAssembler,
    last_length_ms: Option<u32>,
    last_position_ms: Option<u32>,
    db: u8,
    unknown_events: u32,
    tx: Deque<Frame, TX_DEPTH>,
    updates: Deque<SessionUpdate, UPDATE_DEPTH>,
}

impl Default for ModuleSession {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            powered: false,
            connected: false,
            last_link_evidence: 0,
            eq_mode: 0,
            pending_eq: None,
            next_play_status_at: None,
            metadata_due_at: None,
            last_metadata_request: None,
            reassembly_deadline: None,
            assembler: MetadataAssembler::new(),
            last_length_ms: None,
            last_position_ms: None,
            db: 0,
            unknown_events: 0,
            tx: Deque::new(),
            updates: Deque::new(),
        }
    }
}

impl ModuleSession {
    /// Create a session with the module assumed off
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the module is (believed) powered
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Whether an audio connection is active
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Current equalizer mode: the latest request, reconciled by the
    /// device's mode indication
    pub fn eq_mode(&self) -> u8 {
        self.eq_mode
    }

    /// Events received with opcodes this controller does not consume
    pub fn unknown_events(&self) -> u32 {
        self.unknown_events
    }

    /// Next outbound frame, if any
    pub fn take_frame(&mut self) -> Option<Frame> {
        self.tx.pop_front()
    }

    /// Next state change for the display layer, if any
    pub fn take_update(&mut self) -> Option<SessionUpdate> {
        self.updates.pop_front()
    }

    /// Toggle module power. Ignored while a power sequence is running.
    pub fn power_toggle(&mut self, now_ms: u64) {
        if self.phase != Phase::Idle {
            return;
        }
        if self.powered {
            self.power_off(now_ms);
        } else {
            self.power_on(now_ms);
        }
    }

    /// Start the power-on button sequence
    pub fn power_on(&mut self, now_ms: u64) {
        self.send(ModuleCommand::MmiAction(MMI_POWER_ON_PRESS));
        self.phase = Phase::OnPress(now_ms + POWER_ON_PRESS_MS);
        self.powered = true;
    }

    /// Start the power-off button sequence
    pub fn power_off(&mut self, now_ms: u64) {
        self.send(ModuleCommand::MmiAction(MMI_POWER_OFF_PRESS));
        self.phase = Phase::OffPress(now_ms + POWER_OFF_PRESS_MS);
        self.powered = false;
        self.drop_connection();
    }

    /// Put the module in pairing mode
    pub fn enter_pairing(&mut self) {
        if self.powered {
            self.send(ModuleCommand::MmiAction(MMI_ENTER_PAIRING));
        }
    }

    /// Toggle play/pause on the connected player
    pub fn play_pause(&mut self) {
        if self.powered {
            self.send(ModuleCommand::MusicControl(MC_PLAY_PAUSE));
        }
    }

    /// Skip to the previous track
    pub fn previous_track(&mut self) {
        if self.powered {
            self.send(ModuleCommand::MusicControl(MC_PREV));
        }
    }

    /// Cycle to the next preset after the current mode
    pub fn next_eq(&mut self, now_ms: u64) {
        let preset = EqPreset::next_in_cycle(self.eq_mode);
        self.set_eq(preset, now_ms);
    }

    /// Select a specific equalizer preset. The local mode updates
    /// immediately so rapid cycling advances from the latest request;
    /// the device's EQ mode indication reconciles any disagreement.
    pub fn set_eq(&mut self, preset: EqPreset, now_ms: u64) {
        if !self.powered {
            return;
        }
        self.send(ModuleCommand::EqModeSetting(preset));
        self.eq_mode = preset.index();
        self.push_update(SessionUpdate::EqMode(self.eq_mode));
        self.pending_eq = Some(PendingEq {
            preset,
            deadline: now_ms + ACK_WINDOW_MS,
        });
    }

    /// Process a decoded module event
    pub fn handle_event(&mut self, event: &ModuleEvent<'_>, now_ms: u64) {
        if event.wants_ack() {
            self.send(ModuleCommand::EventAck {
                event: event.opcode(),
            });
        }

        match *event {
            ModuleEvent::CommandAck { command, status } => self.on_command_ack(command, status),
            ModuleEvent::BtmStatus { status } => self.on_btm_status(status, now_ms),
            ModuleEvent::EqModeInd { mode } => {
                if self
                    .pending_eq
                    .is_some_and(|pending| pending.preset.index() == mode)
                {
                    self.pending_eq = None;
                }
                if self.eq_mode != mode {
                    self.eq_mode = mode;
                    self.push_update(SessionUpdate::EqMode(mode));
                }
            }
            ModuleEvent::AvcVendorRsp { params } => self.on_vendor_response(params, now_ms),
            ModuleEvent::ElementAttrRsp { params } => self.on_attr_fragment(params),
            ModuleEvent::Unknown { .. } => {
                self.unknown_events = self.unknown_events.wrapping_add(1);
            }
        }
    }

    /// Advance every deadline. Call this on each tick with the current
    /// monotonic time.
    pub fn poll(&mut self, now_ms: u64) {
        self.poll_power_phase(now_ms);

        // A gap of exactly the grace period is still within it
        if self.connected
            && now_ms.saturating_sub(self.last_link_evidence) > DISCONNECT_GRACE_MS
        {
            self.drop_connection();
        }

        if self.connected {
            if let Some(at) = self.next_play_status_at {
                if now_ms >= at {
                    self.send(ModuleCommand::GetPlayStatus { db: self.db });
                    self.next_play_status_at = Some(now_ms + PLAY_STATUS_PERIOD_MS);
                }
            }
        }

        if let Some(due) = self.metadata_due_at {
            if now_ms >= due {
                self.request_metadata(now_ms);
            }
        }

        if let Some(pending) = self.pending_eq {
            if now_ms >= pending.deadline {
                self.pending_eq = None;
                self.push_update(SessionUpdate::CommandFailed(OP_EQ_MODE_SETTING));
            }
        }

        if let Some(deadline) = self.reassembly_deadline {
            if now_ms >= deadline {
                self.assembler.reset();
                self.reassembly_deadline = None;
            }
        }
    }

    fn poll_power_phase(&mut self, now_ms: u64) {
        match self.phase {
            Phase::OnPress(deadline) if now_ms >= deadline => {
                self.send(ModuleCommand::MmiAction(MMI_POWER_ON_RELEASE));
                self.phase = Phase::OnSettle(now_ms + POWER_ON_SETTLE_MS);
            }
            Phase::OnSettle(deadline) if now_ms >= deadline => {
                self.send(ModuleCommand::ReadBdAddr);
                self.send(ModuleCommand::DisableEventFilter);
                self.send(ModuleCommand::BtmUtility {
                    function: 0x03,
                    param: 0x01,
                });
                self.phase = Phase::LinkInit(now_ms + LINK_INIT_SETTLE_MS);
            }
            Phase::LinkInit(deadline) if now_ms >= deadline => {
                self.phase = Phase::Idle;
                // Known starting point; the device remembers its last mode
                // but the display cannot ask for it
                self.set_eq(EqPreset::Off, now_ms);
            }
            Phase::OffPress(deadline) if now_ms >= deadline => {
                self.send(ModuleCommand::MmiAction(MMI_POWER_OFF_RELEASE));
                self.phase = Phase::Idle;
            }
            _ => {}
        }
    }

    fn on_command_ack(&mut self, command: u8, status: u8) {
        if command != OP_EQ_MODE_SETTING || self.pending_eq.take().is_none() {
            return;
        }
        // The mode was already applied locally; a rejection only needs
        // reporting, the device's indication walks the mode back
        if status != 0 {
            self.push_update(SessionUpdate::CommandFailed(command));
        }
    }

    fn on_btm_status(&mut self, status: u8, now_ms: u64) {
        if !is_connected_status(status) {
            return;
        }
        self.last_link_evidence = now_ms;
        if self.connected {
            return;
        }

        self.connected = true;
        self.push_update(SessionUpdate::Connected);

        self.register_notification(NOTIFY_PLAYBACK_STATUS_CHANGED, 1);
        self.register_notification(NOTIFY_TRACK_CHANGED, 0);
        self.register_notification(NOTIFY_PLAYBACK_POS_CHANGED, 1);

        self.next_play_status_at = Some(now_ms + PLAY_STATUS_PERIOD_MS);
        self.schedule_metadata(now_ms + METADATA_DELAY_CONNECT_MS);
    }

    fn on_vendor_response(&mut self, params: &[u8], now_ms: u64) {
        let Some(rsp) = VendorResponse::parse(params) else {
            return;
        };
        match rsp.pdu {
            PDU_GET_PLAY_STATUS => {
                if let Some(ps) = PlayStatus::parse(rsp.params) {
                    self.on_play_status(ps, now_ms);
                }
            }
            PDU_REGISTER_NOTIFICATION => {
                if let Some(notification) = Notification::parse(rsp.params) {
                    self.on_notification(notification, now_ms);
                }
            }
            _ => {}
        }
    }

    fn on_play_status(&mut self, ps: PlayStatus, now_ms: u64) {
        let mut track_changed = false;

        if let Some(prev) = self.last_length_ms {
            if ps.length_ms != prev {
                track_changed = true;
            }
        }
        if let Some(prev) = self.last_position_ms {
            if prev.saturating_sub(ps.position_ms) > POSITION_RESET_DROP_MS
                && ps.position_ms < POSITION_RESET_FLOOR_MS
            {
                track_changed = true;
            }
        }

        self.last_length_ms = Some(ps.length_ms);
        self.last_position_ms = Some(ps.position_ms);
        self.push_update(SessionUpdate::PlayPosition {
            position_ms: ps.position_ms,
            length_ms: ps.length_ms,
        });

        if track_changed {
            self.schedule_metadata(now_ms + METADATA_DELAY_TRACK_MS);
        }
    }

    fn on_notification(&mut self, notification: Notification, now_ms: u64) {
        match notification {
            Notification::TrackChanged => {
                self.schedule_metadata(now_ms + METADATA_DELAY_TRACK_MS);
                // Notifications are one-shot; re-arm for the next change
                self.register_notification(NOTIFY_TRACK_CHANGED, 0);
            }
            Notification::PlaybackPosChanged { position_ms } => {
                self.last_position_ms = Some(position_ms);
                self.push_update(SessionUpdate::PlayPosition {
                    position_ms,
                    length_ms: self.last_length_ms.unwrap_or(u32::MAX),
                });
            }
            Notification::Other { .. } => {}
        }
    }

    fn on_attr_fragment(&mut self, params: &[u8]) {
        let Some(frag) = AttrFragment::parse(params) else {
            return;
        };
        if let Some(map) = self.assembler.feed(&frag) {
            self.reassembly_deadline = None;
            self.push_update(SessionUpdate::Metadata(map));
        }
    }

    /// Coalesce metadata fetches to the earliest requested deadline
    fn schedule_metadata(&mut self, at_ms: u64) {
        self.metadata_due_at = Some(match self.metadata_due_at {
            Some(existing) => existing.min(at_ms),
            None => at_ms,
        });
    }

    fn request_metadata(&mut self, now_ms: u64) {
        if let Some(last) = self.last_metadata_request {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < METADATA_THROTTLE_MS {
                // Too soon after the previous request: slide the deadline
                // rather than dropping the fetch
                self.metadata_due_at = Some(last + METADATA_THROTTLE_MS);
                return;
            }
        }

        self.metadata_due_at = None;
        self.last_metadata_request = Some(now_ms);
        self.assembler.reset();
        self.reassembly_deadline = Some(now_ms + REASSEMBLY_TIMEOUT_MS);
        self.send(ModuleCommand::GetElementAttributes { db: self.db });
    }

    fn register_notification(&mut self, event_id: u8, interval_s: u32) {
        self.send(ModuleCommand::RegisterNotification {
            db: self.db,
            event_id,
            interval_s,
        });
    }

    fn drop_connection(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.next_play_status_at = None;
        self.metadata_due_at = None;
        self.reassembly_deadline = None;
        self.assembler.reset();
        self.last_length_ms = None;
        self.last_position_ms = None;
        self.push_update(SessionUpdate::Disconnected);
    }

    fn send(&mut self, cmd: ModuleCommand) {
        let Ok(frame) = cmd.to_frame() else {
            return;
        };
        if let Err(frame) = self.tx.push_back(frame) {
            // Keep the newest command; stale ones are the safer loss
            self.tx.pop_front();
            let _ = self.tx.push_back(frame);
        }
    }

    fn push_update(&mut self, update: SessionUpdate) {
        if let Err(update) = self.updates.push_back(update) {
            self.updates.pop_front();
            let _ = self.updates.push_back(update);
        }
    }
}
