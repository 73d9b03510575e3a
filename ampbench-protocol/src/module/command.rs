//! Commands sent to the Bluetooth module
//!
//! Only the vocabulary the controller needs: power and pairing (MMI
//! actions), playback transport, equalizer setting, event acknowledgement,
//! link initialization, and the AVRCP vendor-dependent requests that carry
//! play status and track metadata.

use heapless::Vec;

use super::eq::EqPreset;
use super::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

// Command opcodes
pub const OP_MMI_ACTION: u8 = 0x02;
pub const OP_EVENT_FILTER: u8 = 0x03;
pub const OP_MUSIC_CONTROL: u8 = 0x04;
pub const OP_AVC_VENDOR_CMD: u8 = 0x0B;
pub const OP_READ_BD_ADDR: u8 = 0x0F;
pub const OP_BTM_UTILITY_FUNC: u8 = 0x13;
pub const OP_EVENT_ACK: u8 = 0x14;
pub const OP_EQ_MODE_SETTING: u8 = 0x1C;
pub const OP_AVRCP_VENDOR_DEP_CMD: u8 = 0x4A;

// MMI actions (simulated button press/release)
pub const MMI_POWER_ON_PRESS: u8 = 0x51;
pub const MMI_POWER_ON_RELEASE: u8 = 0x52;
pub const MMI_POWER_OFF_PRESS: u8 = 0x53;
pub const MMI_POWER_OFF_RELEASE: u8 = 0x54;
pub const MMI_ENTER_PAIRING: u8 = 0x5D;

// Music control actions
pub const MC_PLAY_PAUSE: u8 = 0x07;
pub const MC_PREV: u8 = 0x0A;

// AVRCP PDU ids
pub const PDU_GET_ELEMENT_ATTRIBUTES: u8 = 0x20;
pub const PDU_GET_PLAY_STATUS: u8 = 0x30;
pub const PDU_REGISTER_NOTIFICATION: u8 = 0x31;

// AVRCP notification event ids
pub const NOTIFY_PLAYBACK_STATUS_CHANGED: u8 = 0x01;
pub const NOTIFY_TRACK_CHANGED: u8 = 0x02;
pub const NOTIFY_PLAYBACK_POS_CHANGED: u8 = 0x05;

/// Element attribute ids requested for metadata, in request order
pub const REQUESTED_ATTR_IDS: [u32; 7] = [1, 2, 3, 6, 4, 5, 7];

/// Commands the controller issues to the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleCommand {
    /// Simulated button press/release (power, pairing)
    MmiAction(u8),
    /// Playback transport action (play/pause, next, previous)
    MusicControl(u8),
    /// Acknowledge a received event
    EventAck { event: u8 },
    /// Select an equalizer preset
    EqModeSetting(EqPreset),
    /// Read the module's Bluetooth device address (link init)
    ReadBdAddr,
    /// Disable the module's event filter (link init)
    DisableEventFilter,
    /// BTM utility function (link init)
    BtmUtility { function: u8, param: u8 },
    /// AVRCP GetPlayStatus request
    GetPlayStatus { db: u8 },
    /// AVRCP RegisterNotification request
    RegisterNotification {
        db: u8,
        event_id: u8,
        interval_s: u32,
    },
    /// AVRCP GetElementAttributes request for the standard metadata set
    GetElementAttributes { db: u8 },
}

impl ModuleCommand {
    /// Encode this command into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match *self {
            ModuleCommand::MmiAction(action) => Frame::new(OP_MMI_ACTION, &[0x00, action]),
            ModuleCommand::MusicControl(action) => Frame::new(OP_MUSIC_CONTROL, &[0x00, action]),
            ModuleCommand::EventAck { event } => Frame::new(OP_EVENT_ACK, &[event]),
            ModuleCommand::EqModeSetting(preset) => {
                Frame::new(OP_EQ_MODE_SETTING, &[preset.index(), 0x00])
            }
            ModuleCommand::ReadBdAddr => Ok(Frame::empty(OP_READ_BD_ADDR)),
            ModuleCommand::DisableEventFilter => {
                Frame::new(OP_EVENT_FILTER, &[0x00, 0x00, 0x00, 0x00])
            }
            ModuleCommand::BtmUtility { function, param } => {
                Frame::new(OP_BTM_UTILITY_FUNC, &[function, param])
            }
            ModuleCommand::GetPlayStatus { db } => {
                let payload = avc_vendor_payload(db, PDU_GET_PLAY_STATUS, &[])?;
                Frame::new(OP_AVC_VENDOR_CMD, &payload)
            }
            ModuleCommand::RegisterNotification {
                db,
                event_id,
                interval_s,
            } => {
                let mut params = Vec::<u8, 5>::new();
                // Cannot fail: fixed 5-byte parameter block
                let _ = params.push(event_id);
                let _ = params.extend_from_slice(&interval_s.to_be_bytes());
                let payload = avc_vendor_payload(db, PDU_REGISTER_NOTIFICATION, &params)?;
                Frame::new(OP_AVC_VENDOR_CMD, &payload)
            }
            ModuleCommand::GetElementAttributes { db } => {
                let mut payload = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
                payload.push(db).map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .push(PDU_GET_ELEMENT_ATTRIBUTES)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                payload
                    .push(REQUESTED_ATTR_IDS.len() as u8)
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                for id in REQUESTED_ATTR_IDS {
                    payload
                        .extend_from_slice(&id.to_be_bytes())
                        .map_err(|_| FrameError::PayloadTooLarge)?;
                }
                Frame::new(OP_AVRCP_VENDOR_DEP_CMD, &payload)
            }
        }
    }
}

/// Build the AVC vendor command payload: database index, PDU id, reserved
/// byte, big-endian parameter length, parameters.
fn avc_vendor_payload(
    db: u8,
    pdu: u8,
    params: &[u8],
) -> Result<Vec<u8, MAX_PAYLOAD_SIZE>, FrameError> {
    let mut payload = Vec::new();
    payload.push(db).map_err(|_| FrameError::PayloadTooLarge)?;
    payload.push(pdu).map_err(|_| FrameError::PayloadTooLarge)?;
    payload
        .push(0x00)
        .map_err(|_| FrameError::PayloadTooLarge)?;
    payload
        .extend_from_slice(&(params.len() as u16).to_be_bytes())
        .map_err(|_| FrameError::PayloadTooLarge)?;
    payload
        .extend_from_slice(params)
        .map_err(|_| FrameError::PayloadTooLarge)?;
    Ok(payload)
}
