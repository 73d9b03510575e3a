//! Events received from the Bluetooth module
//!
//! Decoded frames are classified here before dispatch. Unknown opcodes are
//! preserved (not errors): the module emits far more event types than this
//! controller consumes, and they are acknowledged and ignored.

use super::frame::Frame;

// Event opcodes
pub const EVT_CMD_ACK: u8 = 0x00;
pub const EVT_BTM_STATUS: u8 = 0x01;
pub const EVT_EQ_MODE_IND: u8 = 0x10;
pub const EVT_AVC_VENDOR_RSP: u8 = 0x1A;
pub const EVT_AVRCP_VENDOR_DEP_RSP: u8 = 0x5D;

/// BTM status bytes that indicate an active audio connection
pub const CONNECTED_STATUSES: [u8; 6] = [0x06, 0x0B, 0x64, 0x65, 0x66, 0x82];

/// Whether a BTM status byte belongs to the "connected" set
pub fn is_connected_status(status: u8) -> bool {
    CONNECTED_STATUSES.contains(&status)
}

/// A classified module event, borrowing payload data from its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleEvent<'a> {
    /// Acknowledgement of a previously issued command
    CommandAck { command: u8, status: u8 },
    /// BTM status indication (connection/link state byte)
    BtmStatus { status: u8 },
    /// Equalizer mode indication (device-confirmed current preset)
    EqModeInd { mode: u8 },
    /// AVRCP vendor response (play status, notifications)
    AvcVendorRsp { params: &'a [u8] },
    /// AVRCP vendor-dependent response (element-attribute fragments)
    ElementAttrRsp { params: &'a [u8] },
    /// Any opcode this controller does not consume
    Unknown { opcode: u8 },
}

impl<'a> ModuleEvent<'a> {
    /// Classify a decoded frame.
    ///
    /// Malformed payloads for known opcodes degrade to `Unknown` rather
    /// than failing: the frame already passed its checksum, so the bytes
    /// are what the module sent and there is nothing to retry.
    pub fn from_frame(frame: &'a Frame) -> Self {
        let payload = frame.payload.as_slice();
        match frame.opcode {
            EVT_CMD_ACK if payload.len() >= 2 => ModuleEvent::CommandAck {
                command: payload[0],
                status: payload[1],
            },
            EVT_BTM_STATUS if !payload.is_empty() => ModuleEvent::BtmStatus {
                status: payload[0],
            },
            EVT_EQ_MODE_IND if !payload.is_empty() => ModuleEvent::EqModeInd { mode: payload[0] },
            EVT_AVC_VENDOR_RSP => ModuleEvent::AvcVendorRsp { params: payload },
            EVT_AVRCP_VENDOR_DEP_RSP => ModuleEvent::ElementAttrRsp { params: payload },
            opcode => ModuleEvent::Unknown { opcode },
        }
    }

    /// The event opcode, used for event acknowledgement
    pub fn opcode(&self) -> u8 {
        match self {
            ModuleEvent::CommandAck { .. } => EVT_CMD_ACK,
            ModuleEvent::BtmStatus { .. } => EVT_BTM_STATUS,
            ModuleEvent::EqModeInd { .. } => EVT_EQ_MODE_IND,
            ModuleEvent::AvcVendorRsp { .. } => EVT_AVC_VENDOR_RSP,
            ModuleEvent::ElementAttrRsp { .. } => EVT_AVRCP_VENDOR_DEP_RSP,
            ModuleEvent::Unknown { opcode } => *opcode,
        }
    }

    /// Whether this event should be acknowledged back to the module.
    ///
    /// Everything except the command-ack event itself is acknowledged.
    pub fn wants_ack(&self) -> bool {
        !matches!(self, ModuleEvent::CommandAck { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_btm_status_classification() {
        let frame = Frame::new(EVT_BTM_STATUS, &[0x06]).unwrap();
        let event = ModuleEvent::from_frame(&frame);
        assert_eq!(event, ModuleEvent::BtmStatus { status: 0x06 });
        assert!(event.wants_ack());
    }

    #[test]
    fn test_command_ack_not_reacked() {
        let frame = Frame::new(EVT_CMD_ACK, &[0x1C, 0x00]).unwrap();
        let event = ModuleEvent::from_frame(&frame);
        assert_eq!(
            event,
            ModuleEvent::CommandAck {
                command: 0x1C,
                status: 0x00
            }
        );
        assert!(!event.wants_ack());
    }

    #[test]
    fn test_unknown_opcode_preserved() {
        let frame = Frame::new(0x2A, &[1, 2, 3]).unwrap();
        let event = ModuleEvent::from_frame(&frame);
        assert_eq!(event, ModuleEvent::Unknown { opcode: 0x2A });
        assert_eq!(event.opcode(), 0x2A);
    }

    #[test]
    fn test_truncated_known_event_degrades_to_unknown() {
        let frame = Frame::empty(EVT_EQ_MODE_IND);
        let event = ModuleEvent::from_frame(&frame);
        assert_eq!(
            event,
            ModuleEvent::Unknown {
                opcode: EVT_EQ_MODE_IND
            }
        );
    }

    #[test]
    fn test_connected_statuses() {
        assert!(is_connected_status(0x06));
        assert!(is_connected_status(0x82));
        assert!(!is_connected_status(0x00));
    }
}
