//! Binary codec for the rawsink key event datagram.
//!
//! Wire format:
//! ```text
//! [event_type:1][device_id:8][scan_code:2]
//! ```
//! Total size: 11 bytes. Multi-byte integers are little-endian.
//! `event_type` is `0x00` for key up and `0x01` for key down.

use thiserror::Error;

use crate::domain::device::DeviceId;
use crate::domain::event::{KeyEventType, KeyboardEvent};
use crate::keymap::ScanCode;

/// Exact size of every encoded message.
pub const WIRE_MESSAGE_LEN: usize = 11;

const DEVICE_ID_OFFSET: usize = 1;
const SCAN_CODE_OFFSET: usize = 9;

/// Errors that can occur while decoding a received datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The datagram is not exactly [`WIRE_MESSAGE_LEN`] bytes long.
    #[error("invalid message length: expected 11 bytes, got {0}")]
    InvalidLength(usize),

    /// The first byte is neither key up nor key down.
    #[error("unknown event type: 0x{0:02X}")]
    UnknownEventType(u8),
}

/// A decoded datagram.
///
/// `raw_scan_code` keeps the exact 16-bit value from the wire so receivers can
/// see codes newer than their own table; `scan_code` is the table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireMessage {
    pub event_type: KeyEventType,
    pub device_id: DeviceId,
    pub raw_scan_code: u16,
    pub scan_code: ScanCode,
}

impl WireMessage {
    pub fn is_key_down(&self) -> bool {
        self.event_type == KeyEventType::KeyDown
    }

    /// Converts back into a [`KeyboardEvent`].
    pub fn to_event(&self) -> KeyboardEvent {
        KeyboardEvent {
            source_device_id: self.device_id,
            scan_code: self.scan_code,
            is_key_down: self.is_key_down(),
        }
    }
}

/// Encodes a [`KeyboardEvent`] into its 11-byte wire form.
///
/// # Examples
///
/// ```rust
/// use rawsink_core::{encode_message, DeviceId, KeyboardEvent, ScanCode};
///
/// let bytes = encode_message(&KeyboardEvent::down(DeviceId(0x0102), ScanCode::KeyA));
/// assert_eq!(bytes, [0x01, 0x02, 0x01, 0, 0, 0, 0, 0, 0, 0x1E, 0x00]);
/// ```
pub fn encode_message(event: &KeyboardEvent) -> [u8; WIRE_MESSAGE_LEN] {
    let mut buf = [0u8; WIRE_MESSAGE_LEN];
    buf[0] = event.event_type() as u8;
    buf[DEVICE_ID_OFFSET..SCAN_CODE_OFFSET].copy_from_slice(&event.source_device_id.as_u64().to_le_bytes());
    buf[SCAN_CODE_OFFSET..].copy_from_slice(&event.scan_code.as_u16().to_le_bytes());
    buf
}

/// Decodes a received datagram.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the length is not 11 or the event type byte is
/// not `0x00`/`0x01`.
pub fn decode_message(bytes: &[u8]) -> Result<WireMessage, ProtocolError> {
    let bytes: &[u8; WIRE_MESSAGE_LEN] = bytes
        .try_into()
        .map_err(|_| ProtocolError::InvalidLength(bytes.len()))?;

    let event_type = KeyEventType::try_from(bytes[0]).map_err(ProtocolError::UnknownEventType)?;

    let mut id = [0u8; 8];
    id.copy_from_slice(&bytes[DEVICE_ID_OFFSET..SCAN_CODE_OFFSET]);
    let raw_scan_code = u16::from_le_bytes([bytes[SCAN_CODE_OFFSET], bytes[SCAN_CODE_OFFSET + 1]]);

    Ok(WireMessage {
        event_type,
        device_id: DeviceId(u64::from_le_bytes(id)),
        raw_scan_code,
        scan_code: ScanCode::from_u16(raw_scan_code),
    })
}
