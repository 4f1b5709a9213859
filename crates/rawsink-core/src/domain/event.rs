//! The semantic keyboard event produced by the decoder.

use std::fmt;

use crate::domain::device::DeviceId;
use crate::keymap::ScanCode;

/// Direction of a key transition, with its on-wire byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyEventType {
    KeyUp = 0x00,
    KeyDown = 0x01,
}

impl KeyEventType {
    /// Returns the event type for a press (`true`) or release (`false`).
    pub fn from_key_down(is_key_down: bool) -> Self {
        if is_key_down {
            KeyEventType::KeyDown
        } else {
            KeyEventType::KeyUp
        }
    }
}

impl TryFrom<u8> for KeyEventType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(KeyEventType::KeyUp),
            0x01 => Ok(KeyEventType::KeyDown),
            other => Err(other),
        }
    }
}

/// One key press or release from one physical keyboard.
///
/// Created by the decoder, consumed by the drain loop, never retained past the
/// iteration that processes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// The OS handle of the keyboard that produced the report.
    pub source_device_id: DeviceId,
    /// The normalized key identifier.
    pub scan_code: ScanCode,
    /// `true` for a press, `false` for a release.
    pub is_key_down: bool,
}

impl KeyboardEvent {
    /// Creates a key-down event.
    pub fn down(source_device_id: DeviceId, scan_code: ScanCode) -> Self {
        Self {
            source_device_id,
            scan_code,
            is_key_down: true,
        }
    }

    /// Creates a key-up event.
    pub fn up(source_device_id: DeviceId, scan_code: ScanCode) -> Self {
        Self {
            source_device_id,
            scan_code,
            is_key_down: false,
        }
    }

    /// Returns the wire event type for this event.
    pub fn event_type(&self) -> KeyEventType {
        KeyEventType::from_key_down(self.is_key_down)
    }
}

impl fmt::Display for KeyboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.is_key_down { "down" } else { "up" };
        write!(f, "{direction} {:?} ({})", self.scan_code, self.source_device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_try_from_accepts_only_zero_and_one() {
        assert_eq!(KeyEventType::try_from(0x00), Ok(KeyEventType::KeyUp));
        assert_eq!(KeyEventType::try_from(0x01), Ok(KeyEventType::KeyDown));
        assert_eq!(KeyEventType::try_from(0x02), Err(0x02));
        assert_eq!(KeyEventType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_constructors_set_direction() {
        let id = DeviceId(0x1234);
        assert!(KeyboardEvent::down(id, ScanCode::KeyA).is_key_down);
        assert!(!KeyboardEvent::up(id, ScanCode::KeyA).is_key_down);
        assert_eq!(KeyboardEvent::down(id, ScanCode::KeyA).event_type(), KeyEventType::KeyDown);
        assert_eq!(KeyboardEvent::up(id, ScanCode::KeyA).event_type(), KeyEventType::KeyUp);
    }

    #[test]
    fn test_display_names_direction_key_and_device() {
        let event = KeyboardEvent::down(DeviceId(0x10), ScanCode::Enter);
        assert_eq!(event.to_string(), "down Enter (0x0000000000000010)");
    }
}
