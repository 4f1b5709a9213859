//! Raw event decoder: turns one raw input notification into a [`KeyboardEvent`].
//!
//! # Overview (for beginners)
//!
//! Every raw input notification carries an opaque handle.  The decoder asks the
//! OS (through [`RawInputReader`]) for the header behind that handle, checks
//! which device class produced it, and for keyboards reads the report and
//! converts it into a layout-independent [`ScanCode`] plus a press/release flag.
//!
//! Mouse and HID notifications are recognized but not translated; they decode
//! to `Ok(None)`.
//!
//! # Scan code normalization
//!
//! The keyboard report carries the bare make code and a set of prefix flags.
//! When the `E0` flag is set the make code is folded into `0xE0xx` before the
//! table lookup, which is what distinguishes Right Ctrl (`0xE01D`) from Left
//! Ctrl (`0x001D`).  `E1`-prefixed reports (only Pause/Break) and make codes
//! outside the table decode to [`ScanCode::Unknown`].  A key that is not in the
//! table never makes decoding fail.

use thiserror::Error;

use crate::domain::device::{DeviceId, InputDeviceType};
use crate::domain::event::KeyboardEvent;
use crate::input::PlatformError;
use crate::keymap::ScanCode;

/// Report flag: the key was released.
pub const RI_KEY_BREAK: u16 = 0x0001;
/// Report flag: the make code was preceded by an `E0` prefix byte.
pub const RI_KEY_E0: u16 = 0x0002;
/// Report flag: the make code was preceded by an `E1` prefix byte.
pub const RI_KEY_E1: u16 = 0x0004;

/// Opaque handle delivered with a raw input notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawInputHandle(pub u64);

/// Header common to every raw input notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputHeader {
    /// Raw class value (`0` mouse, `1` keyboard, `2` HID).
    pub device_type: u32,
    pub device: DeviceId,
    /// Size in bytes of the full notification payload.
    pub size: u32,
}

/// The keyboard-specific payload of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawKeyboardReport {
    pub make_code: u16,
    pub flags: u16,
}

impl RawKeyboardReport {
    pub fn is_break(&self) -> bool {
        self.flags & RI_KEY_BREAK != 0
    }

    /// Returns the normalized scan code for this report.
    pub fn scan_code(&self) -> ScanCode {
        if self.flags & RI_KEY_E1 != 0 {
            return ScanCode::Unknown;
        }
        let value = if self.flags & RI_KEY_E0 != 0 {
            ScanCode::E0_PREFIX | (self.make_code & 0x00FF)
        } else {
            self.make_code
        };
        ScanCode::from_u16(value)
    }
}

/// OS queries needed to decode one notification.
pub trait RawInputReader {
    fn read_header(&self, handle: RawInputHandle) -> Result<RawInputHeader, PlatformError>;

    fn read_keyboard(&self, handle: RawInputHandle, header: &RawInputHeader) -> Result<RawKeyboardReport, PlatformError>;
}

/// Errors produced by [`decode`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("could not read raw input header: {0}")]
    Header(PlatformError),

    #[error("raw input header has unrecognized device type {0}")]
    UnknownDeviceType(u32),

    #[error("could not read keyboard report from device {device}: {source}")]
    Payload {
        device: DeviceId,
        #[source]
        source: PlatformError,
    },
}

/// Decodes one notification.
///
/// Returns `Ok(None)` for mouse and HID notifications.
///
/// # Errors
///
/// Fails when the header cannot be read, the header's device type is not one of
/// the three known classes, or the keyboard payload cannot be read.
pub fn decode<R>(reader: &R, handle: RawInputHandle) -> Result<Option<KeyboardEvent>, DecodeError>
where
    R: RawInputReader + ?Sized,
{
    let header = reader.read_header(handle).map_err(DecodeError::Header)?;
    let device_type = InputDeviceType::try_from(header.device_type).map_err(DecodeError::UnknownDeviceType)?;

    match device_type {
        InputDeviceType::Keyboard => {
            let report = reader
                .read_keyboard(handle, &header)
                .map_err(|source| DecodeError::Payload {
                    device: header.device,
                    source,
                })?;
            Ok(Some(KeyboardEvent {
                source_device_id: header.device,
                scan_code: report.scan_code(),
                is_key_down: !report.is_break(),
            }))
        }
        InputDeviceType::Mouse | InputDeviceType::Hid => Ok(None),
    }
}
