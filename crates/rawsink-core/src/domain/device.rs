//! Input device identity and capability metadata.
//!
//! # Overview (for beginners)
//!
//! The operating system hands out an opaque handle for every attached input
//! device.  rawsink uses that handle as the device's identity: it is stable
//! while the device stays plugged in, but the OS may hand the same value to a
//! different device after a reconnect.  Nothing here is persisted.
//!
//! Every device belongs to one of three classes (mouse, keyboard, generic HID),
//! and each class reports a different set of capabilities.  [`DeviceInfo`] is a
//! tagged union with one variant per class so callers must handle all three.

use std::fmt;

/// Opaque 64-bit identifier of an attached input device (the OS handle value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// Returns the raw handle value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(value: u64) -> Self {
        DeviceId(value)
    }
}

/// The class of an input device, with the OS type value as discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum InputDeviceType {
    Mouse = 0,
    Keyboard = 1,
    Hid = 2,
}

impl TryFrom<u32> for InputDeviceType {
    type Error = u32;

    /// Converts an OS device type value; any other value is returned as the error.
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InputDeviceType::Mouse),
            1 => Ok(InputDeviceType::Keyboard),
            2 => Ok(InputDeviceType::Hid),
            other => Err(other),
        }
    }
}

impl fmt::Display for InputDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputDeviceType::Mouse => "mouse",
            InputDeviceType::Keyboard => "keyboard",
            InputDeviceType::Hid => "hid",
        };
        f.write_str(name)
    }
}

/// An attached input device: its handle and class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputDevice {
    pub device_id: DeviceId,
    pub device_type: InputDeviceType,
}

impl InputDevice {
    pub fn new(device_id: DeviceId, device_type: InputDeviceType) -> Self {
        Self {
            device_id,
            device_type,
        }
    }

    pub fn is_keyboard(&self) -> bool {
        self.device_type == InputDeviceType::Keyboard
    }
}

/// Keyboard hardware type reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardType {
    /// IBM enhanced (101- or 102-key) keyboard.
    Enhanced101Or102,
    Japanese,
    Korean,
    /// Unknown type or HID keyboard.
    UnknownOrHid,
    /// Any value outside the documented set.
    Other(u32),
}

impl From<u32> for KeyboardType {
    fn from(value: u32) -> Self {
        match value {
            0x4 => KeyboardType::Enhanced101Or102,
            0x7 => KeyboardType::Japanese,
            0x8 => KeyboardType::Korean,
            0x51 => KeyboardType::UnknownOrHid,
            other => KeyboardType::Other(other),
        }
    }
}

impl From<KeyboardType> for u32 {
    fn from(value: KeyboardType) -> Self {
        match value {
            KeyboardType::Enhanced101Or102 => 0x4,
            KeyboardType::Japanese => 0x7,
            KeyboardType::Korean => 0x8,
            KeyboardType::UnknownOrHid => 0x51,
            KeyboardType::Other(other) => other,
        }
    }
}

/// Mouse identification flags reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseIdentification(pub u32);

impl MouseIdentification {
    pub const HID_MOUSE: u32 = 0x0080;
    pub const HID_WHEEL_MOUSE: u32 = 0x0100;
    pub const HORIZONTAL_WHEEL: u32 = 0x8000;

    pub fn is_hid_mouse(self) -> bool {
        self.0 & Self::HID_MOUSE != 0
    }

    pub fn is_hid_wheel_mouse(self) -> bool {
        self.0 & Self::HID_WHEEL_MOUSE != 0
    }

    pub fn has_horizontal_wheel(self) -> bool {
        self.0 & Self::HORIZONTAL_WHEEL != 0
    }
}

/// Capability values for a keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardDeviceInfo {
    pub device: InputDevice,
    pub description: String,
    pub keyboard_type: KeyboardType,
    pub vendor_sub_type: u32,
    pub scan_code_mode: u32,
    pub function_keys: u32,
    pub indicators: u32,
    pub total_keys: u32,
}

/// Capability values for a mouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseDeviceInfo {
    pub device: InputDevice,
    pub description: String,
    pub identification: MouseIdentification,
    pub buttons: u32,
    pub sample_rate: u32,
    pub has_horizontal_wheel: bool,
}

/// Capability values for a generic HID device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDeviceInfo {
    pub device: InputDevice,
    pub description: String,
    pub vendor_id: u32,
    pub product_id: u32,
    pub version_number: u32,
    pub usage_page: u16,
    pub usage: u16,
}

/// Per-class device metadata.
///
/// Built once per enumeration pass.  A newer value for the same device replaces
/// the older one wholesale; values are never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInfo {
    Keyboard(KeyboardDeviceInfo),
    Mouse(MouseDeviceInfo),
    Hid(HidDeviceInfo),
}

impl DeviceInfo {
    pub fn device(&self) -> &InputDevice {
        match self {
            DeviceInfo::Keyboard(info) => &info.device,
            DeviceInfo::Mouse(info) => &info.device,
            DeviceInfo::Hid(info) => &info.device,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            DeviceInfo::Keyboard(info) => &info.description,
            DeviceInfo::Mouse(info) => &info.description,
            DeviceInfo::Hid(info) => &info.description,
        }
    }

    /// Returns the keyboard variant, if this is one.
    pub fn as_keyboard(&self) -> Option<&KeyboardDeviceInfo> {
        match self {
            DeviceInfo::Keyboard(info) => Some(info),
            DeviceInfo::Mouse(_) | DeviceInfo::Hid(_) => None,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self.device();
        write!(f, "{} {} \"{}\"", device.device_id, device.device_type, self.description())?;
        match self {
            DeviceInfo::Keyboard(k) => write!(
                f,
                " type={:?} keys={} function_keys={} indicators={}",
                k.keyboard_type, k.total_keys, k.function_keys, k.indicators
            ),
            DeviceInfo::Mouse(m) => write!(
                f,
                " buttons={} sample_rate={} horizontal_wheel={}",
                m.buttons, m.sample_rate, m.has_horizontal_wheel
            ),
            DeviceInfo::Hid(h) => write!(
                f,
                " vid={:04X} pid={:04X} usage={:02X}:{:02X}",
                h.vendor_id, h.product_id, h.usage_page, h.usage
            ),
        }
    }
}
