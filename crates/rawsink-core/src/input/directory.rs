//! Device directory: enumerates attached input devices and describes them.
//!
//! # Overview (for beginners)
//!
//! The directory answers two questions for the rest of the program:
//!
//! 1. Which input devices are attached right now? ([`DeviceDirectory::enumerate_devices`])
//! 2. What is this particular device? ([`DeviceDirectory::describe_device`])
//!
//! Both are fail-closed.  A device with an unrecognized class aborts the whole
//! enumeration instead of being skipped, and a description is only produced
//! when the name, the capabilities, *and* the human-readable description could
//! all be read.
//!
//! The known-keyboard table kept by [`DeviceDirectory::refresh_keyboards`] is
//! only ever replaced wholesale, so readers never observe a partial set.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::device::{
    DeviceId, DeviceInfo, HidDeviceInfo, InputDevice, InputDeviceType, KeyboardDeviceInfo, KeyboardType,
    MouseDeviceInfo, MouseIdentification,
};
use crate::input::PlatformError;

/// Registry path under which device instance keys live.
pub const DEVICE_ENUM_ROOT: &str = r"SYSTEM\CurrentControlSet\Enum";

/// One entry from the OS device list: the handle and its raw class value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceEntry {
    pub handle: u64,
    pub type_value: u32,
}

/// Class-specific capability values as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCapabilities {
    Keyboard {
        keyboard_type: u32,
        vendor_sub_type: u32,
        scan_code_mode: u32,
        function_keys: u32,
        indicators: u32,
        total_keys: u32,
    },
    Mouse {
        identification: u32,
        buttons: u32,
        sample_rate: u32,
        has_horizontal_wheel: bool,
    },
    Hid {
        vendor_id: u32,
        product_id: u32,
        version_number: u32,
        usage_page: u16,
        usage: u16,
    },
}

/// OS queries needed by the directory.
#[cfg_attr(test, mockall::automock)]
pub trait DevicePlatform {
    /// Lists every attached input device.
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, PlatformError>;

    /// Returns the device interface name (e.g. `\\?\HID#VID_046D&PID_C31C#...`).
    fn device_name(&self, device: DeviceId) -> Result<String, PlatformError>;

    /// Returns the capability block for the device.
    fn device_capabilities(&self, device: &InputDevice) -> Result<DeviceCapabilities, PlatformError>;

    /// Returns the raw `DeviceDesc` value stored for the device name.
    fn device_description(&self, device_name: &str) -> Result<String, PlatformError>;
}

/// Errors produced by [`DeviceDirectory`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("input device enumeration failed: {0}")]
    Enumeration(String),

    #[error("could not describe device {device}: {reason}")]
    Describe { device: DeviceId, reason: String },
}

/// Maps a device interface name to its configuration key.
///
/// `\\?\HID#VID_046D&PID_C31C&MI_00#7&1a2b&0&0000#{884b96c3-...}` becomes
/// `SYSTEM\CurrentControlSet\Enum\HID\VID_046D&PID_C31C&MI_00\7&1a2b&0&0000`.
/// Returns `None` when the name has fewer than three `#`-separated parts.
pub fn registry_key_for_device_name(device_name: &str) -> Option<String> {
    let stripped = device_name
        .strip_prefix(r"\\?\")
        .or_else(|| device_name.strip_prefix(r"\??\"))
        .unwrap_or(device_name);

    let mut parts = stripped.split('#');
    let class = parts.next().filter(|s| !s.is_empty())?;
    let sub_class = parts.next().filter(|s| !s.is_empty())?;
    let instance = parts.next().filter(|s| !s.is_empty())?;
    Some(format!(r"{DEVICE_ENUM_ROOT}\{class}\{sub_class}\{instance}"))
}

/// Extracts the human-readable part of a `DeviceDesc` value.
///
/// Values look like `@keyboard.inf,%hid_device_system_keyboard%;HID Keyboard Device`;
/// the description is everything after the first `;`.
pub fn parse_device_description(raw: &str) -> Option<&str> {
    let (_, description) = raw.split_once(';')?;
    let description = description.trim();
    (!description.is_empty()).then_some(description)
}

/// Enumerates and describes input devices through a [`DevicePlatform`].
pub struct DeviceDirectory<P> {
    platform: P,
    keyboards: HashMap<DeviceId, KeyboardDeviceInfo>,
}

impl<P: DevicePlatform> DeviceDirectory<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            keyboards: HashMap::new(),
        }
    }

    /// Lists attached devices.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::Enumeration`] if the OS list cannot be read or any
    /// entry carries an unrecognized class value.
    pub fn enumerate_devices(&self) -> Result<Vec<InputDevice>, DirectoryError> {
        let entries = self
            .platform
            .list_devices()
            .map_err(|e| DirectoryError::Enumeration(e.to_string()))?;

        entries
            .into_iter()
            .map(|entry| {
                let device_type = InputDeviceType::try_from(entry.type_value).map_err(|value| {
                    DirectoryError::Enumeration(format!(
                        "device {} reported unrecognized type {value}",
                        DeviceId(entry.handle)
                    ))
                })?;
                Ok(InputDevice::new(DeviceId(entry.handle), device_type))
            })
            .collect()
    }

    /// Builds the [`DeviceInfo`] for one device.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::Describe`] if the name, capability, or description
    /// lookup fails, or if the capabilities belong to a different class.
    pub fn describe_device(&self, device: &InputDevice) -> Result<DeviceInfo, DirectoryError> {
        let describe_err = |reason: String| DirectoryError::Describe {
            device: device.device_id,
            reason,
        };

        let name = self
            .platform
            .device_name(device.device_id)
            .map_err(|e| describe_err(format!("name lookup failed: {e}")))?;
        let capabilities = self
            .platform
            .device_capabilities(device)
            .map_err(|e| describe_err(format!("capability lookup failed: {e}")))?;
        let raw_description = self
            .platform
            .device_description(&name)
            .map_err(|e| describe_err(format!("description lookup for '{name}' failed: {e}")))?;
        let description = parse_device_description(&raw_description)
            .ok_or_else(|| describe_err(format!("malformed description value '{raw_description}'")))?
            .to_string();

        let info = match (device.device_type, capabilities) {
            (
                InputDeviceType::Keyboard,
                DeviceCapabilities::Keyboard {
                    keyboard_type,
                    vendor_sub_type,
                    scan_code_mode,
                    function_keys,
                    indicators,
                    total_keys,
                },
            ) => DeviceInfo::Keyboard(KeyboardDeviceInfo {
                device: *device,
                description,
                keyboard_type: KeyboardType::from(keyboard_type),
                vendor_sub_type,
                scan_code_mode,
                function_keys,
                indicators,
                total_keys,
            }),
            (
                InputDeviceType::Mouse,
                DeviceCapabilities::Mouse {
                    identification,
                    buttons,
                    sample_rate,
                    has_horizontal_wheel,
                },
            ) => DeviceInfo::Mouse(MouseDeviceInfo {
                device: *device,
                description,
                identification: MouseIdentification(identification),
                buttons,
                sample_rate,
                has_horizontal_wheel,
            }),
            (
                InputDeviceType::Hid,
                DeviceCapabilities::Hid {
                    vendor_id,
                    product_id,
                    version_number,
                    usage_page,
                    usage,
                },
            ) => DeviceInfo::Hid(HidDeviceInfo {
                device: *device,
                description,
                vendor_id,
                product_id,
                version_number,
                usage_page,
                usage,
            }),
            (device_type, other) => {
                return Err(describe_err(format!(
                    "{device_type} device returned capabilities of another class: {other:?}"
                )))
            }
        };
        Ok(info)
    }

    /// Describes every attached device.  Fails on the first device that cannot
    /// be described.
    pub fn describe_all(&self) -> Result<Vec<DeviceInfo>, DirectoryError> {
        self.enumerate_devices()?
            .iter()
            .map(|device| self.describe_device(device))
            .collect()
    }

    /// Re-enumerates keyboards and replaces the known-keyboard table.
    ///
    /// On any failure the previous table is kept untouched and the error is
    /// returned.  Returns the number of keyboards now known.
    pub fn refresh_keyboards(&mut self) -> Result<usize, DirectoryError> {
        let devices = match self.enumerate_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Keyboard refresh aborted: {}", e);
                return Err(e);
            }
        };

        let mut fresh = HashMap::new();
        for device in devices.iter().filter(|d| d.is_keyboard()) {
            let info = match self.describe_device(device) {
                Ok(info) => info,
                Err(e) => {
                    warn!("Keyboard refresh aborted: {}", e);
                    return Err(e);
                }
            };
            if let DeviceInfo::Keyboard(keyboard) = info {
                debug!(device = %keyboard.device.device_id, description = %keyboard.description, "Keyboard found");
                fresh.insert(keyboard.device.device_id, keyboard);
            }
        }

        self.keyboards = fresh;
        info!("Known keyboards: {}", self.keyboards.len());
        Ok(self.keyboards.len())
    }

    /// Returns the stored info for a known keyboard.
    pub fn keyboard_info(&self, device: DeviceId) -> Option<&KeyboardDeviceInfo> {
        self.keyboards.get(&device)
    }

    /// Returns all known keyboards ordered by device id.
    pub fn keyboards(&self) -> Vec<&KeyboardDeviceInfo> {
        let mut list: Vec<&KeyboardDeviceInfo> = self.keyboards.values().collect();
        list.sort_by_key(|k| k.device.device_id);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    const KBD_NAME: &str = r"\\?\HID#VID_046D&PID_C31C&MI_00#7&1a2b&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}";

    fn keyboard_caps() -> DeviceCapabilities {
        DeviceCapabilities::Keyboard {
            keyboard_type: 0x4,
            vendor_sub_type: 0,
            scan_code_mode: 1,
            function_keys: 12,
            indicators: 3,
            total_keys: 104,
        }
    }

    fn platform_with_one_keyboard() -> MockDevicePlatform {
        let mut platform = MockDevicePlatform::new();
        platform.expect_list_devices().returning(|| {
            Ok(vec![
                RawDeviceEntry { handle: 0x10, type_value: 1 },
                RawDeviceEntry { handle: 0x20, type_value: 0 },
            ])
        });
        platform
            .expect_device_name()
            .with(eq(DeviceId(0x10)))
            .returning(|_| Ok(KBD_NAME.to_string()));
        platform.expect_device_capabilities().returning(|_| Ok(keyboard_caps()));
        platform
            .expect_device_description()
            .returning(|_| Ok("@keyboard.inf,%hid_device_system_keyboard%;HID Keyboard Device".to_string()));
        platform
    }

    #[test]
    fn test_registry_key_for_device_name_uses_first_three_parts() {
        assert_eq!(
            registry_key_for_device_name(KBD_NAME).as_deref(),
            Some(r"SYSTEM\CurrentControlSet\Enum\HID\VID_046D&PID_C31C&MI_00\7&1a2b&0&0000")
        );
        assert_eq!(
            registry_key_for_device_name(r"\??\ACPI#PNP0303#4&1d401fb5&0#{884b96c3}").as_deref(),
            Some(r"SYSTEM\CurrentControlSet\Enum\ACPI\PNP0303\4&1d401fb5&0")
        );
    }

    #[test]
    fn test_registry_key_for_device_name_rejects_short_names() {
        assert_eq!(registry_key_for_device_name(r"\\?\HID#VID_046D"), None);
        assert_eq!(registry_key_for_device_name(""), None);
    }

    #[test]
    fn test_parse_device_description_takes_text_after_first_semicolon() {
        assert_eq!(
            parse_device_description("@keyboard.inf,%hid_device_system_keyboard%;HID Keyboard Device"),
            Some("HID Keyboard Device")
        );
        assert_eq!(parse_device_description("a;b;c"), Some("b;c"));
        assert_eq!(parse_device_description("no separator"), None);
        assert_eq!(parse_device_description("@x.inf;"), None);
    }

    #[test]
    fn test_enumerate_devices_maps_type_values() {
        // Arrange
        let directory = DeviceDirectory::new(platform_with_one_keyboard());

        // Act
        let devices = directory.enumerate_devices().unwrap();

        // Assert
        assert_eq!(
            devices,
            vec![
                InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard),
                InputDevice::new(DeviceId(0x20), InputDeviceType::Mouse),
            ]
        );
    }

    #[test]
    fn test_enumerate_devices_aborts_on_unrecognized_type() {
        let mut platform = MockDevicePlatform::new();
        platform.expect_list_devices().returning(|| {
            Ok(vec![
                RawDeviceEntry { handle: 0x10, type_value: 1 },
                RawDeviceEntry { handle: 0x30, type_value: 7 },
            ])
        });
        let directory = DeviceDirectory::new(platform);

        let result = directory.enumerate_devices();

        assert!(matches!(result, Err(DirectoryError::Enumeration(msg)) if msg.contains("type 7")));
    }

    #[test]
    fn test_enumerate_devices_propagates_list_failure() {
        let mut platform = MockDevicePlatform::new();
        platform
            .expect_list_devices()
            .returning(|| Err(PlatformError::new("access denied")));
        let directory = DeviceDirectory::new(platform);

        assert_eq!(
            directory.enumerate_devices(),
            Err(DirectoryError::Enumeration("access denied".to_string()))
        );
    }

    #[test]
    fn test_describe_keyboard_builds_keyboard_info() {
        let directory = DeviceDirectory::new(platform_with_one_keyboard());
        let device = InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard);

        let info = directory.describe_device(&device).unwrap();

        let keyboard = info.as_keyboard().expect("keyboard variant");
        assert_eq!(keyboard.description, "HID Keyboard Device");
        assert_eq!(keyboard.keyboard_type, KeyboardType::Enhanced101Or102);
        assert_eq!(keyboard.total_keys, 104);
    }

    #[test]
    fn test_describe_fails_when_description_lookup_fails() {
        let mut platform = MockDevicePlatform::new();
        platform.expect_device_name().returning(|_| Ok(KBD_NAME.to_string()));
        platform.expect_device_capabilities().returning(|_| Ok(keyboard_caps()));
        platform
            .expect_device_description()
            .returning(|_| Err(PlatformError::new("key not found")));
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard);

        let result = directory.describe_device(&device);

        assert!(matches!(result, Err(DirectoryError::Describe { device, .. }) if device == DeviceId(0x10)));
    }

    #[test]
    fn test_describe_fails_when_name_lookup_fails() {
        let mut platform = MockDevicePlatform::new();
        platform
            .expect_device_name()
            .returning(|_| Err(PlatformError::new("invalid handle")));
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard);

        assert!(matches!(directory.describe_device(&device), Err(DirectoryError::Describe { .. })));
    }

    #[test]
    fn test_describe_fails_when_capability_lookup_fails() {
        // Arrange
        let mut platform = MockDevicePlatform::new();
        platform.expect_device_name().returning(|_| Ok(KBD_NAME.to_string()));
        platform
            .expect_device_capabilities()
            .returning(|_| Err(PlatformError::new("device removed")));
        platform.expect_device_description().never();
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard);

        // Act
        let result = directory.describe_device(&device);

        // Assert
        assert!(matches!(
            result,
            Err(DirectoryError::Describe { device, reason })
                if device == DeviceId(0x10) && reason.contains("device removed")
        ));
    }

    #[test]
    fn test_describe_mouse_builds_mouse_info() {
        // Arrange
        let mut platform = MockDevicePlatform::new();
        platform
            .expect_device_name()
            .returning(|_| Ok(r"\\?\HID#VID_046D&PID_C077#7&2a3b&0&0000#{378de44c}".to_string()));
        platform.expect_device_capabilities().returning(|_| {
            Ok(DeviceCapabilities::Mouse {
                identification: MouseIdentification::HID_WHEEL_MOUSE,
                buttons: 5,
                sample_rate: 125,
                has_horizontal_wheel: true,
            })
        });
        platform
            .expect_device_description()
            .returning(|_| Ok("@msmouse.inf,%hid.mousedevice%;HID-compliant mouse".to_string()));
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x20), InputDeviceType::Mouse);

        // Act
        let info = directory.describe_device(&device).unwrap();

        // Assert
        let DeviceInfo::Mouse(mouse) = info else {
            panic!("expected mouse info, got {info:?}");
        };
        assert_eq!(mouse.device, device);
        assert_eq!(mouse.description, "HID-compliant mouse");
        assert_eq!(mouse.identification, MouseIdentification(MouseIdentification::HID_WHEEL_MOUSE));
        assert_eq!(mouse.buttons, 5);
        assert_eq!(mouse.sample_rate, 125);
        assert!(mouse.has_horizontal_wheel);
    }

    #[test]
    fn test_describe_hid_builds_hid_info() {
        let mut platform = MockDevicePlatform::new();
        platform
            .expect_device_name()
            .returning(|_| Ok(r"\\?\HID#VID_054C&PID_09CC&MI_03#8&1f&0&0000#{4d1e55b2}".to_string()));
        platform.expect_device_capabilities().returning(|_| {
            Ok(DeviceCapabilities::Hid {
                vendor_id: 0x054C,
                product_id: 0x09CC,
                version_number: 0x0100,
                usage_page: 0x01,
                usage: 0x05,
            })
        });
        platform
            .expect_device_description()
            .returning(|_| Ok("@input.inf,%hid_device_system_game%;HID-compliant game controller".to_string()));
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x30), InputDeviceType::Hid);

        let info = directory.describe_device(&device).unwrap();

        let DeviceInfo::Hid(hid) = info else {
            panic!("expected HID info, got {info:?}");
        };
        assert_eq!(hid.description, "HID-compliant game controller");
        assert_eq!((hid.vendor_id, hid.product_id, hid.version_number), (0x054C, 0x09CC, 0x0100));
        assert_eq!((hid.usage_page, hid.usage), (0x01, 0x05));
    }

    #[test]
    fn test_describe_fails_on_description_without_separator() {
        let mut platform = MockDevicePlatform::new();
        platform.expect_device_name().returning(|_| Ok(KBD_NAME.to_string()));
        platform.expect_device_capabilities().returning(|_| Ok(keyboard_caps()));
        platform
            .expect_device_description()
            .returning(|_| Ok("Keyboard".to_string()));
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard);

        assert!(matches!(directory.describe_device(&device), Err(DirectoryError::Describe { .. })));
    }

    #[test]
    fn test_describe_rejects_capabilities_of_another_class() {
        let mut platform = MockDevicePlatform::new();
        platform.expect_device_name().returning(|_| Ok(KBD_NAME.to_string()));
        platform.expect_device_capabilities().returning(|_| {
            Ok(DeviceCapabilities::Mouse {
                identification: 0x80,
                buttons: 3,
                sample_rate: 100,
                has_horizontal_wheel: false,
            })
        });
        platform
            .expect_device_description()
            .returning(|_| Ok("@x;Mouse".to_string()));
        let directory = DeviceDirectory::new(platform);
        let device = InputDevice::new(DeviceId(0x10), InputDeviceType::Keyboard);

        assert!(matches!(directory.describe_device(&device), Err(DirectoryError::Describe { .. })));
    }

    #[test]
    fn test_refresh_keyboards_stores_only_keyboards() {
        // Arrange
        let mut directory = DeviceDirectory::new(platform_with_one_keyboard());

        // Act
        let count = directory.refresh_keyboards().unwrap();

        // Assert
        assert_eq!(count, 1);
        assert!(directory.keyboard_info(DeviceId(0x10)).is_some());
        assert!(directory.keyboard_info(DeviceId(0x20)).is_none());
        assert_eq!(directory.keyboards().len(), 1);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_table() {
        // Arrange: first refresh succeeds, second fails during description.
        let mut platform = MockDevicePlatform::new();
        platform
            .expect_list_devices()
            .returning(|| Ok(vec![RawDeviceEntry { handle: 0x10, type_value: 1 }]));
        platform.expect_device_name().returning(|_| Ok(KBD_NAME.to_string()));
        platform.expect_device_capabilities().returning(|_| Ok(keyboard_caps()));
        let mut calls = 0;
        platform.expect_device_description().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok("@x;HID Keyboard Device".to_string())
            } else {
                Err(PlatformError::new("registry unavailable"))
            }
        });
        let mut directory = DeviceDirectory::new(platform);
        directory.refresh_keyboards().unwrap();

        // Act
        let result = directory.refresh_keyboards();

        // Assert
        assert!(result.is_err());
        assert_eq!(
            directory.keyboard_info(DeviceId(0x10)).map(|k| k.description.as_str()),
            Some("HID Keyboard Device")
        );
    }
}
