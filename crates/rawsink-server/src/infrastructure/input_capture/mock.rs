//! Scripted capture backend for tests.
//!
//! [`ScriptedCapture`] replays a fixed list of raw input notifications through
//! [`handle_raw_input`], exactly as the Windows window procedure does, and then
//! returns.  It never touches the OS, so pipeline tests run on every platform.

use std::collections::HashMap;

use rawsink_core::input::decoder::{RawInputHandle, RawInputHeader, RawInputReader, RawKeyboardReport, RI_KEY_BREAK};
use rawsink_core::input::PlatformError;
use rawsink_core::DeviceId;

use super::{handle_raw_input, CaptureError, CaptureService, StopSignal};
use crate::application::pipeline::EventSink;

#[derive(Debug, Clone, Copy)]
enum Notification {
    Keyboard { device: DeviceId, report: RawKeyboardReport },
    Mouse { device: DeviceId },
    Unreadable,
}

/// In-memory [`RawInputReader`] keyed by notification handle.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    notifications: HashMap<RawInputHandle, Notification>,
}

impl RawInputReader for ScriptedReader {
    fn read_header(&self, handle: RawInputHandle) -> Result<RawInputHeader, PlatformError> {
        let (device_type, device) = match self.notifications.get(&handle) {
            Some(Notification::Keyboard { device, .. }) => (1, *device),
            Some(Notification::Mouse { device }) => (0, *device),
            Some(Notification::Unreadable) | None => {
                return Err(PlatformError::new(format!("no raw input behind handle {}", handle.0)));
            }
        };
        Ok(RawInputHeader {
            device_type,
            device,
            size: 0,
        })
    }

    fn read_keyboard(&self, handle: RawInputHandle, _header: &RawInputHeader) -> Result<RawKeyboardReport, PlatformError> {
        match self.notifications.get(&handle) {
            Some(Notification::Keyboard { report, .. }) => Ok(*report),
            _ => Err(PlatformError::new(format!("handle {} is not a keyboard report", handle.0))),
        }
    }
}

/// A capture backend that delivers a scripted sequence of notifications.
///
/// ```
/// use rawsink_core::DeviceId;
/// use rawsink_server::infrastructure::input_capture::mock::ScriptedCapture;
///
/// let capture = ScriptedCapture::new()
///     .key_down(DeviceId(1), 0x1E, 0)
///     .key_up(DeviceId(1), 0x1E, 0);
/// assert_eq!(capture.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedCapture {
    reader: ScriptedReader,
    order: Vec<RawInputHandle>,
}

impl ScriptedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A make report; `prefix_flags` carries the `E0`/`E1` bits.
    pub fn key_down(self, device: DeviceId, make_code: u16, prefix_flags: u16) -> Self {
        self.keyboard(device, make_code, prefix_flags & !RI_KEY_BREAK)
    }

    /// A break report; `prefix_flags` carries the `E0`/`E1` bits.
    pub fn key_up(self, device: DeviceId, make_code: u16, prefix_flags: u16) -> Self {
        self.keyboard(device, make_code, prefix_flags | RI_KEY_BREAK)
    }

    pub fn mouse(self, device: DeviceId) -> Self {
        self.push(Notification::Mouse { device })
    }

    /// A notification whose header cannot be read.
    pub fn unreadable(self) -> Self {
        self.push(Notification::Unreadable)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn keyboard(self, device: DeviceId, make_code: u16, flags: u16) -> Self {
        self.push(Notification::Keyboard {
            device,
            report: RawKeyboardReport {
                make_code,
                flags,
                ..Default::default()
            },
        })
    }

    fn push(mut self, notification: Notification) -> Self {
        let handle = RawInputHandle(self.order.len() as u64 + 1);
        self.reader.notifications.insert(handle, notification);
        self.order.push(handle);
        self
    }
}

impl CaptureService for ScriptedCapture {
    fn run(&self, sink: &dyn EventSink, stop: &StopSignal) -> Result<(), CaptureError> {
        for handle in &self.order {
            if stop.is_stop_requested() {
                break;
            }
            handle_raw_input(&self.reader, *handle, sink);
        }
        Ok(())
    }
}
