//! Windows Raw Input capture implementation.
//!
//! A hidden message-only window is registered as the Raw Input target for the
//! generic-desktop keyboard collection with `RIDEV_INPUTSINK` (deliver input
//! even when another application has focus) and `RIDEV_NOLEGACY` (suppress the
//! legacy `WM_KEYDOWN`/`WM_KEYUP` messages for this window).  The window
//! procedure decodes every `WM_INPUT` and enqueues the result, then lets
//! `DefWindowProcW` release the input buffer.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::ffi::c_void;
use std::mem::size_of;

use rawsink_core::input::decoder::{RawInputHandle, RawInputHeader, RawInputReader, RawKeyboardReport};
use rawsink_core::input::directory::{
    registry_key_for_device_name, DeviceCapabilities, DeviceDirectory, DevicePlatform, RawDeviceEntry,
};
use rawsink_core::input::PlatformError;
use rawsink_core::{DeviceId, InputDevice, InputDeviceType};
use tracing::{debug, info, warn};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{ERROR_SUCCESS, HANDLE, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::{
    GetRawInputData, GetRawInputDeviceInfoW, GetRawInputDeviceList, RegisterRawInputDevices, HRAWINPUT, RAWINPUT,
    RAWINPUTDEVICE, RAWINPUTDEVICELIST, RAWINPUTDEVICE_FLAGS, RAWINPUTHEADER, RIDEV_INPUTSINK, RIDEV_NOLEGACY, RIDEV_REMOVE,
    RIDI_DEVICEINFO, RIDI_DEVICENAME, RID_DEVICE_INFO, RID_HEADER, RID_INPUT, RIM_TYPEHID, RIM_TYPEKEYBOARD,
    RIM_TYPEMOUSE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, GetWindowLongPtrW,
    PostThreadMessageW, RegisterClassW, SetWindowLongPtrW, TranslateMessage, UnregisterClassW, GWLP_USERDATA,
    HWND_MESSAGE, MSG, WM_INPUT, WM_QUIT, WNDCLASSW, WS_EX_NOACTIVATE, WS_POPUP,
};

use super::{handle_raw_input, CaptureError, CaptureService, StopSignal};
use crate::application::pipeline::EventSink;

/// HID usage page for generic desktop controls.
const USAGE_PAGE_GENERIC_DESKTOP: u16 = 0x01;
/// HID usage for keyboards within the generic desktop page.
const USAGE_KEYBOARD: u16 = 0x06;

const WINDOW_CLASS: PCWSTR = w!("RawsinkInputWindow");

/// Error value returned by the `GetRawInput*` family.
const RAW_INPUT_ERROR: u32 = u32::MAX;

fn to_handle(device: DeviceId) -> HANDLE {
    HANDLE(device.as_u64() as usize as *mut c_void)
}

fn to_device_id(handle: HANDLE) -> DeviceId {
    DeviceId(handle.0 as usize as u64)
}

// ── Device directory backend ──────────────────────────────────────────────────

/// [`DevicePlatform`] backed by `GetRawInputDeviceList`,
/// `GetRawInputDeviceInfoW` and the `HKLM` device configuration keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsDevicePlatform;

impl DevicePlatform for WindowsDevicePlatform {
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, PlatformError> {
        let entry_size = size_of::<RAWINPUTDEVICELIST>() as u32;
        let mut count = 0u32;

        // SAFETY: a null list pointer asks only for the device count.
        if unsafe { GetRawInputDeviceList(None, &mut count, entry_size) } == RAW_INPUT_ERROR {
            return Err(PlatformError::new(format!(
                "GetRawInputDeviceList count query failed: {}",
                windows::core::Error::from_win32()
            )));
        }

        let mut list = vec![RAWINPUTDEVICELIST::default(); count as usize];
        // SAFETY: `list` holds `count` entries of `entry_size` bytes each.
        let written = unsafe { GetRawInputDeviceList(Some(list.as_mut_ptr()), &mut count, entry_size) };
        if written == RAW_INPUT_ERROR {
            return Err(PlatformError::new(format!(
                "GetRawInputDeviceList failed: {}",
                windows::core::Error::from_win32()
            )));
        }
        list.truncate(written as usize);

        Ok(list
            .iter()
            .map(|entry| RawDeviceEntry {
                handle: to_device_id(entry.hDevice).as_u64(),
                type_value: entry.dwType.0,
            })
            .collect())
    }

    fn device_name(&self, device: DeviceId) -> Result<String, PlatformError> {
        let handle = to_handle(device);
        let mut chars = 0u32;

        // SAFETY: a null buffer asks only for the name length in characters.
        let status = unsafe { GetRawInputDeviceInfoW(handle, RIDI_DEVICENAME, None, &mut chars) };
        if status == RAW_INPUT_ERROR || chars == 0 {
            return Err(PlatformError::new(format!("device name length query failed for {device}")));
        }

        let mut buf = vec![0u16; chars as usize];
        // SAFETY: `buf` holds `chars` UTF-16 units.
        let copied = unsafe {
            GetRawInputDeviceInfoW(handle, RIDI_DEVICENAME, Some(buf.as_mut_ptr().cast()), &mut chars)
        };
        if copied == RAW_INPUT_ERROR {
            return Err(PlatformError::new(format!("device name query failed for {device}")));
        }

        let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        Ok(String::from_utf16_lossy(&buf[..end]))
    }

    fn device_capabilities(&self, device: &InputDevice) -> Result<DeviceCapabilities, PlatformError> {
        let mut info = RID_DEVICE_INFO {
            cbSize: size_of::<RID_DEVICE_INFO>() as u32,
            ..Default::default()
        };
        let mut size = info.cbSize;

        // SAFETY: `info` is a properly sized RID_DEVICE_INFO with cbSize set.
        let copied = unsafe {
            GetRawInputDeviceInfoW(
                to_handle(device.device_id),
                RIDI_DEVICEINFO,
                Some((&mut info as *mut RID_DEVICE_INFO).cast()),
                &mut size,
            )
        };
        if copied == RAW_INPUT_ERROR {
            return Err(PlatformError::new(format!(
                "device info query failed for {}",
                device.device_id
            )));
        }

        // SAFETY: the active union member is selected by `dwType`, checked
        // against the expected class in each arm.
        let caps = unsafe {
            match (device.device_type, info.dwType) {
                (InputDeviceType::Keyboard, t) if t == RIM_TYPEKEYBOARD => {
                    let k = info.Anonymous.keyboard;
                    DeviceCapabilities::Keyboard {
                        keyboard_type: k.dwType,
                        vendor_sub_type: k.dwSubType,
                        scan_code_mode: k.dwKeyboardMode,
                        function_keys: k.dwNumberOfFunctionKeys,
                        indicators: k.dwNumberOfIndicators,
                        total_keys: k.dwNumberOfKeysTotal,
                    }
                }
                (InputDeviceType::Mouse, t) if t == RIM_TYPEMOUSE => {
                    let m = info.Anonymous.mouse;
                    DeviceCapabilities::Mouse {
                        identification: m.dwId,
                        buttons: m.dwNumberOfButtons,
                        sample_rate: m.dwSampleRate,
                        has_horizontal_wheel: m.fHasHorizontalWheel.as_bool(),
                    }
                }
                (InputDeviceType::Hid, t) if t == RIM_TYPEHID => {
                    let h = info.Anonymous.hid;
                    DeviceCapabilities::Hid {
                        vendor_id: h.dwVendorId,
                        product_id: h.dwProductId,
                        version_number: h.dwVersionNumber,
                        usage_page: h.usUsagePage,
                        usage: h.usUsage,
                    }
                }
                (expected, actual) => {
                    return Err(PlatformError::new(format!(
                        "{expected} device {} reported info of type {}",
                        device.device_id, actual.0
                    )))
                }
            }
        };
        Ok(caps)
    }

    fn device_description(&self, device_name: &str) -> Result<String, PlatformError> {
        let key = registry_key_for_device_name(device_name)
            .ok_or_else(|| PlatformError::new(format!("malformed device name '{device_name}'")))?;
        let key_wide: Vec<u16> = key.encode_utf16().chain(std::iter::once(0)).collect();
        let key_ptr = PCWSTR(key_wide.as_ptr());
        let value = w!("DeviceDesc");

        let mut bytes = 0u32;
        // SAFETY: null data pointer; only the required size is written.
        let status = unsafe { RegGetValueW(HKEY_LOCAL_MACHINE, key_ptr, value, RRF_RT_REG_SZ, None, None, Some(&mut bytes)) };
        if status != ERROR_SUCCESS {
            return Err(PlatformError::new(format!("DeviceDesc size query for '{key}' failed: {status:?}")));
        }

        let mut buf = vec![0u16; (bytes as usize).div_ceil(2)];
        // SAFETY: `buf` provides at least `bytes` bytes of storage.
        let status = unsafe {
            RegGetValueW(
                HKEY_LOCAL_MACHINE,
                key_ptr,
                value,
                RRF_RT_REG_SZ,
                None,
                Some(buf.as_mut_ptr().cast()),
                Some(&mut bytes),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(PlatformError::new(format!("DeviceDesc read for '{key}' failed: {status:?}")));
        }

        let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        Ok(String::from_utf16_lossy(&buf[..end]))
    }
}

// ── Notification reader ───────────────────────────────────────────────────────

/// [`RawInputReader`] backed by `GetRawInputData`.
///
/// Only valid while the `WM_INPUT` message that carried the handle is being
/// processed.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRawInputReader;

fn to_hrawinput(handle: RawInputHandle) -> HRAWINPUT {
    HRAWINPUT(handle.0 as usize as *mut c_void)
}

impl RawInputReader for WindowsRawInputReader {
    fn read_header(&self, handle: RawInputHandle) -> Result<RawInputHeader, PlatformError> {
        let mut header = RAWINPUTHEADER::default();
        let header_size = size_of::<RAWINPUTHEADER>() as u32;
        let mut size = header_size;

        // SAFETY: `header` is a RAWINPUTHEADER and `size` matches it.
        let copied = unsafe {
            GetRawInputData(
                to_hrawinput(handle),
                RID_HEADER,
                Some((&mut header as *mut RAWINPUTHEADER).cast()),
                &mut size,
                header_size,
            )
        };
        if copied == RAW_INPUT_ERROR || copied < header_size {
            return Err(PlatformError::new(format!(
                "GetRawInputData(RID_HEADER) failed: {}",
                windows::core::Error::from_win32()
            )));
        }

        Ok(RawInputHeader {
            device_type: header.dwType,
            device: to_device_id(header.hDevice),
            size: header.dwSize,
        })
    }

    fn read_keyboard(&self, handle: RawInputHandle, header: &RawInputHeader) -> Result<RawKeyboardReport, PlatformError> {
        let mut raw = RAWINPUT::default();
        let header_size = size_of::<RAWINPUTHEADER>() as u32;
        let mut size = size_of::<RAWINPUT>() as u32;

        // SAFETY: a keyboard notification always fits in one RAWINPUT.
        let copied = unsafe {
            GetRawInputData(
                to_hrawinput(handle),
                RID_INPUT,
                Some((&mut raw as *mut RAWINPUT).cast()),
                &mut size,
                header_size,
            )
        };
        if copied == RAW_INPUT_ERROR || copied < header.size.min(size) {
            return Err(PlatformError::new(format!(
                "GetRawInputData(RID_INPUT) returned {copied} of {} bytes",
                header.size
            )));
        }

        // SAFETY: the header identified this notification as a keyboard report.
        let keyboard = unsafe { raw.data.keyboard };
        Ok(RawKeyboardReport {
            make_code: keyboard.MakeCode,
            flags: keyboard.Flags,
        })
    }
}

// ── Capture service ───────────────────────────────────────────────────────────

/// State the window procedure reaches through `GWLP_USERDATA`.
struct WindowContext<'a> {
    reader: WindowsRawInputReader,
    sink: &'a dyn EventSink,
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_INPUT {
        // SAFETY: the pointer is set by `run_message_loop` to a context that
        // outlives the window's message loop, and cleared before it is dropped.
        let context = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const WindowContext<'_>;
        if let Some(context) = unsafe { context.as_ref() } {
            handle_raw_input(&context.reader, RawInputHandle(lparam.0 as usize as u64), context.sink);
        }
    }
    // SAFETY: DefWindowProcW also performs the required raw input cleanup.
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// Raw Input keyboard capture on a hidden message-only window.
#[derive(Debug, Default)]
pub struct RawInputCapture {
    verbose: bool,
}

impl RawInputCapture {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn log_keyboards(&self) {
        let mut directory = DeviceDirectory::new(WindowsDevicePlatform);
        if directory.refresh_keyboards().is_err() {
            // Already logged by the directory; capture works without the table.
            return;
        }
        for keyboard in directory.keyboards() {
            if self.verbose {
                info!("Keyboard {}: {}", keyboard.device.device_id, keyboard.description);
            } else {
                debug!("Keyboard {}: {}", keyboard.device.device_id, keyboard.description);
            }
        }
    }
}

impl CaptureService for RawInputCapture {
    fn run(&self, sink: &dyn EventSink, stop: &StopSignal) -> Result<(), CaptureError> {
        self.log_keyboards();

        // SAFETY: GetModuleHandleW(None) returns the current executable's handle.
        let instance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| CaptureError::WindowCreationFailed(format!("GetModuleHandleW: {e}")))?
            .into();

        let class = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: instance,
            lpszClassName: WINDOW_CLASS,
            ..Default::default()
        };
        // SAFETY: `class` references a static class name and a valid wndproc.
        if unsafe { RegisterClassW(&class) } == 0 {
            return Err(CaptureError::WindowCreationFailed(format!(
                "RegisterClassW: {}",
                windows::core::Error::from_win32()
            )));
        }

        // SAFETY: the class was registered above; HWND_MESSAGE makes the
        // window message-only, so it is never shown.
        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_NOACTIVATE,
                WINDOW_CLASS,
                w!("rawsink"),
                WS_POPUP,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                None,
                instance,
                None,
            )
        };
        let hwnd = match hwnd {
            Ok(hwnd) if !hwnd.is_invalid() => hwnd,
            Ok(_) => {
                unregister_class(instance);
                return Err(CaptureError::WindowCreationFailed("CreateWindowExW returned an invalid HWND".to_string()));
            }
            Err(e) => {
                unregister_class(instance);
                return Err(CaptureError::WindowCreationFailed(format!("CreateWindowExW: {e}")));
            }
        };

        let result = run_message_loop(hwnd, sink, stop);

        // SAFETY: the window was created on this thread and its loop has ended.
        unsafe {
            let _ = DestroyWindow(hwnd);
        }
        unregister_class(instance);
        result
    }
}

fn unregister_class(instance: HINSTANCE) {
    // SAFETY: unregistering a class this module registered; failure is harmless.
    unsafe {
        let _ = UnregisterClassW(WINDOW_CLASS, instance);
    }
}

fn keyboard_registration(hwnd: HWND, flags: RAWINPUTDEVICE_FLAGS) -> RAWINPUTDEVICE {
    RAWINPUTDEVICE {
        usUsagePage: USAGE_PAGE_GENERIC_DESKTOP,
        usUsage: USAGE_KEYBOARD,
        dwFlags: flags,
        hwndTarget: hwnd,
    }
}

/// Registers for keyboard input, pumps messages until `WM_QUIT`, and removes
/// the registration again.
fn run_message_loop(hwnd: HWND, sink: &dyn EventSink, stop: &StopSignal) -> Result<(), CaptureError> {
    let context = WindowContext {
        reader: WindowsRawInputReader,
        sink,
    };
    // SAFETY: `context` lives on this stack frame until after the pointer is
    // cleared below; the window procedure only runs on this thread.
    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, &context as *const WindowContext<'_> as isize);
    }

    let registration = [keyboard_registration(hwnd, RIDEV_NOLEGACY | RIDEV_INPUTSINK)];
    // SAFETY: `registration` is a valid one-element RAWINPUTDEVICE array.
    let registered = unsafe { RegisterRawInputDevices(&registration, size_of::<RAWINPUTDEVICE>() as u32) };
    if let Err(e) = registered {
        // SAFETY: see above.
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
        }
        return Err(CaptureError::RegistrationFailed(e.to_string()));
    }

    // SAFETY: trivially safe thread id query.
    let thread_id = unsafe { GetCurrentThreadId() };
    let keep_running = stop.install_waker(move || {
        // SAFETY: posting WM_QUIT to a thread id is valid even after it exits.
        if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!("could not wake raw input message loop: {e}");
        }
    });

    if keep_running {
        info!("Raw keyboard input registered; message loop running");
        let mut msg = MSG::default();
        // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
        unsafe {
            while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        debug!("raw input message loop ended");
    }

    stop.clear_waker();

    let removal = [keyboard_registration(HWND::default(), RIDEV_REMOVE)];
    // SAFETY: removal entries carry a null target window as required.
    if let Err(e) = unsafe { RegisterRawInputDevices(&removal, size_of::<RAWINPUTDEVICE>() as u32) } {
        debug!("raw input unregistration failed: {e}");
    }
    // SAFETY: see above.
    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
    }
    Ok(())
}
