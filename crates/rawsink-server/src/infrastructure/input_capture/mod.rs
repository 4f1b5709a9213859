//! Raw keyboard input capture.
//!
//! On Windows this registers a hidden message-only window for Raw Input
//! keyboard reports (`RIDEV_INPUTSINK | RIDEV_NOLEGACY`, usage page 0x01 /
//! usage 0x06) and runs its message loop on the calling thread.  Each
//! `WM_INPUT` notification is decoded and handed to an [`EventSink`]; nothing
//! else happens on the message thread.
//!
//! # Testability
//!
//! The [`CaptureService`] trait lets the binary and tests drive a capture
//! backend without caring which one it is.  [`mock::ScriptedCapture`] replays
//! scripted notifications through the same decode path the Windows backend
//! uses.
//!
//! On platforms without Raw Input every entry point returns
//! [`CaptureError::UnsupportedPlatform`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rawsink_core::input::decoder::{self, RawInputHandle, RawInputReader};
use rawsink_core::input::directory::DirectoryError;
use rawsink_core::DeviceInfo;
use tracing::debug;

use crate::application::pipeline::EventSink;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to create raw input window: {0}")]
    WindowCreationFailed(String),
    #[error("failed to register for raw keyboard input: {0}")]
    RegistrationFailed(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Runs a capture backend until it is stopped.
pub trait CaptureService {
    /// Delivers every decoded keyboard event to `sink` until `stop` is
    /// requested or the OS ends the message loop.  Blocks the calling thread.
    fn run(&self, sink: &dyn EventSink, stop: &StopSignal) -> Result<(), CaptureError>;
}

type Waker = Box<dyn Fn() + Send>;

/// Cross-thread request to end a running capture.
///
/// The capture backend installs a waker while it is blocked in its message
/// loop; [`StopSignal::request_stop`] sets the flag and calls the waker.
#[derive(Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        if let Ok(guard) = self.waker.lock() {
            if let Some(wake) = guard.as_ref() {
                wake();
            }
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Installs the function that interrupts the blocked loop.
    ///
    /// Returns `false` if a stop was already requested, in which case the
    /// caller must not enter its loop.
    pub fn install_waker(&self, wake: impl Fn() + Send + 'static) -> bool {
        if let Ok(mut guard) = self.waker.lock() {
            *guard = Some(Box::new(wake));
        }
        !self.is_stop_requested()
    }

    pub fn clear_waker(&self) {
        if let Ok(mut guard) = self.waker.lock() {
            *guard = None;
        }
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("requested", &self.is_stop_requested())
            .finish()
    }
}

/// Decodes one notification and enqueues the keyboard event, if any.
///
/// Decode failures are logged at `debug` and the notification is dropped.
/// Returns `true` if an event was enqueued.
pub fn handle_raw_input<R>(reader: &R, handle: RawInputHandle, sink: &dyn EventSink) -> bool
where
    R: RawInputReader + ?Sized,
{
    match decoder::decode(reader, handle) {
        Ok(Some(event)) => {
            sink.enqueue(event);
            true
        }
        Ok(None) => false,
        Err(e) => {
            debug!("dropping raw input notification: {e}");
            false
        }
    }
}

/// Returns the capture backend for this platform.
///
/// # Errors
///
/// [`CaptureError::UnsupportedPlatform`] where Raw Input is unavailable.
pub fn platform_capture(verbose: bool) -> Result<Box<dyn CaptureService + Send>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(windows::RawInputCapture::new(verbose)))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = verbose;
        Err(unsupported())
    }
}

/// Describes every attached input device.
///
/// # Errors
///
/// [`CaptureError::Directory`] if enumeration or any description fails, or
/// [`CaptureError::UnsupportedPlatform`] where Raw Input is unavailable.
pub fn describe_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        use rawsink_core::input::directory::DeviceDirectory;
        let directory = DeviceDirectory::new(windows::WindowsDevicePlatform);
        Ok(directory.describe_all()?)
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "windows"))]
fn unsupported() -> CaptureError {
    CaptureError::UnsupportedPlatform(format!(
        "raw keyboard input requires Windows (running on {})",
        std::env::consts::OS
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawsink_core::input::decoder::{RawInputHeader, RawKeyboardReport, RI_KEY_BREAK};
    use rawsink_core::input::PlatformError;
    use rawsink_core::{DeviceId, KeyboardEvent, ScanCode};
    use std::cell::RefCell;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingSink(RefCell<Vec<KeyboardEvent>>);

    impl EventSink for RecordingSink {
        fn enqueue(&self, event: KeyboardEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    struct OneShotReader {
        device_type: u32,
        flags: u16,
        header_fails: bool,
    }

    impl RawInputReader for OneShotReader {
        fn read_header(&self, _handle: RawInputHandle) -> Result<RawInputHeader, PlatformError> {
            if self.header_fails {
                return Err(PlatformError::new("bad handle"));
            }
            Ok(RawInputHeader {
                device_type: self.device_type,
                device: DeviceId(5),
                size: 40,
            })
        }

        fn read_keyboard(&self, _handle: RawInputHandle, _header: &RawInputHeader) -> Result<RawKeyboardReport, PlatformError> {
            Ok(RawKeyboardReport {
                make_code: 0x39,
                flags: self.flags,
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_keyboard_notification_is_enqueued() {
        // Arrange
        let sink = RecordingSink::default();
        let reader = OneShotReader {
            device_type: 1,
            flags: RI_KEY_BREAK,
            header_fails: false,
        };

        // Act
        let enqueued = handle_raw_input(&reader, RawInputHandle(1), &sink);

        // Assert
        assert!(enqueued);
        assert_eq!(*sink.0.borrow(), vec![KeyboardEvent::up(DeviceId(5), ScanCode::Space)]);
    }

    #[test]
    fn test_mouse_notification_and_decode_failure_enqueue_nothing() {
        let sink = RecordingSink::default();
        let mouse = OneShotReader {
            device_type: 0,
            flags: 0,
            header_fails: false,
        };
        let broken = OneShotReader {
            device_type: 1,
            flags: 0,
            header_fails: true,
        };

        assert!(!handle_raw_input(&mouse, RawInputHandle(1), &sink));
        assert!(!handle_raw_input(&broken, RawInputHandle(2), &sink));
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn test_stop_signal_calls_installed_waker() {
        // Arrange
        let stop = StopSignal::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        assert!(stop.install_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        // Act
        stop.clone().request_stop();

        // Assert
        assert!(stop.is_stop_requested());
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_install_waker_after_stop_reports_stopped() {
        let stop = StopSignal::new();
        stop.request_stop();

        assert!(!stop.install_waker(|| {}));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_non_windows_platform_is_unsupported() {
        assert!(matches!(platform_capture(false), Err(CaptureError::UnsupportedPlatform(_))));
        assert!(matches!(describe_devices(), Err(CaptureError::UnsupportedPlatform(_))));
    }
}
