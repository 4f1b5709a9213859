//! # rawsink-core
//!
//! Shared library for rawsink containing the keyboard scan code table, the
//! input device model, the raw input decoder, the per-device key state
//! tracker, and the 11-byte wire codec.
//!
//! This crate has zero dependencies on OS APIs or network sockets.  Everything
//! that touches the operating system is reached through a trait
//! ([`input::directory::DevicePlatform`], [`input::decoder::RawInputReader`])
//! implemented by the server crate, so the logic here can be unit-tested with
//! fakes.
//!
//! # Architecture overview
//!
//! rawsink listens to raw keyboard reports and re-publishes every logical key
//! transition as a UDP broadcast.  The pipeline is:
//!
//! ```text
//! raw report ──decode──▶ KeyboardEvent ──KeyStateTracker──▶ encode ──▶ 11 bytes
//! ```
//!
//! - **`keymap`** – The [`ScanCode`] enumeration (layout-independent key ids).
//! - **`domain`** – Devices, events, the key state tracker, and interface
//!   pattern matching for local address selection.
//! - **`input`** – The device directory and the raw event decoder.
//! - **`protocol`** – The fixed 11-byte wire message.

pub mod domain;
pub mod input;
pub mod keymap;
pub mod protocol;

pub use domain::address::{select_local_address, AddressPatternError, InterfacePattern};
pub use domain::device::{DeviceId, DeviceInfo, InputDevice, InputDeviceType};
pub use domain::event::{KeyEventType, KeyboardEvent};
pub use domain::key_state::{KeyStateTracker, KeyTransition};
pub use keymap::scan_code::ScanCode;
pub use protocol::codec::{decode_message, encode_message, ProtocolError, WireMessage};
