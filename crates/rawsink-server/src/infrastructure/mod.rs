//! Infrastructure layer for the rawsink server.
//!
//! Contains OS-facing adapters: raw input capture, the UDP broadcaster and
//! local address discovery, and file-system configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `rawsink_core`, but MUST NOT be imported by the `application` layer.

pub mod input_capture;
pub mod network;
pub mod storage;
