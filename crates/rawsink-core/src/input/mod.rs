//! Platform-neutral half of raw input handling.
//!
//! The OS is reached through two traits implemented by the server crate:
//! [`directory::DevicePlatform`] (device list, names, capabilities,
//! descriptions) and [`decoder::RawInputReader`] (per-notification data).

use thiserror::Error;

pub mod decoder;
pub mod directory;

/// A failed OS query, carrying the platform's own diagnostic text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
