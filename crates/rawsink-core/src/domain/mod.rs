//! Domain layer: pure types and rules with no OS dependencies.
//!
//! - **`device`** – Input device identity and per-class capability metadata.
//! - **`event`** – The semantic keyboard event flowing through the pipeline.
//! - **`key_state`** – Per-device held-key tracking that collapses key-repeat.
//! - **`address`** – Wildcard IPv4 patterns used to choose the local interface.

pub mod address;
pub mod device;
pub mod event;
pub mod key_state;
