//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the optional TOML configuration file from the
//! platform-appropriate directory (or an explicit path) and supplies defaults
//! for anything the file leaves out.

pub mod config;
