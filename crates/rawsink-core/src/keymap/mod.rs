//! Key code tables.
//!
//! The canonical key representation on the wire is the PS/2 scan code set 1
//! make code, with E0-prefixed keys folded into the high byte (`0xE0xx`).

pub mod scan_code;

pub use scan_code::ScanCode;
