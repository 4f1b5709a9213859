//! Network infrastructure for the rawsink server.
//!
//! # Sub-modules
//!
//! - **`broadcaster`** – Owns the UDP socket and sends each encoded key event
//!   as a broadcast datagram.  Failures are reported, never raised.
//!
//! - **`local_address`** – Discovers the host's IPv4 addresses so the
//!   broadcaster can be bound to the interface the user prefers.

pub mod broadcaster;
pub mod local_address;
