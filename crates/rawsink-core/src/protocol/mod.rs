//! Wire protocol.
//!
//! Every key transition is published as one fixed 11-byte UDP payload.  There
//! is no framing, version byte, checksum, or sequence number: the datagram
//! boundary is the message boundary.

pub mod codec;

pub use codec::{decode_message, encode_message, ProtocolError, WireMessage, WIRE_MESSAGE_LEN};
