//! UDP broadcast sender.
//!
//! The broadcaster binds an ephemeral port on the chosen local address, enables
//! `SO_BROADCAST`, and sends every datagram to `255.255.255.255:<port>`.
//!
//! # How UDP broadcast works (for beginners)
//!
//! A datagram addressed to the limited broadcast address `255.255.255.255` is
//! delivered to every host on the local network segment; routers do not
//! forward it.  Anyone interested simply binds the broadcast port and listens.
//! There is no connection, acknowledgement, or retransmission: if a datagram
//! is lost, it is lost.  That is acceptable here because every key transition
//! is independent and a later release always corrects a missed press.
//!
//! # Failure policy
//!
//! Construction errors (port 0, bind failure) are fatal and returned as
//! [`BroadcastError`].  Send failures are not: [`UdpBroadcaster::try_send`]
//! returns `false` and the caller keeps going.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use thiserror::Error;
use tracing::debug;

use crate::application::pipeline::Transport;

/// Error type for broadcaster construction.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The destination port was 0.
    #[error("broadcast port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    /// The UDP socket could not be bound.
    #[error("failed to bind broadcast socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    /// `SO_BROADCAST` could not be enabled.
    #[error("failed to enable broadcast on socket: {0}")]
    EnableBroadcast(#[source] std::io::Error),
}

/// Sends datagrams to the LAN broadcast address from one local interface.
#[derive(Debug)]
pub struct UdpBroadcaster {
    socket: Option<UdpSocket>,
    destination: SocketAddrV4,
}

impl UdpBroadcaster {
    /// Binds `(local, 0)` and targets `255.255.255.255:port`.
    ///
    /// # Errors
    ///
    /// [`BroadcastError::InvalidPort`] if `port` is 0, or a bind/socket-option
    /// error from the OS.
    pub fn new(local: Ipv4Addr, port: u16) -> Result<Self, BroadcastError> {
        Self::with_destination(local, SocketAddrV4::new(Ipv4Addr::BROADCAST, port))
    }

    /// Like [`UdpBroadcaster::new`] but with an explicit destination address.
    pub fn with_destination(local: Ipv4Addr, destination: SocketAddrV4) -> Result<Self, BroadcastError> {
        if destination.port() == 0 {
            return Err(BroadcastError::InvalidPort(destination.port()));
        }

        let bind_addr = SocketAddrV4::new(local, 0);
        let socket = UdpSocket::bind(bind_addr).map_err(|source| BroadcastError::BindFailed {
            addr: bind_addr,
            source,
        })?;
        socket.set_broadcast(true).map_err(BroadcastError::EnableBroadcast)?;

        debug!(
            "broadcast socket bound on {}, sending to {}",
            socket.local_addr().map(|a| a.to_string()).unwrap_or_else(|_| bind_addr.to_string()),
            destination
        );

        Ok(Self {
            socket: Some(socket),
            destination,
        })
    }

    /// Sends one datagram.  Returns `false` on failure or after [`close`](Self::close).
    pub fn try_send(&self, datagram: &[u8]) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };
        match socket.send_to(datagram, self.destination) {
            Ok(sent) => sent == datagram.len(),
            Err(e) => {
                debug!("broadcast send to {} failed: {e}", self.destination);
                false
            }
        }
    }

    /// Releases the socket.  Idempotent.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("broadcast socket closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }

    /// The bound local address, or `None` once closed.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

impl Transport for UdpBroadcaster {
    fn try_send(&mut self, datagram: &[u8]) -> bool {
        UdpBroadcaster::try_send(self, datagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_port_zero_is_rejected_at_construction() {
        // Arrange / Act
        let result = UdpBroadcaster::new(Ipv4Addr::LOCALHOST, 0);

        // Assert
        assert!(matches!(result, Err(BroadcastError::InvalidPort(0))));
    }

    #[test]
    fn test_new_targets_limited_broadcast_address() {
        let broadcaster = UdpBroadcaster::new(Ipv4Addr::LOCALHOST, 5973).expect("bind loopback");

        assert_eq!(broadcaster.destination(), SocketAddrV4::new(Ipv4Addr::BROADCAST, 5973));
        assert!(broadcaster.local_addr().is_some());
    }

    #[test]
    fn test_try_send_after_close_returns_false() {
        // Arrange
        let mut broadcaster = UdpBroadcaster::new(Ipv4Addr::LOCALHOST, 5973).expect("bind loopback");

        // Act
        broadcaster.close();

        // Assert
        assert!(broadcaster.is_closed());
        assert!(!broadcaster.try_send(&[0u8; 11]));
        assert!(broadcaster.local_addr().is_none());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut broadcaster = UdpBroadcaster::new(Ipv4Addr::LOCALHOST, 5973).expect("bind loopback");
        broadcaster.close();
        broadcaster.close();
        assert!(broadcaster.is_closed());
    }

    #[test]
    fn test_datagram_arrives_at_destination() {
        // Arrange: a receiver on loopback stands in for the broadcast address.
        let receiver = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("set timeout");
        let dest = match receiver.local_addr().expect("receiver addr") {
            SocketAddr::V4(v4) => v4,
            SocketAddr::V6(_) => unreachable!("bound to an IPv4 address"),
        };
        let broadcaster = UdpBroadcaster::with_destination(Ipv4Addr::LOCALHOST, dest).expect("bind sender");
        let payload = [0x01, 0x42, 0, 0, 0, 0, 0, 0, 0, 0x1E, 0x00];

        // Act
        let sent = broadcaster.try_send(&payload);
        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).expect("receive datagram");

        // Assert
        assert!(sent);
        assert_eq!(&buf[..len], &payload);
    }
}
