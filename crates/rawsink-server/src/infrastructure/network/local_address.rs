//! Local IPv4 address discovery.
//!
//! The host name is resolved to its IPv4 addresses, in resolver order.
//! Loopback addresses are dropped because a broadcast bound to loopback never
//! reaches the network.  If nothing is left, the address the OS would use for
//! outbound traffic is read back after "connecting" an unbound UDP socket
//! (no packet is sent).
//!
//! At startup the network may not be up yet (e.g. the service starts before
//! DHCP finishes), so [`wait_for_local_addresses`] retries until at least one
//! address shows up or shutdown is requested.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Delay between discovery attempts while no address is available.
pub const ADDRESS_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Public address used only to ask the OS for its preferred outbound route.
const ROUTE_LOOKUP_TARGET: (Ipv4Addr, u16) = (Ipv4Addr::new(192, 0, 2, 1), 9);

/// Error type for local address discovery.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The host name could not be resolved.
    #[error("failed to resolve host name '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Discovery finished without a usable address.
    #[error("no local IPv4 address available")]
    NoAddress,
}

/// Returns the machine's host name.
///
/// Tries `COMPUTERNAME` (Windows) first, then `HOSTNAME` (Unix), and falls
/// back to `"localhost"` if neither is set.
pub fn host_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Resolves `host` to its non-loopback IPv4 addresses, de-duplicated, in
/// resolver order.
///
/// # Errors
///
/// [`AddressError::Resolve`] if the resolver fails.
pub fn resolve_host_addresses(host: &str) -> Result<Vec<Ipv4Addr>, AddressError> {
    let resolved = (host, 0u16).to_socket_addrs().map_err(|source| AddressError::Resolve {
        host: host.to_string(),
        source,
    })?;
    Ok(usable_ipv4(resolved.map(|addr| addr.ip())))
}

/// Keeps non-loopback, non-unspecified IPv4 addresses in order, without duplicates.
pub fn usable_ipv4(addresses: impl IntoIterator<Item = IpAddr>) -> Vec<Ipv4Addr> {
    let mut out: Vec<Ipv4Addr> = Vec::new();
    for addr in addresses {
        if let IpAddr::V4(v4) = addr {
            if !v4.is_loopback() && !v4.is_unspecified() && !out.contains(&v4) {
                out.push(v4);
            }
        }
    }
    out
}

/// Returns the local address the OS would route outbound traffic from.
pub fn outbound_route_address() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(ROUTE_LOOKUP_TARGET).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(v4) if !v4.is_unspecified() && !v4.is_loopback() => Some(v4),
        _ => None,
    }
}

/// One discovery attempt: host name resolution, then the outbound route lookup.
pub fn discover_local_addresses() -> Vec<Ipv4Addr> {
    let host = host_name();
    let addresses = match resolve_host_addresses(&host) {
        Ok(addresses) => addresses,
        Err(e) => {
            debug!("{e}");
            Vec::new()
        }
    };
    if !addresses.is_empty() {
        debug!("local addresses for '{host}': {addresses:?}");
        return addresses;
    }
    outbound_route_address().into_iter().collect()
}

/// Calls `discover` until it returns a non-empty list, sleeping `retry`
/// between attempts.
///
/// Returns `None` if `running` is cleared before any address is found.
pub async fn wait_for_local_addresses<F>(mut discover: F, running: &AtomicBool, retry: Duration) -> Option<Vec<Ipv4Addr>>
where
    F: FnMut() -> Vec<Ipv4Addr>,
{
    loop {
        if !running.load(Ordering::Relaxed) {
            return None;
        }
        let addresses = discover();
        if !addresses.is_empty() {
            return Some(addresses);
        }
        warn!("no local IPv4 address available yet; retrying in {:?}", retry);
        tokio::time::sleep(retry).await;
    }
}
