//! Local interface selection by wildcard IPv4 pattern.
//!
//! A host often has several IPv4 addresses (wired, Wi-Fi, VPN, virtual
//! switches).  The broadcast must leave through one of them, chosen with a
//! pattern such as `192.168.*.*`: four dot-separated octets, each either a
//! decimal number `0`–`255` or `*` (any value).
//!
//! The first address that matches wins.  When nothing matches, the first
//! address in the list is used, so a stale preference never blocks startup.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced when parsing an [`InterfacePattern`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressPatternError {
    #[error("interface pattern '{pattern}' must have exactly 4 dot-separated octets, found {found}")]
    WrongOctetCount { pattern: String, found: usize },

    #[error("interface pattern '{pattern}' has invalid octet '{octet}' (expected 0-255 or '*')")]
    InvalidOctet { pattern: String, octet: String },
}

/// A wildcard IPv4 pattern; `None` in an octet position matches any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfacePattern {
    octets: [Option<u8>; 4],
}

impl InterfacePattern {
    /// Pattern that matches every address (`*.*.*.*`).
    pub const ANY: InterfacePattern = InterfacePattern { octets: [None; 4] };

    /// Parses a pattern.  An empty (or all-whitespace) string is treated as
    /// [`InterfacePattern::ANY`].
    pub fn parse(pattern: &str) -> Result<Self, AddressPatternError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Ok(Self::ANY);
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 4 {
            return Err(AddressPatternError::WrongOctetCount {
                pattern: pattern.to_string(),
                found: parts.len(),
            });
        }

        let mut octets = [None; 4];
        for (slot, part) in octets.iter_mut().zip(parts) {
            *slot = match part {
                "*" => None,
                digits if !digits.is_empty() && digits.len() <= 3 && digits.bytes().all(|b| b.is_ascii_digit()) => {
                    Some(digits.parse::<u8>().map_err(|_| AddressPatternError::InvalidOctet {
                        pattern: pattern.to_string(),
                        octet: part.to_string(),
                    })?)
                }
                _ => {
                    return Err(AddressPatternError::InvalidOctet {
                        pattern: pattern.to_string(),
                        octet: part.to_string(),
                    })
                }
            };
        }
        Ok(Self { octets })
    }

    /// Returns `true` if every literal octet equals the address's octet.
    pub fn matches(&self, address: Ipv4Addr) -> bool {
        self.octets
            .iter()
            .zip(address.octets())
            .all(|(want, got)| want.map_or(true, |w| w == got))
    }
}

impl Default for InterfacePattern {
    fn default() -> Self {
        Self::ANY
    }
}

impl FromStr for InterfacePattern {
    type Err = AddressPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for InterfacePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.octets.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match octet {
                Some(value) => write!(f, "{value}")?,
                None => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

/// Picks the local address to broadcast from.
///
/// Returns the first address matching `pattern`, otherwise the first address,
/// or `None` when `addresses` is empty.
pub fn select_local_address(addresses: &[Ipv4Addr], pattern: &InterfacePattern) -> Option<Ipv4Addr> {
    addresses
        .iter()
        .copied()
        .find(|addr| pattern.matches(*addr))
        .or_else(|| addresses.first().copied())
}
