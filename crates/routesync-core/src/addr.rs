//! Address and range primitives.
//!
//! `AddressRange` is a family-tagged (address, prefix length) pair. Equality
//! is exact: `10.0.0.0/16` and `10.0.0.0/24` overlap but are different
//! ranges, and host bits are kept as written (`10.0.1.5/24` is not
//! `10.0.1.0/24`).

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressRange(IpNet);

impl AddressRange {
    /// Parse `addr/len`. A prefix length is mandatory.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        IpNet::from_str(text)
            .map(Self)
            .map_err(|e| Error::malformed(text, e))
    }

    /// Parse `addr/len` or a bare address. A bare address becomes the
    /// narrowest range for its family (/32 or /128), which is how route
    /// tables list host routes.
    pub fn parse_or_host(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.contains('/') {
            Self::parse(text)
        } else {
            let addr = parse_address(text)?;
            let len = if addr.is_ipv4() { 32 } else { 128 };
            IpNet::new(addr, len)
                .map(Self)
                .map_err(|e| Error::malformed(text, e))
        }
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// CIDR containment. Always false across address families.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.0.contains(addr)
    }
}

impl FromStr for AddressRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Parse a single IP address.
pub fn parse_address(text: &str) -> Result<IpAddr> {
    let text = text.trim();
    IpAddr::from_str(text).map_err(|e| Error::malformed(text, e))
}

/// Join ranges the way `wg set ... allowed-ips` expects them.
pub fn join_ranges(ranges: &[AddressRange]) -> String {
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a comma-separated range list. Items that fail to parse are
/// returned separately so the caller can report them.
pub fn split_ranges(text: &str) -> (Vec<AddressRange>, Vec<Error>) {
    let mut ranges = Vec::new();
    let mut errors = Vec::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match AddressRange::parse(item) {
            Ok(r) => ranges.push(r),
            Err(e) => errors.push(e),
        }
    }
    (ranges, errors)
}
