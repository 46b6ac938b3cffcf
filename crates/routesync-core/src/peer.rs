//! WireGuard peers and the `wg showconf` decoder.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use crate::addr::{join_ranges, split_ranges, AddressRange};

/// A peer as last read from the live device.
///
/// `allowed_ips` keeps the order the device reported, with our appends at the
/// end, so the list written back with `wg set` is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peer {
    pub public_key: String,
    pub preshared_key: Option<String>,
    pub allowed_ips: Vec<AddressRange>,
    pub endpoint: Option<String>,
    /// Keepalive interval in seconds. `None` when unset or `off`.
    pub persistent_keepalive: Option<u16>,
}

impl Peer {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            ..Self::default()
        }
    }

    pub fn with_allowed_ips(mut self, ranges: impl IntoIterator<Item = AddressRange>) -> Self {
        self.allowed_ips.extend(ranges);
        self
    }

    /// Exact-range membership, not containment.
    pub fn advertises(&self, range: &AddressRange) -> bool {
        self.allowed_ips.contains(range)
    }

    /// True if `addr` falls inside any advertised range.
    pub fn owns(&self, addr: &IpAddr) -> bool {
        self.allowed_ips.iter().any(|r| r.contains(addr))
    }

    /// Drop every occurrence of `range`.
    pub fn remove_allowed_ip(&mut self, range: &AddressRange) {
        self.allowed_ips.retain(|r| r != range);
    }

    /// Append `range`. No dedup: the reconciler only promotes a peer that
    /// does not already advertise the exact range.
    pub fn append_allowed_ip(&mut self, range: AddressRange) {
        self.allowed_ips.push(range);
    }

    /// Comma-joined list for `wg set ... allowed-ips`.
    pub fn allowed_ips_list(&self) -> String {
        join_ranges(&self.allowed_ips)
    }
}

/// Keys recognised inside a `[Peer]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerField {
    PublicKey,
    PresharedKey,
    AllowedIps,
    Endpoint,
    PersistentKeepalive,
}

impl PeerField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "PublicKey" => Some(Self::PublicKey),
            "PresharedKey" => Some(Self::PresharedKey),
            "AllowedIPs" => Some(Self::AllowedIps),
            "Endpoint" => Some(Self::Endpoint),
            "PersistentKeepalive" => Some(Self::PersistentKeepalive),
            _ => None,
        }
    }
}

static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)\s*=\s*(.+)").expect("static regex"));

/// Decode `wg showconf` output into peers, in the order listed.
///
/// A `[Peer]` line starts a new record. Records without a `PublicKey` (the
/// `[Interface]` section included) are dropped. Unknown keys are ignored; an
/// allowed-ips item that fails to parse is logged and dropped on its own.
pub fn parse_showconf(device: &str, text: &str) -> Vec<Peer> {
    let re = &*KEY_VALUE;
    let mut peers = Vec::new();
    let mut current = Peer::default();

    for line in text.lines().map(str::trim) {
        if line.starts_with("[Peer]") {
            commit(&mut peers, std::mem::take(&mut current));
            continue;
        }

        let Some(caps) = re.captures(line) else {
            continue;
        };
        let Some(field) = PeerField::from_key(&caps[1]) else {
            continue;
        };
        let value = caps[2].trim();

        match field {
            PeerField::PublicKey => current.public_key = value.to_string(),
            PeerField::PresharedKey => current.preshared_key = Some(value.to_string()),
            PeerField::Endpoint => current.endpoint = Some(value.to_string()),
            PeerField::PersistentKeepalive => current.persistent_keepalive = value.parse().ok(),
            PeerField::AllowedIps => {
                let (ranges, errors) = split_ranges(value);
                for e in errors {
                    tracing::warn!(device, error = %e, "failed to parse address");
                }
                current.allowed_ips.extend(ranges);
            }
        }
    }
    commit(&mut peers, current);

    peers
}

fn commit(peers: &mut Vec<Peer>, peer: Peer) {
    if !peer.public_key.is_empty() {
        peers.push(peer);
    }
}
