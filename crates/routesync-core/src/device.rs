//! Peer state store — the in-memory model of one WireGuard device.
//!
//! Both refreshes replace state wholesale from the live device. Anything
//! changed behind our back, including our own `wg set` calls, is read back
//! on the next poll, so the reconciler never needs state of its own.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::addr::AddressRange;
use crate::command::{CommandRunner, Tools};
use crate::error::Result;
use crate::peer::{parse_showconf, Peer};

/// One monitored device. Owned by the poll loop for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct Device {
    pub name: String,
    /// The device's own addresses. Informational only.
    pub addresses: Vec<AddressRange>,
    /// Peers keyed by public key. Ordered so ownership scans are
    /// deterministic.
    pub peers: BTreeMap<String, Peer>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read addresses and peers once. Either failure is fatal to startup.
    pub async fn init<R: CommandRunner>(
        name: impl Into<String>,
        runner: &R,
        tools: &Tools,
    ) -> Result<Self> {
        let mut device = Self::new(name);
        device.refresh_addresses(runner, tools).await?;
        device.refresh_peers(runner, tools).await?;
        Ok(device)
    }

    pub fn peer(&self, public_key: &str) -> Option<&Peer> {
        self.peers.get(public_key)
    }

    pub fn peer_mut(&mut self, public_key: &str) -> Option<&mut Peer> {
        self.peers.get_mut(public_key)
    }

    // ── Addresses ────────────────────────────────────────────────────────────

    pub async fn refresh_addresses<R: CommandRunner>(
        &mut self,
        runner: &R,
        tools: &Tools,
    ) -> Result<()> {
        let stdout = runner.run(&tools.addresses(&self.name)).await?;
        let observed = parse_interface_addresses(&self.name, &stdout);
        self.replace_addresses(observed);
        Ok(())
    }

    /// Replace the local address set, logging what came and went.
    pub fn replace_addresses(&mut self, observed: Vec<AddressRange>) {
        let mut fresh: Vec<AddressRange> = Vec::with_capacity(observed.len());
        for addr in observed {
            if !fresh.contains(&addr) {
                fresh.push(addr);
            }
        }

        for gone in self.addresses.iter().filter(|a| !fresh.contains(a)) {
            tracing::info!(device = %self.name, address = %gone, "removing address");
        }
        for new in fresh.iter().filter(|a| !self.addresses.contains(a)) {
            tracing::info!(device = %self.name, address = %new, "adding address");
        }

        self.addresses = fresh;
    }

    // ── Peers ────────────────────────────────────────────────────────────────

    pub async fn refresh_peers<R: CommandRunner>(
        &mut self,
        runner: &R,
        tools: &Tools,
    ) -> Result<()> {
        let stdout = runner.run(&tools.showconf(&self.name)).await?;
        let observed = parse_showconf(&self.name, &stdout);
        self.replace_peers(observed);
        Ok(())
    }

    /// Full refresh: the observed set becomes the peer map.
    pub fn replace_peers(&mut self, observed: Vec<Peer>) {
        let fresh: BTreeMap<String, Peer> = observed
            .into_iter()
            .filter(|p| !p.public_key.is_empty())
            .map(|p| (p.public_key.clone(), p))
            .collect();

        for key in self.peers.keys().filter(|k| !fresh.contains_key(*k)) {
            tracing::info!(device = %self.name, peer = %key, "removing peer");
        }
        for key in fresh.keys().filter(|k| !self.peers.contains_key(*k)) {
            tracing::info!(device = %self.name, peer = %key, "adding peer");
        }

        self.peers = fresh;
    }

    /// Incremental sync: insert or replace one peer, leave the rest alone.
    pub fn merge_peer(&mut self, peer: Peer) {
        if peer.public_key.is_empty() {
            return;
        }
        if !self.peers.contains_key(&peer.public_key) {
            tracing::info!(device = %self.name, peer = %peer.public_key, "adding peer");
        }
        self.peers.insert(peer.public_key.clone(), peer);
    }
}

static INET_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"inet6?\s+(\S+)").expect("static regex"));

/// Extract `inet`/`inet6` ranges from `ip -o addr list` output.
pub fn parse_interface_addresses(device: &str, text: &str) -> Vec<AddressRange> {
    let re = &*INET_ADDR;
    text.lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| match AddressRange::parse(&caps[1]) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(device, error = %e, "failed to parse address");
                None
            }
        })
        .collect()
}
