//! Ownership resolution for one observed route.
//!
//! A peer *owns* a route's next-hop when the next-hop falls inside one of
//! its advertised ranges. The destination must be advertised by the owner
//! and by nobody else:
//!
//! - a peer that advertises the exact destination but does not own the
//!   next-hop is a stale holder and is demoted;
//! - a peer that owns the next-hop but does not advertise the exact
//!   destination is promoted.
//!
//! Peers are scanned in key order. If several peers fit one role the lowest
//! key is chosen and the whole candidate list is reported back.

use std::collections::BTreeMap;

use crate::addr::AddressRange;
use crate::error::{Error, MatchRole};
use crate::peer::Peer;
use crate::route::Route;

/// Decisions for one route. Borrowed keys point into the peer map.
#[derive(Debug, Default)]
pub struct RoutePlan<'a> {
    /// Peer that must stop advertising the destination.
    pub demote: Option<&'a str>,
    /// Peer that must start advertising the destination.
    pub promote: Option<&'a str>,
    /// `ConfigInconsistency` errors, one per role that matched several peers.
    pub inconsistencies: Vec<Error>,
}

impl RoutePlan<'_> {
    pub fn is_steady(&self) -> bool {
        self.demote.is_none() && self.promote.is_none()
    }

    /// Owned decisions for `route`, demote first.
    pub fn decisions(&self, route: &Route) -> Vec<Decision> {
        let demote = self.demote.map(|peer| Decision::Demote {
            peer: peer.to_string(),
            range: route.destination,
        });
        let promote = self.promote.map(|peer| Decision::Promote {
            peer: peer.to_string(),
            range: route.destination,
        });
        demote.into_iter().chain(promote).collect()
    }
}

/// One allowed-ips mutation on one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Remove `range` from `peer`.
    Demote { peer: String, range: AddressRange },
    /// Append `range` to `peer`.
    Promote { peer: String, range: AddressRange },
}

impl Decision {
    pub fn peer(&self) -> &str {
        match self {
            Decision::Demote { peer, .. } | Decision::Promote { peer, .. } => peer,
        }
    }
}

pub fn plan_route<'a>(peers: &'a BTreeMap<String, Peer>, route: &Route) -> RoutePlan<'a> {
    let mut holders: Vec<&'a str> = Vec::new();
    let mut owners: Vec<&'a str> = Vec::new();

    for (key, peer) in peers {
        let advertises_exact = peer.advertises(&route.destination);
        let owns_nexthop = peer.owns(&route.nexthop);

        match (advertises_exact, owns_nexthop) {
            (true, false) => holders.push(key.as_str()),
            (false, true) => owners.push(key.as_str()),
            _ => {}
        }
    }

    let mut inconsistencies = Vec::new();
    for (role, matched) in [(MatchRole::Holder, &holders), (MatchRole::Owner, &owners)] {
        if matched.len() > 1 {
            inconsistencies.push(Error::ConfigInconsistency {
                destination: route.destination,
                role,
                candidates: matched.iter().map(|k| k.to_string()).collect(),
            });
        }
    }

    RoutePlan {
        demote: holders.first().copied(),
        promote: owners.first().copied(),
        inconsistencies,
    }
}
