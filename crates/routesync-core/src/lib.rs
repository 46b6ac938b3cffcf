//! routesync-core — keeps a WireGuard device's per-peer allowed-ips in step
//! with the kernel routing table.
//! The daemon crate only wires this library to a poll loop.

pub mod addr;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod peer;
pub mod reconcile;
pub mod route;
pub mod sync;
pub mod update;

pub use addr::{parse_address, AddressRange};
pub use command::{CommandRunner, SystemRunner, Tools};
pub use device::Device;
pub use error::{Error, MatchRole, Result};
pub use peer::{Peer, PeerField};
pub use reconcile::{plan_route, Decision, RoutePlan};
pub use route::Route;
pub use sync::{sync_once, PassReport};
