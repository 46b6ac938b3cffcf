//! Peer updater — applies one decision in memory and on the live device.

use crate::command::{CommandRunner, Tools};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::reconcile::Decision;

/// Apply `decision` to the in-memory peer, then push that peer's full
/// allowed-ips list with one `wg set`.
///
/// A failed push is logged and returned without rolling the in-memory change
/// back; the next peer refresh replaces it from the device anyway.
pub async fn apply<R: CommandRunner>(
    device: &mut Device,
    runner: &R,
    tools: &Tools,
    decision: &Decision,
) -> Result<()> {
    let name = device.name.clone();
    let Some(peer) = device.peer_mut(decision.peer()) else {
        let err = Error::CommandFailure {
            command: format!("{} set {} peer {}", tools.wg, name, decision.peer()),
            stderr: "peer is not present on the device".to_string(),
        };
        tracing::error!(device = %name, error = %err, "failed to update peer");
        return Err(err);
    };

    match decision {
        Decision::Demote { range, .. } => {
            tracing::info!(device = %name, route = %range, peer = %peer.public_key, "removing route");
            peer.remove_allowed_ip(range);
        }
        Decision::Promote { range, .. } => {
            tracing::info!(device = %name, route = %range, peer = %peer.public_key, "adding route");
            peer.append_allowed_ip(*range);
        }
    }

    let argv = tools.set_allowed_ips(&name, &peer.public_key, &peer.allowed_ips_list());
    if let Err(e) = runner.run(&argv).await {
        tracing::error!(device = %name, error = %e, "failed to update peer");
        return Err(e);
    }
    Ok(())
}
