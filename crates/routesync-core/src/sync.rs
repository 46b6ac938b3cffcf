//! One reconciliation pass: observe, refresh, plan, apply.

use crate::command::{CommandRunner, Tools};
use crate::device::Device;
use crate::error::Result;
use crate::reconcile::{plan_route, Decision};
use crate::route::scan_routes;
use crate::update::apply;

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub routes: usize,
    pub demoted: usize,
    pub promoted: usize,
    pub failures: usize,
    pub inconsistencies: usize,
}

impl PassReport {
    pub fn changed(&self) -> bool {
        self.demoted + self.promoted > 0
    }
}

/// Run one pass against `device`.
///
/// Only a failed route query fails the pass; the device is left untouched
/// and the caller retries on the next tick. A failed address or peer refresh
/// is logged and the pass continues on the previous state. Decisions for
/// each route are applied demote first; if one fails the rest of that
/// route's decisions are skipped.
pub async fn sync_once<R: CommandRunner>(
    device: &mut Device,
    runner: &R,
    tools: &Tools,
    proto: Option<&str>,
) -> Result<PassReport> {
    let routes = match scan_routes(runner, tools, &device.name, proto).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(device = %device.name, error = %e, "failed to query routes");
            return Err(e);
        }
    };

    if let Err(e) = device.refresh_addresses(runner, tools).await {
        tracing::warn!(device = %device.name, error = %e, "failed to query interface");
    }
    if let Err(e) = device.refresh_peers(runner, tools).await {
        tracing::warn!(device = %device.name, error = %e, "failed to query interface");
    }

    let mut report = PassReport {
        routes: routes.len(),
        ..PassReport::default()
    };

    for route in &routes {
        let decisions = {
            let plan = plan_route(&device.peers, route);
            for e in &plan.inconsistencies {
                tracing::warn!(device = %device.name, error = %e, "config inconsistency");
            }
            report.inconsistencies += plan.inconsistencies.len();
            if plan.is_steady() {
                tracing::debug!(device = %device.name, route = %route.destination, via = %route.nexthop, "steady");
            }
            plan.decisions(route)
        };

        for decision in &decisions {
            if apply(device, runner, tools, decision).await.is_err() {
                report.failures += 1;
                break;
            }
            match decision {
                Decision::Demote { .. } => report.demoted += 1,
                Decision::Promote { .. } => report.promoted += 1,
            }
        }
    }

    Ok(report)
}
