//! Route observer — reads `(destination, next-hop)` pairs from the kernel.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use crate::addr::{parse_address, AddressRange};
use crate::command::{CommandRunner, Tools};
use crate::error::Result;

/// One observed route. Built fresh every poll and dropped after the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub destination: AddressRange,
    pub nexthop: IpAddr,
}

impl Route {
    pub fn new(destination: AddressRange, nexthop: IpAddr) -> Self {
        Self {
            destination,
            nexthop,
        }
    }
}

static ROUTE_VIA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)\s+via\s+(\S+)").expect("static regex"));

/// Extract routes from `ip -o route` output, in listing order.
///
/// Lines without a `<dest> via <nexthop>` pair, or whose tokens do not parse,
/// are skipped. A route missed here is picked up on a later poll.
pub fn parse_routes(text: &str) -> Vec<Route> {
    let re = &*ROUTE_VIA;
    let mut routes = Vec::new();

    for line in text.lines() {
        let Some(caps) = re.captures(line) else {
            continue;
        };

        let destination = match AddressRange::parse_or_host(&caps[1]) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(error = %e, line, "skipping route line");
                continue;
            }
        };
        let nexthop = match parse_address(&caps[2]) {
            Ok(a) => a,
            Err(e) => {
                tracing::debug!(error = %e, line, "skipping route line");
                continue;
            }
        };

        routes.push(Route::new(destination, nexthop));
    }

    routes
}

/// Query the kernel for routes on `device`, optionally limited to one
/// route protocol tag.
pub async fn scan_routes<R: CommandRunner>(
    runner: &R,
    tools: &Tools,
    device: &str,
    proto: Option<&str>,
) -> Result<Vec<Route>> {
    let stdout = runner.run(&tools.routes(device, proto)).await?;
    Ok(parse_routes(&stdout))
}
