//! routesyncd — keeps WireGuard allowed-ips in step with the routing table.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use routesync_core::config::RoutesyncConfig;
use routesync_core::{sync_once, Device, SystemRunner, Tools};

#[derive(Parser, Debug)]
#[command(name = "routesyncd", about = "Sync WireGuard peer allowed-ips with kernel routes")]
struct Args {
    /// WireGuard device to monitor.
    #[arg(long, value_name = "DEV")]
    wgdev: Option<String>,
    /// Only consider routes with this protocol tag (e.g. `bird`).
    #[arg(long, value_name = "PROTO")]
    proto: Option<String>,
    /// Seconds between passes.
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,
    /// Config file (defaults to $ROUTESYNC_CONFIG or ~/.config/routesync/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write a default config file if none exists, then continue.
    #[arg(long)]
    write_default_config: bool,
}

impl Args {
    /// Flags win over env and file.
    fn apply(self, config: &mut RoutesyncConfig) {
        if let Some(dev) = self.wgdev {
            config.interface.name = dev;
        }
        if let Some(proto) = self.proto {
            config.interface.proto = proto;
        }
        if let Some(secs) = self.interval {
            config.poll.interval_secs = secs;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    start(Args::parse()).await
}

/// Run the daemon. Anything returned is a startup failure and is logged
/// before it reaches `main`.
async fn start(args: Args) -> Result<()> {
    let result = run(args).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "startup failed");
    }
    result
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(RoutesyncConfig::file_path);
    if args.write_default_config {
        RoutesyncConfig::write_default_if_missing(&config_path)
            .context("failed to write default config")?;
        tracing::info!(path = %config_path.display(), "default config written");
    }
    let mut config = RoutesyncConfig::load_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    args.apply(&mut config);

    if config.interface.name.is_empty() {
        bail!("no WireGuard device given: pass --wgdev <dev> or set [interface] name");
    }

    let tools = Tools::from(&config.tools);
    let runner = SystemRunner;
    let proto = config.proto().map(str::to_string);

    tracing::info!(
        device = %config.interface.name,
        proto = proto.as_deref().unwrap_or("any"),
        interval_secs = config.interval().as_secs(),
        "routesyncd starting"
    );

    let mut device = Device::init(config.interface.name.clone(), &runner, &tools)
        .await
        .context("failed to initialise interface")?;
    tracing::info!(
        device = %device.name,
        addresses = device.addresses.len(),
        peers = device.peers.len(),
        "interface ready"
    );

    let report = sync_once(&mut device, &runner, &tools, proto.as_deref())
        .await
        .context("initial route scan failed")?;
    log_report(&device, &report);

    let mut interval = tokio::time::interval(config.interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately; the initial pass already ran.
    interval.tick().await;

    loop {
        interval.tick().await;
        match sync_once(&mut device, &runner, &tools, proto.as_deref()).await {
            Ok(report) => log_report(&device, &report),
            Err(_) => continue,
        }
    }
}

fn log_report(device: &Device, report: &routesync_core::PassReport) {
    if report.changed() || report.failures > 0 || report.inconsistencies > 0 {
        tracing::info!(
            device = %device.name,
            routes = report.routes,
            demoted = report.demoted,
            promoted = report.promoted,
            failures = report.failures,
            inconsistencies = report.inconsistencies,
            "pass complete"
        );
    } else {
        tracing::debug!(device = %device.name, routes = report.routes, "pass complete");
    }
}
