//! External command seam.
//!
//! Every interaction with the kernel and the WireGuard device goes through a
//! `CommandRunner`: one argv in, trimmed stdout out, or `CommandFailure`.
//! Calls are awaited one at a time and carry no timeout; a hung tool stalls
//! the loop until it exits.

use std::future::Future;

use crate::config::ToolsConfig;
use crate::error::{Error, Result};

pub trait CommandRunner {
    /// Run `argv[0]` with the remaining arguments. Returns trimmed stdout on
    /// success, `Error::CommandFailure` on spawn failure or non-zero exit.
    fn run(&self, argv: &[String]) -> impl Future<Output = Result<String>>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, argv: &[String]) -> Result<String> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::command(argv, "empty command line"))?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::command(argv, format!("failed to spawn: {e}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::command(argv, String::from_utf8_lossy(&output.stderr)))
        }
    }
}

/// Builds the argument vectors for the `ip` and `wg` collaborators.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ip: String,
    pub wg: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self::from(&ToolsConfig::default())
    }
}

impl From<&ToolsConfig> for Tools {
    fn from(cfg: &ToolsConfig) -> Self {
        Self {
            ip: cfg.ip.clone(),
            wg: cfg.wg.clone(),
        }
    }
}

impl Tools {
    /// `ip -o route show table all dev <dev> [proto <proto>]`
    pub fn routes(&self, device: &str, proto: Option<&str>) -> Vec<String> {
        let mut argv = argv(&self.ip, &["-o", "route", "show", "table", "all", "dev", device]);
        if let Some(proto) = proto.filter(|p| !p.is_empty()) {
            argv.push("proto".to_string());
            argv.push(proto.to_string());
        }
        argv
    }

    /// `ip -o addr list dev <dev>`
    pub fn addresses(&self, device: &str) -> Vec<String> {
        argv(&self.ip, &["-o", "addr", "list", "dev", device])
    }

    /// `wg showconf <dev>`
    pub fn showconf(&self, device: &str) -> Vec<String> {
        argv(&self.wg, &["showconf", device])
    }

    /// `wg set <dev> peer <key> allowed-ips <list>`
    pub fn set_allowed_ips(
        &self,
        device: &str,
        public_key: &str,
        allowed_ips: &str,
    ) -> Vec<String> {
        argv(
            &self.wg,
            &["set", device, "peer", public_key, "allowed-ips", allowed_ips],
        )
    }
}

fn argv(program: &str, args: &[&str]) -> Vec<String> {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect()
}
