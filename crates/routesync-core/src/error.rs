//! Error taxonomy shared by every stage of a reconciliation pass.

use std::fmt;

use crate::addr::AddressRange;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address or range text that does not parse. Callers skip the single
    /// offending line or field.
    #[error("malformed address {input:?}: {reason}")]
    MalformedAddress { input: String, reason: String },

    /// An external command could not be spawned or exited non-zero.
    #[error("command `{command}` failed: {stderr}")]
    CommandFailure { command: String, stderr: String },

    /// More than one peer matched the same role for one route.
    #[error("{role} for {destination} matched {} peers: {}", .candidates.len(), .candidates.join(", "))]
    ConfigInconsistency {
        destination: AddressRange,
        role: MatchRole,
        candidates: Vec<String>,
    },
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: impl fmt::Display) -> Self {
        Self::MalformedAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn command(argv: &[String], stderr: impl AsRef<str>) -> Self {
        Self::CommandFailure {
            command: argv.join(" "),
            stderr: stderr.as_ref().trim().to_lowercase(),
        }
    }
}

/// Which half of an ownership decision a peer matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRole {
    /// Advertises the destination exactly but does not own the next-hop.
    Holder,
    /// Owns the next-hop but does not advertise the destination.
    Owner,
}

impl fmt::Display for MatchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRole::Holder => f.write_str("stale holder"),
            MatchRole::Owner => f.write_str("next-hop owner"),
        }
    }
}
