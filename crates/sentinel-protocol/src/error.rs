//! Protocol error types

use sentinel_types::{ClusterId, Epoch};
use thiserror::Error;

use crate::version::Version;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Invalid version: compat_version {compat} exceeds head_version {head}")]
    InvalidVersion { head: Version, compat: Version },

    #[error("Unsupported version: message needs compat_version {compat}, receiver knows up to {max_supported}")]
    UnsupportedVersion { compat: Version, max_supported: Version },

    #[error("Truncated: {field} needs {needed} byte(s), {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Cluster mismatch: expected {expected}, got {got}")]
    ClusterMismatch { expected: ClusterId, got: ClusterId },

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Invalid failed_duration: {0}")]
    InvalidDuration(f64),

    #[error("Stale epoch: envelope epoch {envelope} is older than report epoch {report}")]
    StaleEpoch { envelope: Epoch, report: Epoch },

    #[error("Unknown message type: {0:#06x}")]
    UnknownMessageType(u16),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
