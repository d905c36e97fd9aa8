// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Cluster identity
//!
//! Every message in the sentinel protocol family names the cluster it belongs
//! to. A receiver drops anything stamped with a foreign identity, so the id is
//! compared byte-for-byte and never interpreted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{TypesError, TypesResult};

/// Length of a cluster identifier in bytes (128 bits)
pub const CLUSTER_ID_LENGTH: usize = 16;

/// Opaque 128-bit cluster identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ClusterId([u8; CLUSTER_ID_LENGTH]);

impl ClusterId {
    /// The nil identity. Never assigned to a real cluster.
    pub const NIL: ClusterId = ClusterId([0u8; CLUSTER_ID_LENGTH]);

    /// Create from raw bytes
    pub fn new(bytes: [u8; CLUSTER_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random identity (UUID v4 layout)
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from a slice, which must be exactly 16 bytes
    pub fn from_slice(bytes: &[u8]) -> TypesResult<Self> {
        if bytes.len() != CLUSTER_ID_LENGTH {
            return Err(TypesError::InvalidLength {
                expected: CLUSTER_ID_LENGTH,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; CLUSTER_ID_LENGTH];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse either plain hex or the hyphenated UUID form
    pub fn from_hex(hex_str: &str) -> TypesResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let compact: String = hex_str.chars().filter(|c| *c != '-').collect();
        let bytes = hex::decode(&compact)
            .map_err(|e| TypesError::InvalidHex(format!("{}: {}", hex_str, e)))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CLUSTER_ID_LENGTH] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0).hyphenated())
    }
}

impl fmt::Debug for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClusterId({})", self)
    }
}

impl AsRef<[u8]> for ClusterId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; CLUSTER_ID_LENGTH]> for ClusterId {
    fn from(bytes: [u8; CLUSTER_ID_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl From<uuid::Uuid> for ClusterId {
    fn from(id: uuid::Uuid) -> Self {
        Self(*id.as_bytes())
    }
}

impl std::str::FromStr for ClusterId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
