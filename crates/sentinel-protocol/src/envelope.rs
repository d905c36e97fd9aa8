// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Common message header
//!
//! Layout (little-endian, 12 bytes):
//!
//! ```text
//! ┌──────────────┬────────────────┬──────────────┐
//! │ head_version │ compat_version │    epoch     │
//! │     u16      │      u16       │     u64      │
//! └──────────────┴────────────────┴──────────────┘
//! ```

use bytes::{BufMut, BytesMut};
use sentinel_types::Epoch;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::version::Version;
use crate::wire::WireReader;

/// Encoded size of the envelope in bytes
pub const ENVELOPE_LEN: usize = 12;

/// Header shared by every message in the protocol family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageEnvelope {
    epoch: Epoch,
    head_version: Version,
    compat_version: Version,
}

/// Build an envelope, rejecting a compat_version newer than the layout itself
pub fn make_envelope(
    epoch: Epoch,
    head_version: Version,
    compat_version: Version,
) -> Result<MessageEnvelope> {
    if compat_version > head_version {
        return Err(ProtocolError::InvalidVersion {
            head: head_version,
            compat: compat_version,
        });
    }
    Ok(MessageEnvelope {
        epoch,
        head_version,
        compat_version,
    })
}

impl MessageEnvelope {
    pub fn new(epoch: Epoch, head_version: Version, compat_version: Version) -> Result<Self> {
        make_envelope(epoch, head_version, compat_version)
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn head_version(&self) -> Version {
        self.head_version
    }

    pub fn compat_version(&self) -> Version {
        self.compat_version
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.head_version);
        buf.put_u16_le(self.compat_version);
        buf.put_u64_le(self.epoch);
    }

    /// Read the envelope and check it against the receiver's limit
    ///
    /// The compat check runs before the epoch is read, so a message from a
    /// newer incompatible layout is rejected without touching anything past
    /// the version words.
    pub fn decode(reader: &mut WireReader<'_>, max_supported_compat: Version) -> Result<Self> {
        let head_version = reader.read_u16("head_version")?;
        let compat_version = reader.read_u16("compat_version")?;
        if compat_version > max_supported_compat {
            return Err(ProtocolError::UnsupportedVersion {
                compat: compat_version,
                max_supported: max_supported_compat,
            });
        }
        if compat_version > head_version {
            return Err(ProtocolError::Malformed(format!(
                "envelope compat_version {} exceeds head_version {}",
                compat_version, head_version
            )));
        }
        let epoch = reader.read_u64("epoch")?;
        Ok(Self {
            epoch,
            head_version,
            compat_version,
        })
    }
}
