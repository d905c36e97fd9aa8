// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Node failure / recovery report
//!
//! Sent by a cluster member to assert that a peer is down (or back up) as of
//! a given epoch. Payload field order after the envelope:
//!
//! | field             | wire form                                  |
//! |-------------------|--------------------------------------------|
//! | `cluster_id`      | 16 bytes                                   |
//! | `target_id`       | tag byte + i32 (plain) or zig-zag varint   |
//! | `epoch`           | u64                                        |
//! | `status_flags`    | u8, bit 0 = FAILED                         |
//! | `failed_duration` | f64 seconds                                |

use bytes::{BufMut, Bytes, BytesMut};
use sentinel_types::{ClusterId, Epoch, NodeId, CLUSTER_ID_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{
    decode_message, encode_message, DecodeContext, Decoded, EncodeContext, MessagePayload,
};
use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::features::{FeatureSet, NodeIdEncoding};
use crate::version::{MessageSchema, Revision, Version};
use crate::wire::WireReader;

/// Layout history of the node failure message
pub const NODE_FAILURE_SCHEMA: MessageSchema = MessageSchema {
    name: "node_failure",
    head_version: 1,
    compat_version: 1,
    revisions: &[Revision::new(1, FeatureSet::EMPTY)],
};

/// Report status bits
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// No bits set: the target is alive
    pub const ALIVE: StatusFlags = StatusFlags(0);
    /// The target is asserted failed; clear means recovery
    pub const FAILED: StatusFlags = StatusFlags(1 << 0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: StatusFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: StatusFlags) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Debug for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusFlags({:#04x})", self.0)
    }
}

/// A single assertion that a cluster member is failed or alive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    cluster_id: ClusterId,
    target_id: NodeId,
    status_flags: StatusFlags,
    failed_duration: f64,
    epoch: Epoch,
}

impl FailureReport {
    /// Report `target` as failed for at least `failed_duration` seconds
    pub fn failed(cluster_id: ClusterId, target: NodeId, failed_duration: f64, epoch: Epoch) -> Self {
        Self::with_flags(cluster_id, target, failed_duration, epoch, StatusFlags::FAILED)
    }

    /// Reassert that `target` is alive
    pub fn alive(cluster_id: ClusterId, target: NodeId, epoch: Epoch) -> Self {
        Self::with_flags(cluster_id, target, 0.0, epoch, StatusFlags::ALIVE)
    }

    pub fn with_flags(
        cluster_id: ClusterId,
        target: NodeId,
        failed_duration: f64,
        epoch: Epoch,
        status_flags: StatusFlags,
    ) -> Self {
        Self {
            cluster_id,
            target_id: target,
            status_flags,
            failed_duration,
            epoch,
        }
    }

    pub fn cluster_id(&self) -> &ClusterId {
        &self.cluster_id
    }

    pub fn target(&self) -> NodeId {
        self.target_id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn flags(&self) -> StatusFlags {
        self.status_flags
    }

    pub fn failed_duration(&self) -> f64 {
        self.failed_duration
    }

    /// True iff the FAILED bit is set, whatever the duration
    pub fn is_failed(&self) -> bool {
        self.status_flags.contains(StatusFlags::FAILED)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, head_version: Version) -> fmt::Result {
        write!(
            f,
            "{}({} {} for {}sec e{} v{})",
            NODE_FAILURE_SCHEMA.name,
            if self.is_failed() { "failed" } else { "alive" },
            self.target_id,
            self.failed_duration,
            self.epoch,
            head_version
        )
    }
}

fn check_duration(duration: f64) -> bool {
    duration.is_finite() && duration >= 0.0
}

impl MessagePayload for FailureReport {
    const SCHEMA: MessageSchema = NODE_FAILURE_SCHEMA;

    fn min_envelope_epoch(&self) -> Epoch {
        self.epoch
    }

    fn validate(&self) -> Result<()> {
        if !check_duration(self.failed_duration) {
            return Err(ProtocolError::InvalidDuration(self.failed_duration));
        }
        Ok(())
    }

    fn encode_payload(&self, ctx: &EncodeContext, buf: &mut BytesMut) {
        buf.put_slice(self.cluster_id.as_bytes());
        ctx.node_id_encoding().encode(self.target_id, buf);
        buf.put_u64_le(self.epoch);
        buf.put_u8(self.status_flags.bits());
        buf.put_f64_le(self.failed_duration);
    }

    fn decode_payload(_ctx: &DecodeContext, reader: &mut WireReader<'_>) -> Result<Self> {
        let cluster_id = ClusterId::new(reader.read_array::<CLUSTER_ID_LENGTH>("cluster_id")?);
        let target_id = NodeIdEncoding::decode(reader, "target_id")?;
        let epoch = reader.read_u64("epoch")?;
        let status_flags = StatusFlags::from_bits(reader.read_u8("status_flags")?);
        let failed_duration = reader.read_f64("failed_duration")?;
        if !check_duration(failed_duration) {
            return Err(ProtocolError::Malformed(format!(
                "failed_duration {} is not a non-negative number",
                failed_duration
            )));
        }
        Ok(Self {
            cluster_id,
            target_id,
            status_flags,
            failed_duration,
            epoch,
        })
    }
}

/// A decoded report with the envelope it arrived in
pub type NodeFailure = Decoded<FailureReport>;

/// Renders with the native head version
impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, NODE_FAILURE_SCHEMA.head_version)
    }
}

/// Renders with the version the sender actually used
impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.payload.render(f, self.envelope.head_version())
    }
}

/// Codec for node failure reports, bound to the local cluster identity
#[derive(Debug, Clone)]
pub struct NodeFailureCodec {
    local_cluster: ClusterId,
}

impl NodeFailureCodec {
    pub fn new(local_cluster: ClusterId) -> Self {
        Self { local_cluster }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.cluster_id)
    }

    pub fn local_cluster(&self) -> &ClusterId {
        &self.local_cluster
    }

    /// Encode for a destination whose connection features are known
    pub fn encode(&self, report: &FailureReport, epoch: Epoch, features: FeatureSet) -> Result<Bytes> {
        encode_message(report, epoch, Some(features))
    }

    /// Encode at the native layout, for when nothing is known about the peer
    pub fn encode_native(&self, report: &FailureReport, epoch: Epoch) -> Result<Bytes> {
        encode_message(report, epoch, None)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<FailureReport> {
        self.decode_message(bytes).map(Decoded::into_payload)
    }

    /// Decode and keep the envelope
    pub fn decode_message(&self, bytes: &[u8]) -> Result<NodeFailure> {
        let decoded = decode_message::<FailureReport>(bytes)?;
        if decoded.payload.cluster_id != self.local_cluster {
            return Err(ProtocolError::ClusterMismatch {
                expected: self.local_cluster,
                got: decoded.payload.cluster_id,
            });
        }
        Ok(decoded)
    }
}
