// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Peer capability descriptors and the field representations they unlock
//!
//! A connection's [`FeatureSet`] is the intersection of what both ends
//! advertise. Encoders never branch on raw bits: each field with alternative
//! wire forms has an encoding enum that is resolved from the feature set once,
//! before any byte is written.

use bytes::{BufMut, BytesMut};
use sentinel_types::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use crate::error::{ProtocolError, Result};
use crate::wire::{put_varint_u32, zigzag_decode, zigzag_encode, WireReader};

/// Bitset of protocol capabilities advertised by a peer
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(u64);

impl FeatureSet {
    /// No optional capabilities: the baseline every peer understands
    pub const EMPTY: FeatureSet = FeatureSet(0);

    /// Peer accepts node ids as zig-zag varints
    pub const COMPACT_NODE_ID: FeatureSet = FeatureSet(1 << 0);

    /// Everything this build knows how to speak
    pub const SUPPORTED: FeatureSet = FeatureSet(Self::COMPACT_NODE_ID.0);

    /// Wrap raw bits. Unknown bits are kept so they can be reported.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is also set here
    pub const fn contains(&self, other: FeatureSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: FeatureSet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: FeatureSet) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits not understood by this build
    pub const fn unknown(&self) -> FeatureSet {
        Self(self.0 & !Self::SUPPORTED.0)
    }

    /// Features usable on a connection: what both ends advertise
    pub fn negotiate(local: FeatureSet, peer: FeatureSet) -> FeatureSet {
        local.intersection(peer)
    }
}

impl BitOr for FeatureSet {
    type Output = FeatureSet;

    fn bitor(self, rhs: FeatureSet) -> FeatureSet {
        self.union(rhs)
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureSet({:#x})", self.0)
    }
}

/// Wire representations of a node id
///
/// Each variant is written as a one-byte tag followed by the value, so the
/// receiver can decode without knowing what the sender negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeIdEncoding {
    /// Fixed four-byte signed integer
    Plain = 0,
    /// Zig-zag LEB128 varint, one to five bytes
    Compact = 1,
}

impl NodeIdEncoding {
    /// Candidates in order of preference. The last entry must need no features.
    const PREFERENCE: [NodeIdEncoding; 2] = [NodeIdEncoding::Compact, NodeIdEncoding::Plain];

    /// Features the destination must advertise to accept this representation
    pub const fn required_features(self) -> FeatureSet {
        match self {
            NodeIdEncoding::Plain => FeatureSet::EMPTY,
            NodeIdEncoding::Compact => FeatureSet::COMPACT_NODE_ID,
        }
    }

    /// Pick the most preferred representation the destination accepts
    pub fn resolve(features: FeatureSet) -> Self {
        Self::PREFERENCE
            .into_iter()
            .find(|encoding| features.contains(encoding.required_features()))
            .unwrap_or(NodeIdEncoding::Plain)
    }

    pub const fn wire_tag(self) -> u8 {
        self as u8
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(NodeIdEncoding::Plain),
            1 => Some(NodeIdEncoding::Compact),
            _ => None,
        }
    }

    pub fn encode(self, id: NodeId, buf: &mut BytesMut) {
        buf.put_u8(self.wire_tag());
        match self {
            NodeIdEncoding::Plain => buf.put_i32_le(id.get()),
            NodeIdEncoding::Compact => put_varint_u32(buf, zigzag_encode(id.get())),
        }
    }

    /// Read a tagged node id, whichever representation the sender chose
    pub fn decode(reader: &mut WireReader<'_>, field: &'static str) -> Result<NodeId> {
        let tag = reader.read_u8(field)?;
        let encoding = Self::from_wire_tag(tag).ok_or_else(|| {
            ProtocolError::Malformed(format!("{} has unknown representation tag {}", field, tag))
        })?;
        let raw = match encoding {
            NodeIdEncoding::Plain => reader.read_i32(field)?,
            NodeIdEncoding::Compact => zigzag_decode(reader.read_varint_u32(field)?),
        };
        Ok(NodeId::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_ops() {
        let a = FeatureSet::from_bits(0b0101);
        let b = FeatureSet::from_bits(0b0110);
        assert_eq!(a.intersection(b).bits(), 0b0100);
        assert_eq!((a | b).bits(), 0b0111);
        assert!(a.contains(FeatureSet::from_bits(0b0001)));
        assert!(!a.contains(b));
        assert!(a.contains(FeatureSet::EMPTY));
        assert_eq!(a.unknown().bits(), 0b0100);
        assert_eq!(
            FeatureSet::negotiate(FeatureSet::SUPPORTED, FeatureSet::EMPTY),
            FeatureSet::EMPTY
        );
        assert_eq!(format!("{}", FeatureSet::COMPACT_NODE_ID), "0x1");
    }

    #[test]
    fn test_resolve_node_id_encoding() {
        assert_eq!(NodeIdEncoding::resolve(FeatureSet::EMPTY), NodeIdEncoding::Plain);
        assert_eq!(
            NodeIdEncoding::resolve(FeatureSet::COMPACT_NODE_ID),
            NodeIdEncoding::Compact
        );
        // Unrelated bits do not unlock anything
        assert_eq!(
            NodeIdEncoding::resolve(FeatureSet::from_bits(1 << 9)),
            NodeIdEncoding::Plain
        );
        assert!(NodeIdEncoding::PREFERENCE
            .last()
            .map(|e| e.required_features().is_empty())
            .unwrap_or(false));
    }

    #[test]
    fn test_node_id_representations() {
        for encoding in [NodeIdEncoding::Plain, NodeIdEncoding::Compact] {
            for raw in [0, 7, -1, 1_000_000, i32::MIN, i32::MAX] {
                let mut buf = BytesMut::new();
                encoding.encode(NodeId::new(raw), &mut buf);
                assert_eq!(buf[0], encoding.wire_tag());
                let mut reader = WireReader::new(&buf);
                assert_eq!(NodeIdEncoding::decode(&mut reader, "target_id").unwrap().get(), raw);
                assert_eq!(reader.remaining(), 0);
            }
        }

        let mut compact = BytesMut::new();
        NodeIdEncoding::Compact.encode(NodeId::new(7), &mut compact);
        assert_eq!(&compact[..], &[1, 14]);
    }

    #[test]
    fn test_unknown_representation_tag() {
        let bytes = [9u8, 0, 0, 0, 0];
        let err = NodeIdEncoding::decode(&mut WireReader::new(&bytes), "target_id").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
