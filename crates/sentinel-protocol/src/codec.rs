// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Versioned message codec
//!
//! [`encode_message`] and [`decode_message`] implement the envelope and
//! versioning rules once for every message kind. A kind only supplies its
//! [`MessageSchema`] and the payload field order through [`MessagePayload`].
//!
//! Both functions are pure: they hold no state and can run concurrently on
//! independent buffers.

use bytes::{Bytes, BytesMut};
use sentinel_types::Epoch;
use tracing::trace;

use crate::envelope::{make_envelope, MessageEnvelope, ENVELOPE_LEN};
use crate::error::{ProtocolError, Result};
use crate::features::{FeatureSet, NodeIdEncoding};
use crate::version::{MessageSchema, Version};
use crate::wire::WireReader;

/// Encoding decisions, resolved once from the destination before writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeContext {
    version: Version,
    node_id: NodeIdEncoding,
}

impl EncodeContext {
    pub fn resolve(schema: &MessageSchema, destination: Option<FeatureSet>) -> Self {
        Self {
            version: schema.negotiate(destination),
            node_id: NodeIdEncoding::resolve(destination.unwrap_or(FeatureSet::EMPTY)),
        }
    }

    /// Layout version being written
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn node_id_encoding(&self) -> NodeIdEncoding {
        self.node_id
    }

    /// Whether fields introduced at `since` belong in this encoding
    pub fn writes(&self, since: Version) -> bool {
        self.version >= since
    }
}

/// What the decoder learned from the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    envelope: MessageEnvelope,
    layout: Version,
}

impl DecodeContext {
    pub fn new(envelope: MessageEnvelope, schema: &MessageSchema) -> Self {
        Self {
            envelope,
            layout: schema.layout_for(envelope.head_version()),
        }
    }

    pub fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    /// Layout version to read: the sender's, capped at our own head
    pub fn layout(&self) -> Version {
        self.layout
    }

    /// Whether fields introduced at `since` are present in this message
    pub fn reads(&self, since: Version) -> bool {
        self.layout >= since
    }
}

/// A message kind's payload: the fields that follow the envelope
pub trait MessagePayload: Sized {
    /// Layout history for this kind
    const SCHEMA: MessageSchema;

    /// Lowest envelope epoch this payload may be sent under
    fn min_envelope_epoch(&self) -> Epoch {
        0
    }

    /// Reject values that must never reach the wire
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Write fields in their fixed order, skipping those newer than `ctx.version()`
    fn encode_payload(&self, ctx: &EncodeContext, buf: &mut BytesMut);

    /// Read fields in their fixed order, defaulting those newer than `ctx.layout()`
    fn decode_payload(ctx: &DecodeContext, reader: &mut WireReader<'_>) -> Result<Self>;
}

/// A payload together with the envelope it arrived in
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub envelope: MessageEnvelope,
    pub payload: T,
}

impl<T> Decoded<T> {
    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Encode `payload` under `epoch` for a destination with the given features
///
/// `None` means nothing is known about the destination and the native head
/// layout is used.
pub fn encode_message<T: MessagePayload>(
    payload: &T,
    epoch: Epoch,
    destination: Option<FeatureSet>,
) -> Result<Bytes> {
    payload.validate()?;
    let floor = payload.min_envelope_epoch();
    if epoch < floor {
        return Err(ProtocolError::StaleEpoch {
            envelope: epoch,
            report: floor,
        });
    }

    let ctx = EncodeContext::resolve(&T::SCHEMA, destination);
    let envelope = make_envelope(epoch, ctx.version(), T::SCHEMA.compat_version)?;

    let mut buf = BytesMut::with_capacity(ENVELOPE_LEN + 64);
    envelope.encode(&mut buf);
    payload.encode_payload(&ctx, &mut buf);

    trace!(
        kind = T::SCHEMA.name,
        version = ctx.version(),
        len = buf.len(),
        "Encoded message"
    );
    Ok(buf.freeze())
}

/// Decode a message of kind `T`
///
/// The envelope is checked before any payload byte is interpreted. Bytes
/// after the last field known to this build are ignored.
pub fn decode_message<T: MessagePayload>(bytes: &[u8]) -> Result<Decoded<T>> {
    let mut reader = WireReader::new(bytes);
    let envelope = MessageEnvelope::decode(&mut reader, T::SCHEMA.max_supported_compat())?;
    let ctx = DecodeContext::new(envelope, &T::SCHEMA);
    let payload = T::decode_payload(&ctx, &mut reader)?;

    if reader.remaining() > 0 {
        trace!(
            kind = T::SCHEMA.name,
            sender_head = envelope.head_version(),
            skipped = reader.remaining(),
            "Ignoring trailing bytes from newer layout"
        );
    }
    Ok(Decoded { envelope, payload })
}
