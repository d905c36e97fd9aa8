// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! # sentinel-protocol
//!
//! Versioned binary messages that cluster members use to report a peer as
//! failed or recovered.
//!
//! Every message is an envelope followed by a kind-specific payload:
//!
//! ```text
//! ┌─────────────────────────────── envelope ──┐┌──────── payload ────────┐
//! │ head_version │ compat_version │   epoch    ││ fields in fixed order … │
//! └──────────────┴────────────────┴────────────┘└─────────────────────────┘
//! ```
//!
//! - [`envelope`] - header layout and `make_envelope`
//! - [`version`] - per-kind layout history and negotiation
//! - [`features`] - peer capabilities and alternative field representations
//! - [`codec`] - generic encode/decode over the envelope
//! - [`message`] - message kinds, starting with node failure reports
//! - [`dispatch`] - tag-keyed routing of inbound frames to the consumer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_protocol::{FailureReport, FeatureSet, NodeFailureCodec};
//!
//! let codec = NodeFailureCodec::new(cluster_id);
//! let report = FailureReport::failed(cluster_id, NodeId::new(7), 12.5, 42);
//! let bytes = codec.encode(&report, 42, peer_features)?;
//!
//! let decoded = codec.decode(&bytes)?;
//! assert!(decoded.is_failed());
//! ```

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod features;
pub mod message;
pub mod version;
pub mod wire;

// Re-export main types for convenience
pub use codec::{decode_message, encode_message, DecodeContext, Decoded, EncodeContext, MessagePayload};
pub use config::ProtocolConfig;
pub use dispatch::{
    DispatchOutcome, DispatchStats, DispatchStatsSnapshot, DropReason, MessageDecoder,
    MessageDispatcher, MessageRegistry,
};
pub use envelope::{make_envelope, MessageEnvelope, ENVELOPE_LEN};
pub use error::{ProtocolError, Result};
pub use features::{FeatureSet, NodeIdEncoding};
pub use message::{
    FailureReport, MessageType, NodeFailure, NodeFailureCodec, ProtocolMessage, StatusFlags,
    NODE_FAILURE_SCHEMA,
};
pub use version::{MessageSchema, Revision, Version};

pub use sentinel_types::{ClusterId, Epoch, NodeId};
