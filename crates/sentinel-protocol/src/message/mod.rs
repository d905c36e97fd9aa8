// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Message kinds of the sentinel protocol family
//!
//! Every kind has a stable numeric tag used by the transport to route bytes
//! to the right decoder, and a stable name used in logs.

pub mod node_failure;

pub use node_failure::{
    FailureReport, NodeFailure, NodeFailureCodec, StatusFlags, NODE_FAILURE_SCHEMA,
};

use sentinel_types::Epoch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire type tag of each message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageType {
    NodeFailure = 0x0051,
}

impl MessageType {
    pub const fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0x0051 => Some(MessageType::NodeFailure),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            MessageType::NodeFailure => NODE_FAILURE_SCHEMA.name,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded message of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    NodeFailure(NodeFailure),
}

impl ProtocolMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ProtocolMessage::NodeFailure(_) => MessageType::NodeFailure,
        }
    }

    /// Envelope epoch the sender stamped on the message
    pub fn epoch(&self) -> Epoch {
        match self {
            ProtocolMessage::NodeFailure(msg) => msg.envelope.epoch(),
        }
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolMessage::NodeFailure(msg) => fmt::Display::fmt(msg, f),
        }
    }
}

impl From<NodeFailure> for ProtocolMessage {
    fn from(msg: NodeFailure) -> Self {
        ProtocolMessage::NodeFailure(msg)
    }
}
