// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Inbound message dispatch
//!
//! The transport hands every received frame to [`MessageDispatcher::dispatch`]
//! together with its type tag. The dispatcher looks the tag up in a
//! [`MessageRegistry`], decodes, and forwards the result to the consumer over
//! a bounded channel. Anything that fails to decode is logged, counted and
//! dropped: a bad frame never takes the node down.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::message::{MessageType, NodeFailureCodec, ProtocolMessage};

/// Decoder for one message kind
pub trait MessageDecoder: Send + Sync {
    fn message_type(&self) -> MessageType;

    fn decode(&self, bytes: &[u8]) -> Result<ProtocolMessage>;
}

impl MessageDecoder for NodeFailureCodec {
    fn message_type(&self) -> MessageType {
        MessageType::NodeFailure
    }

    fn decode(&self, bytes: &[u8]) -> Result<ProtocolMessage> {
        self.decode_message(bytes).map(ProtocolMessage::NodeFailure)
    }
}

/// Decoders keyed by wire type tag
#[derive(Default, Clone)]
pub struct MessageRegistry {
    decoders: HashMap<u16, Arc<dyn MessageDecoder>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a decoder for every kind this build knows
    pub fn with_defaults(config: &ProtocolConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NodeFailureCodec::from_config(config)));
        registry
    }

    /// Register a decoder, returning the one it replaces
    pub fn register(&mut self, decoder: Arc<dyn MessageDecoder>) -> Option<Arc<dyn MessageDecoder>> {
        self.decoders.insert(decoder.message_type().tag(), decoder)
    }

    pub fn get(&self, tag: u16) -> Option<&Arc<dyn MessageDecoder>> {
        self.decoders.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Why a frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    UnsupportedVersion,
    Truncated,
    ClusterMismatch,
    Malformed,
    UnknownType,
    /// Decoded fine but the consumer is full or gone
    Backpressure,
}

impl DropReason {
    fn classify(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::UnsupportedVersion { .. } => DropReason::UnsupportedVersion,
            ProtocolError::Truncated { .. } => DropReason::Truncated,
            ProtocolError::ClusterMismatch { .. } => DropReason::ClusterMismatch,
            ProtocolError::UnknownMessageType(_) => DropReason::UnknownType,
            _ => DropReason::Malformed,
        }
    }
}

/// Result of dispatching one frame
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Delivered(MessageType),
    Dropped {
        reason: DropReason,
        error: Option<ProtocolError>,
    },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered(_))
    }
}

/// Per-outcome counters
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    unsupported_version: AtomicU64,
    truncated: AtomicU64,
    cluster_mismatch: AtomicU64,
    malformed: AtomicU64,
    unknown_type: AtomicU64,
    backpressure: AtomicU64,
}

impl DispatchStats {
    fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::UnsupportedVersion => &self.unsupported_version,
            DropReason::Truncated => &self.truncated,
            DropReason::ClusterMismatch => &self.cluster_mismatch,
            DropReason::Malformed => &self.malformed,
            DropReason::UnknownType => &self.unknown_type,
            DropReason::Backpressure => &self.backpressure,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            unsupported_version: self.unsupported_version.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            cluster_mismatch: self.cluster_mismatch.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            unknown_type: self.unknown_type.load(Ordering::Relaxed),
            backpressure: self.backpressure.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStatsSnapshot {
    pub delivered: u64,
    pub unsupported_version: u64,
    pub truncated: u64,
    pub cluster_mismatch: u64,
    pub malformed: u64,
    pub unknown_type: u64,
    pub backpressure: u64,
}

impl DispatchStatsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.unsupported_version
            + self.truncated
            + self.cluster_mismatch
            + self.malformed
            + self.unknown_type
            + self.backpressure
    }
}

/// Routes inbound frames to their decoder and on to the consumer
pub struct MessageDispatcher {
    registry: MessageRegistry,
    message_tx: mpsc::Sender<ProtocolMessage>,
    stats: Arc<DispatchStats>,
}

impl MessageDispatcher {
    pub fn new(registry: MessageRegistry, message_tx: mpsc::Sender<ProtocolMessage>) -> Self {
        Self {
            registry,
            message_tx,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Dispatcher with the default registry and a fresh channel sized from config
    pub fn from_config(config: &ProtocolConfig) -> (Self, mpsc::Receiver<ProtocolMessage>) {
        let (tx, rx) = mpsc::channel(config.dispatch_channel_capacity.max(1));
        (Self::new(MessageRegistry::with_defaults(config), tx), rx)
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    fn decode(&self, tag: u16, bytes: &[u8]) -> Result<ProtocolMessage> {
        let decoder = self
            .registry
            .get(tag)
            .ok_or(ProtocolError::UnknownMessageType(tag))?;
        decoder.decode(bytes)
    }

    /// Decode one frame and hand it to the consumer. Never blocks.
    pub fn dispatch(&self, tag: u16, bytes: &[u8]) -> DispatchOutcome {
        let message = match self.decode(tag, bytes) {
            Ok(message) => message,
            Err(e) => {
                let reason = DropReason::classify(&e);
                match reason {
                    DropReason::ClusterMismatch => {
                        warn!("Dropping message from another cluster (misconfiguration?): {}", e)
                    }
                    _ => warn!(tag, len = bytes.len(), "Dropping message: {}", e),
                }
                self.stats.record_drop(reason);
                return DispatchOutcome::Dropped {
                    reason,
                    error: Some(e),
                };
            }
        };

        let message_type = message.message_type();
        debug!("Received {}", message);

        match self.message_tx.try_send(message) {
            Ok(()) => {
                self.stats.record_delivered();
                DispatchOutcome::Delivered(message_type)
            }
            Err(e) => {
                warn!("Consumer not accepting {} message: {}", message_type, e);
                self.stats.record_drop(DropReason::Backpressure);
                DispatchOutcome::Dropped {
                    reason: DropReason::Backpressure,
                    error: None,
                }
            }
        }
    }
}
