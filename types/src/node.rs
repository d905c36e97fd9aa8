// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Node and epoch identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster membership view number. Non-decreasing over the life of a cluster.
pub type Epoch = u64;

/// Identifier of a cluster member as it appears in the cluster map
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct NodeId(i32);

impl NodeId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<i32> for NodeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for i32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
