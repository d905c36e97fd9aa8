//! Fixtures shared by tests across the workspace

use crate::{ClusterId, CLUSTER_ID_LENGTH};

/// A fixed, recognisable cluster identity
pub fn test_cluster_id() -> ClusterId {
    ClusterId::new([0xC0; CLUSTER_ID_LENGTH])
}

/// A second identity guaranteed to differ from [`test_cluster_id`]
pub fn foreign_cluster_id() -> ClusterId {
    ClusterId::new([0xF0; CLUSTER_ID_LENGTH])
}
