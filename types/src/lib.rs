// ========== Core Modules ==========
pub mod cluster; // Cluster identity
pub mod node; // Node and epoch identifiers

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cluster::{ClusterId, CLUSTER_ID_LENGTH};
pub use node::{Epoch, NodeId};

// Error types
pub type TypesResult<T> = Result<T, TypesError>;

#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
