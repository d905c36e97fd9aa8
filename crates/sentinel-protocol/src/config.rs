//! Configuration for the protocol layer

use sentinel_types::ClusterId;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::features::FeatureSet;

/// Default bound of the dispatcher's outbound channel
pub const DEFAULT_DISPATCH_CAPACITY: usize = 1024;

/// Protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Identity of the cluster this node belongs to
    pub cluster_id: ClusterId,

    /// Features this node advertises to peers
    pub local_features: FeatureSet,

    /// Capacity of the channel carrying decoded messages to the consumer
    pub dispatch_channel_capacity: usize,
}

impl ProtocolConfig {
    pub fn new(cluster_id: ClusterId) -> Self {
        Self {
            cluster_id,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// - `SENTINEL_CLUSTER_ID`: hex or hyphenated UUID
    /// - `SENTINEL_FEATURES`: feature bits, decimal or `0x` hex
    /// - `SENTINEL_DISPATCH_CAPACITY`: channel bound
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cluster_id = match lookup("SENTINEL_CLUSTER_ID") {
            Some(raw) => raw
                .trim()
                .parse::<ClusterId>()
                .map_err(|e| ProtocolError::InvalidConfig(format!("SENTINEL_CLUSTER_ID: {}", e)))?,
            None => defaults.cluster_id,
        };

        let local_features = match lookup("SENTINEL_FEATURES") {
            Some(raw) => FeatureSet::from_bits(parse_bits(raw.trim()).ok_or_else(|| {
                ProtocolError::InvalidConfig(format!("SENTINEL_FEATURES: invalid value {:?}", raw))
            })?),
            None => defaults.local_features,
        };

        let dispatch_channel_capacity = match lookup("SENTINEL_DISPATCH_CAPACITY") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ProtocolError::InvalidConfig(format!(
                    "SENTINEL_DISPATCH_CAPACITY: invalid value {:?}",
                    raw
                ))
            })?,
            None => defaults.dispatch_channel_capacity,
        };

        Ok(Self {
            cluster_id,
            local_features,
            dispatch_channel_capacity,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cluster_id.is_nil() {
            return Err(ProtocolError::InvalidConfig(
                "cluster_id must be set".to_string(),
            ));
        }
        if self.dispatch_channel_capacity == 0 {
            return Err(ProtocolError::InvalidConfig(
                "dispatch_channel_capacity must be greater than zero".to_string(),
            ));
        }
        let unknown = self.local_features.unknown();
        if !unknown.is_empty() {
            return Err(ProtocolError::InvalidConfig(format!(
                "local_features advertises unsupported bits {}",
                unknown
            )));
        }
        Ok(())
    }

    /// Features usable on a connection to a peer advertising `peer`
    pub fn connection_features(&self, peer: FeatureSet) -> FeatureSet {
        FeatureSet::negotiate(self.local_features, peer)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            cluster_id: ClusterId::NIL,
            local_features: FeatureSet::SUPPORTED,
            dispatch_channel_capacity: DEFAULT_DISPATCH_CAPACITY,
        }
    }
}

fn parse_bits(raw: &str) -> Option<u64> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::test_utils::test_cluster_id;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_need_a_cluster_id() {
        let config = ProtocolConfig::default();
        assert_eq!(config.local_features, FeatureSet::SUPPORTED);
        assert!(config.validate().is_err());
        assert!(ProtocolConfig::new(test_cluster_id()).validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = ProtocolConfig::from_lookup(lookup(&[
            ("SENTINEL_CLUSTER_ID", "c0c0c0c0-c0c0-c0c0-c0c0-c0c0c0c0c0c0"),
            ("SENTINEL_FEATURES", "0x0"),
            ("SENTINEL_DISPATCH_CAPACITY", " 16 "),
        ]))
        .unwrap();
        assert_eq!(config.cluster_id, test_cluster_id());
        assert_eq!(config.local_features, FeatureSet::EMPTY);
        assert_eq!(config.dispatch_channel_capacity, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ProtocolConfig::from_lookup(lookup(&[("SENTINEL_FEATURES", "lots")])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfig(_)));

        let err =
            ProtocolConfig::from_lookup(lookup(&[("SENTINEL_CLUSTER_ID", "abc")])).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_features_and_zero_capacity() {
        let mut config = ProtocolConfig::new(test_cluster_id());
        config.local_features = FeatureSet::from_bits(1 << 63);
        assert!(config.validate().is_err());

        let mut config = ProtocolConfig::new(test_cluster_id());
        config.dispatch_channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_features() {
        let config = ProtocolConfig::new(test_cluster_id());
        assert_eq!(
            config.connection_features(FeatureSet::from_bits(u64::MAX)),
            FeatureSet::SUPPORTED
        );

        let mut legacy = config.clone();
        legacy.local_features = FeatureSet::EMPTY;
        assert_eq!(
            legacy.connection_features(FeatureSet::COMPACT_NODE_ID),
            FeatureSet::EMPTY
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ProtocolConfig::new(test_cluster_id());
        let json = serde_json::to_string(&config).unwrap();
        let back: ProtocolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
