//! Integration tests for the node failure codec

use bytes::{BufMut, BytesMut};
use sentinel_protocol::{
    ClusterId, FailureReport, FeatureSet, NodeFailureCodec, NodeId, ProtocolError, StatusFlags,
    ENVELOPE_LEN,
};
use sentinel_types::test_utils::test_cluster_id;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn codec() -> NodeFailureCodec {
    NodeFailureCodec::new(test_cluster_id())
}

fn sample_reports(cluster: ClusterId) -> Vec<FailureReport> {
    vec![
        FailureReport::failed(cluster, NodeId::new(7), 12.5, 42),
        FailureReport::failed(cluster, NodeId::new(0), 0.0, 0),
        FailureReport::alive(cluster, NodeId::new(7), 43),
        FailureReport::alive(cluster, NodeId::new(-1), u64::MAX),
        FailureReport::failed(cluster, NodeId::new(i32::MAX), 86_400.25, 1 << 40),
        FailureReport::with_flags(
            cluster,
            NodeId::new(i32::MIN),
            3.0,
            9,
            StatusFlags::from_bits(0b1010_0001),
        ),
    ]
}

fn feature_sets() -> Vec<FeatureSet> {
    vec![
        FeatureSet::EMPTY,
        FeatureSet::COMPACT_NODE_ID,
        FeatureSet::SUPPORTED,
        FeatureSet::from_bits(u64::MAX),
    ]
}

#[test]
fn test_roundtrip_all_feature_sets() {
    init_tracing();
    let codec = codec();
    for report in sample_reports(test_cluster_id()) {
        for features in feature_sets() {
            let bytes = codec.encode(&report, report.epoch(), features).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!(decoded, report, "features {}", features);
            assert_eq!(decoded.flags().bits(), report.flags().bits());
        }
        let native = codec.encode_native(&report, report.epoch()).unwrap();
        assert_eq!(codec.decode(&native).unwrap(), report);
    }
}

#[test]
fn test_failed_report_scenario() {
    init_tracing();
    let codec = codec();
    let report = FailureReport::failed(test_cluster_id(), NodeId::new(7), 12.5, 42);
    assert_eq!(report.to_string(), "node_failure(failed 7 for 12.5sec e42 v1)");

    let bytes = codec.encode(&report, 42, FeatureSet::EMPTY).unwrap();
    let decoded = codec.decode(&bytes).unwrap();
    assert_eq!(decoded.cluster_id(), &test_cluster_id());
    assert_eq!(decoded.target(), NodeId::new(7));
    assert_eq!(decoded.epoch(), 42);
    assert_eq!(decoded.flags(), StatusFlags::FAILED);
    assert_eq!(decoded.failed_duration(), 12.5);
    assert!(decoded.is_failed());
}

#[test]
fn test_liveness_reassertion_scenario() {
    let codec = codec();
    let report = FailureReport::with_flags(
        test_cluster_id(),
        NodeId::new(7),
        0.0,
        43,
        StatusFlags::from_bits(0),
    );
    let bytes = codec.encode(&report, 43, FeatureSet::EMPTY).unwrap();
    let decoded = codec.decode(&bytes).unwrap();
    assert!(!decoded.is_failed());
    assert_eq!(decoded.epoch(), 43);
    assert_eq!(decoded.to_string(), "node_failure(alive 7 for 0sec e43 v1)");
}

#[test]
fn test_truncation_at_every_offset() {
    let codec = codec();
    let report = FailureReport::failed(test_cluster_id(), NodeId::new(1234), 5.5, 77);
    for features in [FeatureSet::EMPTY, FeatureSet::COMPACT_NODE_ID] {
        let bytes = codec.encode(&report, 77, features).unwrap();
        for cut in 0..bytes.len() {
            match codec.decode(&bytes[..cut]) {
                Err(ProtocolError::Truncated { .. }) => {}
                other => panic!("cut at {} of {}: {:?}", cut, bytes.len(), other),
            }
        }
        assert_eq!(codec.decode(&bytes).unwrap(), report);
    }
}

#[test]
fn test_unsupported_version_fails_before_payload() {
    let codec = codec();
    let report = FailureReport::failed(test_cluster_id(), NodeId::new(7), 12.5, 42);
    let valid = codec.encode_native(&report, 42).unwrap();

    // Same length as a valid message, newer compat, payload turned to garbage
    let mut buf = BytesMut::new();
    buf.put_u16_le(2);
    buf.put_u16_le(2);
    buf.put_u64_le(42);
    buf.put_slice(&vec![0xFF; valid.len() - ENVELOPE_LEN]);

    assert_eq!(
        codec.decode(&buf).unwrap_err(),
        ProtocolError::UnsupportedVersion {
            compat: 2,
            max_supported: 1
        }
    );

    // Even with nothing after the version words
    assert!(matches!(
        codec.decode(&buf[..4]),
        Err(ProtocolError::UnsupportedVersion { .. })
    ));
}

#[test]
fn test_newer_compatible_sender_is_readable() {
    init_tracing();
    let codec = codec();
    let report = FailureReport::failed(test_cluster_id(), NodeId::new(7), 12.5, 42);
    let v1 = codec.encode_native(&report, 42).unwrap();

    // A future sender: head 3, compat still 1, extra trailing fields
    let mut future = BytesMut::new();
    future.put_u16_le(3);
    future.put_u16_le(1);
    future.put_slice(&v1[4..]);
    future.put_slice(&[0xAB; 21]);

    let msg = codec.decode_message(&future).unwrap();
    assert_eq!(msg.payload, report);
    assert_eq!(msg.envelope.head_version(), 3);
    assert_eq!(msg.to_string(), "node_failure(failed 7 for 12.5sec e42 v3)");
}

#[test]
fn test_foreign_cluster_rejected() {
    let codec = codec();
    let other = ClusterId::random();
    let report = FailureReport::failed(other, NodeId::new(7), 1.0, 1);
    let bytes = codec.encode_native(&report, 1).unwrap();
    assert!(matches!(
        codec.decode(&bytes),
        Err(ProtocolError::ClusterMismatch { got, .. }) if got == other
    ));

    // The sender's own codec accepts it
    assert_eq!(NodeFailureCodec::new(other).decode(&bytes).unwrap(), report);
}

#[test]
fn test_concurrent_encode_decode() {
    let codec = codec();
    std::thread::scope(|scope| {
        for worker in 0..8 {
            let codec = &codec;
            scope.spawn(move || {
                for i in 0..200u64 {
                    let report = FailureReport::failed(
                        test_cluster_id(),
                        NodeId::new(worker),
                        i as f64 * 0.5,
                        i,
                    );
                    let features = if i % 2 == 0 {
                        FeatureSet::EMPTY
                    } else {
                        FeatureSet::COMPACT_NODE_ID
                    };
                    let bytes = codec.encode(&report, i, features).unwrap();
                    assert_eq!(codec.decode(&bytes).unwrap(), report);
                }
            });
        }
    });
}
