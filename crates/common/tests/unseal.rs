//! Integration tests for the unseal workflows

mod common;

use ::common::prelude::*;
use ::common::testkit::{InjectedFailure, MemorySealingService};

#[tokio::test]
async fn test_unseal_bytes_round_trip() {
    let (lifecycle, kms, store) = common::setup_test_env();

    for plaintext in [&b"x"[..], &[0u8; 32][..], &b"arbitrary length payload"[..]] {
        let sealed = kms.seal(lifecycle.identity(), plaintext).await.unwrap();
        let recovered = lifecycle.unseal_bytes(&sealed).await.unwrap();
        assert_eq!(recovered.as_slice(), plaintext);
    }

    // no device involved at all
    assert_eq!(store.calls().total(), 0);
}

#[tokio::test]
async fn test_unseal_bytes_rejects_empty_input() {
    let (lifecycle, kms, _) = common::setup_test_env();

    let err = lifecycle
        .unseal_bytes(&SealedBlob::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::EmptySealedInput));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(kms.remote_calls(), 0);
}

#[tokio::test]
async fn test_unseal_bytes_for_other_node_is_remote_error() {
    let (lifecycle, kms, _) = common::setup_test_env_for("node-a");
    let sealed = kms
        .seal(&NodeIdentity::new("node-b").unwrap(), b"secret")
        .await
        .unwrap();

    let err = lifecycle.unseal_bytes(&sealed).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Sealing(SealingError::Rejected(_))));
    assert_eq!(err.category(), ErrorCategory::Remote);
}

#[tokio::test]
async fn test_unseal_device_missing_token_is_not_found() {
    let (lifecycle, kms, store) = common::setup_test_env();
    let before = store.device(common::DEVICE);

    let err = lifecycle
        .unseal_device(common::device(), KeySlot::new(1))
        .await
        .unwrap_err();

    match &err {
        LifecycleError::KeySlot(e) => assert!(e.is_not_found()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.category(), ErrorCategory::Device);
    assert_eq!(kms.remote_calls(), 0);
    assert_eq!(store.device(common::DEVICE), before);
}

#[tokio::test]
async fn test_unseal_device_unknown_token_type_is_distinct() {
    let (lifecycle, kms, store) = common::setup_test_env();
    store.insert_raw_token(
        common::DEVICE,
        KeySlot::new(1),
        serde_json::json!({ "type": "systemd-tpm2", "keyslots": ["1"] }),
    );

    let err = lifecycle
        .unseal_device(common::device(), KeySlot::new(1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::KeySlot(KeySlotError::UnknownTokenType { ref kind, .. }) if kind == "systemd-tpm2"
    ));
    assert_eq!(kms.remote_calls(), 0);
}

#[tokio::test]
async fn test_unseal_device_does_not_mutate_device() {
    let (lifecycle, _, store) = common::setup_test_env();
    lifecycle
        .seal(common::device(), KeySlot::new(1), &common::bootstrap())
        .await
        .unwrap();
    let before = store.device(common::DEVICE);
    let mutations = store.calls().mutations();

    lifecycle
        .unseal_device(common::device(), KeySlot::new(1))
        .await
        .unwrap();

    assert_eq!(store.device(common::DEVICE), before);
    assert_eq!(store.calls().mutations(), mutations);
}

#[tokio::test]
async fn test_unseal_device_with_other_kms_fails() {
    let (lifecycle, _, store) = common::setup_test_env();
    lifecycle
        .seal(common::device(), KeySlot::new(1), &common::bootstrap())
        .await
        .unwrap();

    let other = KeyLifecycle::new(
        lifecycle.identity().clone(),
        MemorySealingService::new(),
        store.clone(),
    );
    let err = other
        .unseal_device(common::device(), KeySlot::new(1))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Remote);
}

#[tokio::test]
async fn test_unseal_device_transport_failure() {
    let (lifecycle, kms, _) = common::setup_test_env();
    lifecycle
        .seal(common::device(), KeySlot::new(1), &common::bootstrap())
        .await
        .unwrap();

    kms.fail_with(Some(InjectedFailure::Transport));
    let err = lifecycle
        .unseal_device(common::device(), KeySlot::new(1))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transport);
}
