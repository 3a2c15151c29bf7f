//! Integration tests for the seal workflow

mod common;

use ::common::prelude::*;
use ::common::testkit::{InjectedFailure, MemoryKeySlotStoreError};

#[tokio::test]
async fn test_seal_writes_token_and_enrolls_key() {
    let (lifecycle, kms, store) = common::setup_test_env();

    let receipt = lifecycle
        .seal(common::device(), KeySlot::new(2), &common::bootstrap())
        .await
        .unwrap();
    assert_eq!(receipt.slot, KeySlot::new(2));

    // exactly one additional key slot
    let header = store.device(common::DEVICE).unwrap();
    assert_eq!(header.keyslots.len(), 2);
    assert_eq!(common::enrolled_key(&store, KeySlot::new(2)).len(), 32);

    // token of our type at the same slot
    let token = store.token_value(common::DEVICE, KeySlot::new(2)).unwrap();
    assert_eq!(token["type"], "sideroKMS");
    assert_eq!(token["keyslots"], serde_json::json!([]));
    assert!(token["userdata"]["sealedData"].is_string());

    assert_eq!(kms.seal_calls(), 1);
    assert_eq!(kms.unseal_calls(), 0);
}

#[tokio::test]
async fn test_seal_then_unseal_device_returns_enrolled_key() {
    let (lifecycle, _, store) = common::setup_test_env();
    let slot = KeySlot::new(1);

    lifecycle
        .seal(common::device(), slot, &common::bootstrap())
        .await
        .unwrap();

    let plaintext = lifecycle.unseal_device(common::device(), slot).await.unwrap();
    assert_eq!(plaintext.as_slice(), common::enrolled_key(&store, slot).as_slice());
}

#[tokio::test]
async fn test_seal_rejects_reserved_slot_before_any_call() {
    let (lifecycle, kms, store) = common::setup_test_env();
    let before = store.device(common::DEVICE);

    let err = lifecycle
        .seal(common::device(), KeySlot::RESERVED, &common::bootstrap())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::ReservedSlot(slot) if slot.is_reserved()));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(kms.remote_calls(), 0);
    assert_eq!(store.calls().total(), 0);
    assert_eq!(store.device(common::DEVICE), before);
}

#[tokio::test]
async fn test_seal_rejects_empty_credential() {
    let (lifecycle, kms, store) = common::setup_test_env();

    let err = lifecycle
        .seal(common::device(), KeySlot::new(1), &SlotCredential::existing(b"  \n"))
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::EmptyCredential));
    assert_eq!(kms.remote_calls(), 0);
    assert_eq!(store.calls().total(), 0);
}

#[tokio::test]
async fn test_remote_seal_failure_mutates_nothing() {
    let (lifecycle, kms, store) = common::setup_test_env();
    let before = store.device(common::DEVICE);

    kms.fail_with(Some(InjectedFailure::Rejected));
    let err = lifecycle
        .seal(common::device(), KeySlot::new(1), &common::bootstrap())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Remote);

    kms.fail_with(Some(InjectedFailure::Transport));
    let err = lifecycle
        .seal(common::device(), KeySlot::new(1), &common::bootstrap())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transport);

    assert_eq!(store.calls().mutations(), 0);
    assert_eq!(store.device(common::DEVICE), before);
}

/// The token is written before the key is enrolled. A rejected authenticator
/// leaves that token behind, and a retry with the right authenticator
/// replaces it and completes.
#[tokio::test]
async fn test_rejected_authenticator_leaves_token_and_retry_succeeds() {
    let (lifecycle, kms, store) = common::setup_test_env();
    let slot = KeySlot::new(1);

    let err = lifecycle
        .seal(
            common::device(),
            slot,
            &SlotCredential::existing(b"wrong-passphrase"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::KeySlot(KeySlotError::CredentialRejected { .. })
    ));
    assert_eq!(err.category(), ErrorCategory::Device);

    let stale_token = store.token_value(common::DEVICE, slot).unwrap();
    assert!(store.passphrase(common::DEVICE, slot).is_none());

    lifecycle
        .seal(common::device(), slot, &common::bootstrap())
        .await
        .unwrap();

    let token = store.token_value(common::DEVICE, slot).unwrap();
    assert_ne!(token, stale_token);
    assert_eq!(kms.seal_calls(), 2);

    let plaintext = lifecycle.unseal_device(common::device(), slot).await.unwrap();
    assert_eq!(plaintext.as_slice(), common::enrolled_key(&store, slot).as_slice());
}

#[tokio::test]
async fn test_seal_into_occupied_slot_fails_in_store() {
    let (lifecycle, _, _) = common::setup_test_env();
    let slot = KeySlot::new(3);

    lifecycle
        .seal(common::device(), slot, &common::bootstrap())
        .await
        .unwrap();
    let err = lifecycle
        .seal(common::device(), slot, &common::bootstrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::KeySlot(KeySlotError::Provider(
            MemoryKeySlotStoreError::SlotOccupied(_)
        ))
    ));
}

#[tokio::test]
async fn test_sealed_key_authorizes_further_enrollment() {
    let (lifecycle, _, store) = common::setup_test_env();

    lifecycle
        .seal(common::device(), KeySlot::new(1), &common::bootstrap())
        .await
        .unwrap();
    let passphrase = store.passphrase(common::DEVICE, KeySlot::new(1)).unwrap();

    lifecycle
        .seal(
            common::device(),
            KeySlot::new(2),
            &SlotCredential::existing(&passphrase),
        )
        .await
        .unwrap();
    assert_eq!(store.device(common::DEVICE).unwrap().keyslots.len(), 3);
}
