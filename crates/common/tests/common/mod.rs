//! Shared test utilities for key lifecycle integration tests
#![allow(dead_code)]

use std::path::Path;

use base64::Engine;
use common::prelude::*;
use common::testkit::{MemoryKeySlotStore, MemorySealingService};

pub const DEVICE: &str = "/dev/sdx";
pub const BOOTSTRAP_PASSPHRASE: &str = "bootstrap-passphrase";

/// Route lifecycle logs into the test harness output; `RUST_LOG` filters them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub type TestLifecycle = KeyLifecycle<MemorySealingService, MemoryKeySlotStore>;

/// Set up a lifecycle over one formatted in-memory device and an in-memory KMS
pub fn setup_test_env() -> (TestLifecycle, MemorySealingService, MemoryKeySlotStore) {
    setup_test_env_for("75717bc6-8bec-42da-ab62-402a27ac6dd2")
}

pub fn setup_test_env_for(
    node: &str,
) -> (TestLifecycle, MemorySealingService, MemoryKeySlotStore) {
    init_tracing();
    let store = MemoryKeySlotStore::new();
    store.format(DEVICE, BOOTSTRAP_PASSPHRASE);
    let kms = MemorySealingService::new();
    let lifecycle = KeyLifecycle::new(
        NodeIdentity::new(node).unwrap(),
        kms.clone(),
        store.clone(),
    );
    (lifecycle, kms, store)
}

pub fn device() -> &'static Path {
    Path::new(DEVICE)
}

/// The bootstrap credential as it arrives on stdin
pub fn bootstrap() -> SlotCredential {
    SlotCredential::existing(format!("{}\n", BOOTSTRAP_PASSPHRASE).as_bytes())
}

/// Recover the raw key bytes enrolled into `slot` of the test device
pub fn enrolled_key(store: &MemoryKeySlotStore, slot: KeySlot) -> Vec<u8> {
    let passphrase = store.passphrase(DEVICE, slot).expect("slot enrolled");
    base64::engine::general_purpose::STANDARD
        .decode(passphrase)
        .expect("enrolled passphrase is base64")
}
