/// In-memory collaborators for exercising the key lifecycle
///
/// These stand in for a LUKS device and a remote KMS so the workflows can be
/// driven end to end in-process, without root, block devices, or a network.
/// Both doubles are cheap to clone and share state between clones, and both
/// count the calls made to them.
///
/// # Example
///
/// ```rust,ignore
/// use common::prelude::*;
/// use common::testkit::{MemoryKeySlotStore, MemorySealingService};
///
/// let store = MemoryKeySlotStore::new();
/// store.format("/dev/sdx", "bootstrap-passphrase");
///
/// let kms = MemorySealingService::new();
/// let lifecycle = KeyLifecycle::new(NodeIdentity::new("node-a")?, kms.clone(), store.clone());
///
/// let existing = SlotCredential::existing(b"bootstrap-passphrase\n");
/// lifecycle.seal("/dev/sdx".as_ref(), KeySlot::new(1), &existing).await?;
/// assert_eq!(kms.seal_calls(), 1);
/// ```
mod sealing;
mod store;

pub use sealing::{InjectedFailure, MemorySealingService};
pub use store::{MemoryDevice, MemoryKeySlotStore, MemoryKeySlotStoreError, StoreCalls};
