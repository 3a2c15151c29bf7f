//! Seal, unseal, and open workflows
//!
//! A [`KeyLifecycle`] ties a node identity to a sealing service and a key-slot
//! store, and runs each workflow as one linear sequence of calls. There is no
//! retry and no rollback: a failure ends the workflow and whatever the store
//! already committed stays committed.
//!
//! # Ordering guarantees
//!
//! - `seal` rejects the reserved slot before touching the sealing service.
//! - `seal` writes the token only after the sealing service answered, and
//!   before the new key is enrolled. A rejected authenticator therefore leaves
//!   the token in place; re-running `seal` replaces it.
//! - `open` checks for an existing mapping before any remote call, which makes
//!   repeated invocations for an open mapping free of remote traffic.
//!
//! Nothing here serializes concurrent invocations. Two processes opening the
//! same mapped name at once may both pass the check and race on unlock.

mod error;
mod open;

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::crypto::{KeyMaterial, SealedBlob};
use crate::identity::NodeIdentity;
use crate::keyslot::{mapper_path, KeySlot, KeySlotError, KeySlotStore, SlotCredential, Token};
use crate::sealing::SealingService;

pub use error::LifecycleError;
pub use open::{OpenOutcome, OpenState};

use open::OpenMachine;

/// Result of a successful `seal`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealReceipt {
    pub slot: KeySlot,
    /// Size of the sealed blob stored in the token
    pub sealed_len: usize,
}

/// Runs the key lifecycle workflows for one node identity.
#[derive(Debug, Clone)]
pub struct KeyLifecycle<S, K> {
    identity: NodeIdentity,
    sealer: S,
    store: K,
}

impl<S, K> KeyLifecycle<S, K>
where
    S: SealingService,
    K: KeySlotStore,
{
    pub fn new(identity: NodeIdentity, sealer: S, store: K) -> Self {
        Self {
            identity,
            sealer,
            store,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Generate a fresh key, seal it, attach the token to `slot`, and enroll
    /// the key into `slot` authorized by `existing`.
    pub async fn seal(
        &self,
        device: &Path,
        slot: KeySlot,
        existing: &SlotCredential,
    ) -> Result<SealReceipt, LifecycleError<K::Error>> {
        if slot.is_reserved() {
            return Err(LifecycleError::ReservedSlot(slot));
        }
        if existing.is_empty() {
            return Err(LifecycleError::EmptyCredential);
        }

        let key = KeyMaterial::generate()?;

        let sealed = self.sealer.seal(&self.identity, key.bytes()).await?;
        let sealed_len = sealed.len();
        tracing::debug!(node = %self.identity, sealed_len, "key sealed");

        let token = Token::kms(sealed);
        self.store.set_token(device, slot, &token).await?;
        tracing::info!(device = %device.display(), %slot, "device token set");

        let credential = SlotCredential::from_key_material(slot, &key);
        self.store.add_key(device, existing, &credential).await?;
        tracing::info!(device = %device.display(), %slot, "key added to slot");

        Ok(SealReceipt { slot, sealed_len })
    }

    /// Unseal a blob that did not come from a device token.
    pub async fn unseal_bytes(
        &self,
        sealed: &SealedBlob,
    ) -> Result<Zeroizing<Vec<u8>>, LifecycleError<K::Error>> {
        if sealed.is_empty() {
            return Err(LifecycleError::EmptySealedInput);
        }
        Ok(self.sealer.unseal(&self.identity, sealed).await?)
    }

    /// Unseal the token attached to `slot` of `device`.
    pub async fn unseal_device(
        &self,
        device: &Path,
        slot: KeySlot,
    ) -> Result<Zeroizing<Vec<u8>>, LifecycleError<K::Error>> {
        let token = self.read_token(device, slot).await?;
        Ok(self.sealer.unseal(&self.identity, token.sealed_blob()).await?)
    }

    /// Unlock `device` as `mapped_name` using the key sealed in `slot`.
    ///
    /// Returns without contacting the sealing service if the mapping is
    /// already active.
    pub async fn open(
        &self,
        device: &Path,
        slot: KeySlot,
        mapped_name: &str,
    ) -> Result<OpenOutcome, LifecycleError<K::Error>> {
        if mapped_name.trim().is_empty() {
            return Err(LifecycleError::EmptyMappedName);
        }

        let mut machine = OpenMachine::new(device, mapped_name);
        match self.drive_open(&mut machine, device, slot, mapped_name).await {
            Ok(path) => {
                if machine.state() == OpenState::AlreadyOpen {
                    tracing::info!(%mapped_name, "volume already opened");
                } else {
                    tracing::info!(path = %path.display(), "device unlocked");
                }
                Ok(machine.finish(path))
            }
            Err(e) => {
                machine.transition(OpenState::Failed);
                Err(e)
            }
        }
    }

    async fn drive_open(
        &self,
        machine: &mut OpenMachine,
        device: &Path,
        slot: KeySlot,
        mapped_name: &str,
    ) -> Result<PathBuf, LifecycleError<K::Error>> {
        machine.transition(OpenState::Checking);
        if self.store.is_open(device, mapped_name).await? {
            machine.transition(OpenState::AlreadyOpen);
            return Ok(mapper_path(mapped_name));
        }

        machine.transition(OpenState::Unlocking);
        let token = self.read_token(device, slot).await?;
        let plaintext = self
            .sealer
            .unseal(&self.identity, token.sealed_blob())
            .await?;
        let key = KeyMaterial::from_slice(&plaintext)?;
        let credential = SlotCredential::from_key_material(slot, &key);

        let path = self.store.open(device, mapped_name, &credential).await?;
        machine.transition(OpenState::Open);
        Ok(path)
    }

    async fn read_token(
        &self,
        device: &Path,
        slot: KeySlot,
    ) -> Result<Token, LifecycleError<K::Error>> {
        self.store
            .read_token(device, slot)
            .await?
            .ok_or_else(|| {
                KeySlotError::<K::Error>::TokenNotFound {
                    device: device.to_path_buf(),
                    slot,
                }
                .into()
            })
    }
}
