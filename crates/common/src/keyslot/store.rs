use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{KeySlot, SlotCredential, Token, TokenError};
use crate::error::{Categorized, ErrorCategory};

#[derive(thiserror::Error, Debug)]
pub enum KeySlotError<T> {
    /// Failure inside the store implementation itself
    #[error("key-slot store error: {0}")]
    Provider(#[from] T),
    /// No token is attached to the slot (the slot was never sealed)
    #[error("no token found at key slot {slot} of {}", .device.display())]
    TokenNotFound { device: PathBuf, slot: KeySlot },
    /// A token is attached but it was not written by us
    #[error("unknown token type {kind:?} at key slot {slot}")]
    UnknownTokenType { slot: KeySlot, kind: String },
    /// A token of our type is attached but cannot be decoded
    #[error("malformed token at key slot {slot}: {reason}")]
    MalformedToken { slot: KeySlot, reason: String },
    /// The credential presented to authorize an operation was refused
    #[error("credential for key slot {slot} was rejected")]
    CredentialRejected { slot: KeySlot },
    /// The mapped name is already active but backed by another device
    #[error("{mapped_name} is already mapped to {}", .backing.display())]
    MappingConflict {
        mapped_name: String,
        backing: PathBuf,
    },
}

impl<T> KeySlotError<T> {
    pub fn token(slot: KeySlot, error: TokenError) -> Self {
        match error {
            TokenError::UnknownType(kind) => KeySlotError::UnknownTokenType { slot, kind },
            TokenError::Malformed(reason) => KeySlotError::MalformedToken { slot, reason },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KeySlotError::TokenNotFound { .. })
    }
}

impl<T> Categorized for KeySlotError<T> {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Device
    }
}

/// Primitives over a device's encryption header consumed by the key lifecycle.
///
/// Each call is treated as an atomic unit; the lifecycle never composes them
/// into a transaction and never compensates a committed call.
#[async_trait]
pub trait KeySlotStore: Send + Sync + Debug {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the token attached to `slot`
    ///
    /// # Returns
    /// * `Ok(Some(token))` - a token of a known type is attached
    /// * `Ok(None)` - no token is attached to the slot
    /// * `Err(KeySlotError::UnknownTokenType)` - a foreign token is attached
    async fn read_token(
        &self,
        device: &Path,
        slot: KeySlot,
    ) -> Result<Option<Token>, KeySlotError<Self::Error>>;

    /// Attach `token` to `slot`, replacing any token already there
    async fn set_token(
        &self,
        device: &Path,
        slot: KeySlot,
        token: &Token,
    ) -> Result<(), KeySlotError<Self::Error>>;

    /// Enroll `new` into its slot, authorized by `existing`
    ///
    /// Should fail with `KeySlotError::CredentialRejected` if `existing`
    /// does not unlock the device.
    async fn add_key(
        &self,
        device: &Path,
        existing: &SlotCredential,
        new: &SlotCredential,
    ) -> Result<(), KeySlotError<Self::Error>>;

    /// Whether `mapped_name` is an active mapping of `device`. Side-effect free.
    ///
    /// Should fail with `KeySlotError::MappingConflict` if the name is active
    /// but backed by a different device.
    async fn is_open(
        &self,
        device: &Path,
        mapped_name: &str,
    ) -> Result<bool, KeySlotError<Self::Error>>;

    /// Unlock `device` as `mapped_name` with `credential`, returning the mapped path
    async fn open(
        &self,
        device: &Path,
        mapped_name: &str,
        credential: &SlotCredential,
    ) -> Result<PathBuf, KeySlotError<Self::Error>>;
}
