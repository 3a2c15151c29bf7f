use crate::crypto::KeyMaterialError;
use crate::error::{Categorized, ErrorCategory};
use crate::keyslot::{KeySlot, KeySlotError};
use crate::sealing::SealingError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError<E> {
    #[error("key slot {0} holds the existing credential and cannot be sealed; use a slot > 0")]
    ReservedSlot(KeySlot),
    #[error("the existing credential is empty")]
    EmptyCredential,
    #[error("the sealed input is empty")]
    EmptySealedInput,
    #[error("a mapped name is required")]
    EmptyMappedName,
    #[error(transparent)]
    KeyMaterial(#[from] KeyMaterialError),
    #[error(transparent)]
    Sealing(#[from] SealingError),
    #[error(transparent)]
    KeySlot(#[from] KeySlotError<E>),
}

impl<E> Categorized for LifecycleError<E> {
    fn category(&self) -> ErrorCategory {
        match self {
            LifecycleError::ReservedSlot(_)
            | LifecycleError::EmptyCredential
            | LifecycleError::EmptySealedInput
            | LifecycleError::EmptyMappedName => ErrorCategory::Configuration,
            LifecycleError::KeyMaterial(e) => e.category(),
            LifecycleError::Sealing(e) => e.category(),
            LifecycleError::KeySlot(e) => e.category(),
        }
    }
}
