use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::keyslot::{mapper_path, KeySlot, KeySlotError, KeySlotStore, SlotCredential, Token};

/// In-memory stand-in for a set of LUKS devices
#[derive(Debug, Clone, Default)]
pub struct MemoryKeySlotStore {
    inner: Arc<RwLock<MemoryKeySlotStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryKeySlotStoreInner {
    /// device path -> header contents
    devices: HashMap<PathBuf, MemoryDevice>,
    /// Active mappings: mapped name -> backing device
    mappings: HashMap<String, PathBuf>,
    calls: StoreCalls,
}

/// Header contents of one in-memory device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDevice {
    /// Raw token objects by token id (== key slot)
    pub tokens: BTreeMap<KeySlot, serde_json::Value>,
    /// Enrolled passphrases by key slot
    pub keyslots: BTreeMap<KeySlot, Vec<u8>>,
}

/// Number of times each store primitive was invoked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub read_token: usize,
    pub set_token: usize,
    pub add_key: usize,
    pub is_open: usize,
    pub open: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.read_token + self.set_token + self.add_key + self.is_open + self.open
    }

    /// Calls that change device state
    pub fn mutations(&self) -> usize {
        self.set_token + self.add_key + self.open
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryKeySlotStoreError {
    #[error("no such device: {}", .0.display())]
    NoSuchDevice(PathBuf),
    #[error("key slot {0} is full")]
    SlotOccupied(KeySlot),
    #[error("mapping {0} already exists")]
    MappingExists(String),
    #[error("memory store error: {0}")]
    Internal(String),
}

type StoreResult<T> = Result<T, KeySlotError<MemoryKeySlotStoreError>>;

impl MemoryKeySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device whose reserved slot holds `passphrase`
    pub fn format(&self, device: impl AsRef<Path>, passphrase: impl Into<Vec<u8>>) {
        let mut inner = self.write_unchecked();
        let mut header = MemoryDevice::default();
        header.keyslots.insert(KeySlot::RESERVED, passphrase.into());
        inner.devices.insert(device.as_ref().to_path_buf(), header);
    }

    /// Attach an arbitrary token object, bypassing validation
    pub fn insert_raw_token(
        &self,
        device: impl AsRef<Path>,
        slot: KeySlot,
        token: serde_json::Value,
    ) {
        let mut inner = self.write_unchecked();
        inner
            .devices
            .entry(device.as_ref().to_path_buf())
            .or_default()
            .tokens
            .insert(slot, token);
    }

    /// Mark `mapped_name` as an active mapping of `device`
    pub fn insert_mapping(&self, device: impl AsRef<Path>, mapped_name: &str) {
        let mut inner = self.write_unchecked();
        inner
            .mappings
            .insert(mapped_name.to_string(), device.as_ref().to_path_buf());
    }

    /// Snapshot of a device's header
    pub fn device(&self, device: impl AsRef<Path>) -> Option<MemoryDevice> {
        self.read_unchecked().devices.get(device.as_ref()).cloned()
    }

    pub fn passphrase(&self, device: impl AsRef<Path>, slot: KeySlot) -> Option<Vec<u8>> {
        self.device(device)
            .and_then(|header| header.keyslots.get(&slot).cloned())
    }

    pub fn token_value(
        &self,
        device: impl AsRef<Path>,
        slot: KeySlot,
    ) -> Option<serde_json::Value> {
        self.device(device)
            .and_then(|header| header.tokens.get(&slot).cloned())
    }

    pub fn mapping(&self, mapped_name: &str) -> Option<PathBuf> {
        self.read_unchecked().mappings.get(mapped_name).cloned()
    }

    pub fn calls(&self) -> StoreCalls {
        self.read_unchecked().calls
    }

    // test helpers panic on a poisoned lock; the trait methods report it instead
    fn read_unchecked(&self) -> RwLockReadGuard<'_, MemoryKeySlotStoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_unchecked(&self) -> RwLockWriteGuard<'_, MemoryKeySlotStoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryKeySlotStoreInner>> {
        self.inner.write().map_err(|e| {
            KeySlotError::Provider(MemoryKeySlotStoreError::Internal(format!(
                "failed to acquire write lock: {}",
                e
            )))
        })
    }
}

impl MemoryKeySlotStoreInner {
    fn header(&self, device: &Path) -> StoreResult<&MemoryDevice> {
        self.devices.get(device).ok_or_else(|| {
            KeySlotError::Provider(MemoryKeySlotStoreError::NoSuchDevice(
                device.to_path_buf(),
            ))
        })
    }

    fn header_mut(&mut self, device: &Path) -> StoreResult<&mut MemoryDevice> {
        self.devices.get_mut(device).ok_or_else(|| {
            KeySlotError::Provider(MemoryKeySlotStoreError::NoSuchDevice(
                device.to_path_buf(),
            ))
        })
    }
}

#[async_trait]
impl KeySlotStore for MemoryKeySlotStore {
    type Error = MemoryKeySlotStoreError;

    async fn read_token(&self, device: &Path, slot: KeySlot) -> StoreResult<Option<Token>> {
        let mut inner = self.write()?;
        inner.calls.read_token += 1;

        match inner.header(device)?.tokens.get(&slot) {
            Some(value) => Token::from_value(value.clone())
                .map(Some)
                .map_err(|e| KeySlotError::token(slot, e)),
            None => Ok(None),
        }
    }

    async fn set_token(&self, device: &Path, slot: KeySlot, token: &Token) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.calls.set_token += 1;

        let value = token.to_value().map_err(|e| KeySlotError::token(slot, e))?;
        inner.header_mut(device)?.tokens.insert(slot, value);
        Ok(())
    }

    async fn add_key(
        &self,
        device: &Path,
        existing: &SlotCredential,
        new: &SlotCredential,
    ) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.calls.add_key += 1;

        let header = inner.header_mut(device)?;
        // like LUKS, any enrolled passphrase authorizes enrollment
        let authorized = header
            .keyslots
            .values()
            .any(|passphrase| passphrase.as_slice() == existing.passphrase());
        if !authorized {
            return Err(KeySlotError::CredentialRejected {
                slot: existing.slot(),
            });
        }
        if header.keyslots.contains_key(&new.slot()) {
            return Err(KeySlotError::Provider(
                MemoryKeySlotStoreError::SlotOccupied(new.slot()),
            ));
        }

        header
            .keyslots
            .insert(new.slot(), new.passphrase().to_vec());
        Ok(())
    }

    async fn is_open(&self, device: &Path, mapped_name: &str) -> StoreResult<bool> {
        let mut inner = self.write()?;
        inner.calls.is_open += 1;

        match inner.mappings.get(mapped_name) {
            Some(backing) if backing == device => Ok(true),
            Some(backing) => Err(KeySlotError::MappingConflict {
                mapped_name: mapped_name.to_string(),
                backing: backing.clone(),
            }),
            None => Ok(false),
        }
    }

    async fn open(
        &self,
        device: &Path,
        mapped_name: &str,
        credential: &SlotCredential,
    ) -> StoreResult<PathBuf> {
        let mut inner = self.write()?;
        inner.calls.open += 1;

        let unlocks = inner
            .header(device)?
            .keyslots
            .get(&credential.slot())
            .map(|passphrase| passphrase.as_slice() == credential.passphrase())
            .unwrap_or(false);
        if !unlocks {
            return Err(KeySlotError::CredentialRejected {
                slot: credential.slot(),
            });
        }
        if inner.mappings.contains_key(mapped_name) {
            return Err(KeySlotError::Provider(
                MemoryKeySlotStoreError::MappingExists(mapped_name.to_string()),
            ));
        }

        inner
            .mappings
            .insert(mapped_name.to_string(), device.to_path_buf());
        Ok(mapper_path(mapped_name))
    }
}
