use std::fmt;

use zeroize::Zeroizing;

use super::KeySlot;
use crate::crypto::KeyMaterial;

/// A passphrase bound to the key slot it unlocks.
#[derive(Clone)]
pub struct SlotCredential {
    slot: KeySlot,
    passphrase: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for SlotCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotCredential")
            .field("slot", &self.slot)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

impl SlotCredential {
    pub fn new(slot: KeySlot, passphrase: impl Into<Vec<u8>>) -> Self {
        Self {
            slot,
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    /// The credential enrolled for sealed key material.
    pub fn from_key_material(slot: KeySlot, key: &KeyMaterial) -> Self {
        Self {
            slot,
            passphrase: key.to_passphrase(),
        }
    }

    /// The pre-existing credential in the reserved slot, as typed by an
    /// operator: surrounding whitespace (e.g. a trailing newline) is dropped.
    pub fn existing(raw: &[u8]) -> Self {
        Self::new(KeySlot::RESERVED, raw.trim_ascii())
    }

    pub fn slot(&self) -> KeySlot {
        self.slot
    }

    pub fn passphrase(&self) -> &[u8] {
        &self.passphrase
    }

    pub fn is_empty(&self) -> bool {
        self.passphrase.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_is_trimmed_and_reserved() {
        let cred = SlotCredential::existing(b"  bootstrap-passphrase\n");
        assert_eq!(cred.slot(), KeySlot::RESERVED);
        assert_eq!(cred.passphrase(), b"bootstrap-passphrase");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert!(SlotCredential::existing(b" \n\t").is_empty());
    }

    #[test]
    fn test_debug_hides_passphrase() {
        let cred = SlotCredential::new(KeySlot::new(3), "hunter2");
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("hunter2"));
    }
}
