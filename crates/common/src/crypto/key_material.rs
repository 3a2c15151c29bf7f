//! Device-unlock key material
//!
//! The key material is the secret actually enrolled into a LUKS key slot. It is
//! generated fresh on every seal, only ever leaves the process wrapped by the
//! sealing service, and is zeroed when dropped.

use std::fmt;

use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Categorized, ErrorCategory};

/// Size of the device-unlock key in bytes (256 bits)
pub const KEY_MATERIAL_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyMaterialError {
    #[error("failed to generate key material: {0}")]
    Random(getrandom::Error),
    #[error("invalid key material size, expected {expected}, got {actual}")]
    InvalidSize { expected: usize, actual: usize },
}

impl Categorized for KeyMaterialError {
    fn category(&self) -> ErrorCategory {
        match self {
            KeyMaterialError::Random(_) => ErrorCategory::Environment,
            // only ever produced from bytes the sealing service handed back
            KeyMaterialError::InvalidSize { .. } => ErrorCategory::Remote,
        }
    }
}

/// A 256-bit device-unlock secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial([u8; KEY_MATERIAL_SIZE]);

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

impl From<[u8; KEY_MATERIAL_SIZE]> for KeyMaterial {
    fn from(bytes: [u8; KEY_MATERIAL_SIZE]) -> Self {
        KeyMaterial(bytes)
    }
}

impl KeyMaterial {
    /// Generate fresh key material from the operating system's CSPRNG
    pub fn generate() -> Result<Self, KeyMaterialError> {
        let mut buff = [0; KEY_MATERIAL_SIZE];
        getrandom::getrandom(&mut buff).map_err(KeyMaterialError::Random)?;
        Ok(Self(buff))
    }

    /// Create key material from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly `KEY_MATERIAL_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, KeyMaterialError> {
        if data.len() != KEY_MATERIAL_SIZE {
            return Err(KeyMaterialError::InvalidSize {
                expected: KEY_MATERIAL_SIZE,
                actual: data.len(),
            });
        }
        let mut buff = [0; KEY_MATERIAL_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// The passphrase form enrolled into a key slot: standard, padded base64
    /// of the raw key bytes.
    pub fn to_passphrase(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .encode(self.0)
                .into_bytes(),
        )
    }
}
