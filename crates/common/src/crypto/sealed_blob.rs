use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Ciphertext produced by the sealing service, bound to a node identity.
///
/// Opaque to everything local; serialized as standard padded base64.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedBlob(#[serde_as(as = "Base64")] Vec<u8>);

impl fmt::Debug for SealedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedBlob({} bytes)", self.0.len())
    }
}

impl Deref for SealedBlob {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for SealedBlob {
    fn from(bytes: Vec<u8>) -> Self {
        SealedBlob(bytes)
    }
}

impl SealedBlob {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}
