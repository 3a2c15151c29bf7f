//! Local key material
//!
//! This crate never wraps keys itself; wrapping is the sealing service's job.
//! What lives here is the plaintext side of the protocol:
//!
//! - **KeyMaterial**: 32 random bytes, the secret enrolled into a key slot
//! - **SealedBlob**: the opaque ciphertext the sealing service returns for it
//!
//! Key material is turned into a slot passphrase by base64-encoding it, which
//! keeps devices interoperable with other tools using the same token format.

mod key_material;
mod sealed_blob;

pub use key_material::{KeyMaterial, KeyMaterialError, KEY_MATERIAL_SIZE};
pub use sealed_blob::SealedBlob;
