//! Key slots, the tokens attached to them, and the store that holds both.

mod credential;
mod slot;
mod store;
mod token;

use std::path::PathBuf;

pub use credential::SlotCredential;
pub use slot::KeySlot;
pub use store::{KeySlotError, KeySlotStore};
pub use token::{KmsToken, Token, TokenError, KMS_TOKEN_TYPE};

/// Directory holding device-mapper nodes
pub const MAPPER_DIR: &str = "/dev/mapper";

/// Path at which an unlocked mapping named `mapped_name` appears
pub fn mapper_path(mapped_name: &str) -> PathBuf {
    PathBuf::from(MAPPER_DIR).join(mapped_name)
}
