/**
 * Key material and sealed blobs.
 *  - 32-byte device-unlock keys
 *  - Opaque ciphertext from the sealing service
 */
pub mod crypto;
/**
 * Error categories shared by every layer,
 *  used by the binary to decide exit status.
 */
pub mod error;
/**
 * Who we are when talking to the sealing service.
 */
pub mod identity;
/**
 * Key slots, their tokens, and the store
 *  contract over a device's encryption header.
 */
pub mod keyslot;
/**
 * The seal / unseal / open workflows.
 */
pub mod lifecycle;
/**
 * Contract of the remote sealing service.
 */
pub mod sealing;
/**
 * In-memory device and sealing service doubles.
 */
pub mod testkit;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{KeyMaterial, SealedBlob};
    pub use crate::error::{Categorized, ErrorCategory};
    pub use crate::identity::{NodeIdentity, NodeIdentityProvider, StaticIdentity};
    pub use crate::keyslot::{KeySlot, KeySlotError, KeySlotStore, SlotCredential, Token};
    pub use crate::lifecycle::{KeyLifecycle, LifecycleError, OpenOutcome, OpenState};
    pub use crate::sealing::{SealingError, SealingService};
    pub use crate::version::build_info;
}
