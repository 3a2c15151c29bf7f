use std::fmt::Debug;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::crypto::SealedBlob;
use crate::error::{Categorized, ErrorCategory};
use crate::identity::NodeIdentity;

/// Errors raised talking to the sealing service
#[derive(Debug, thiserror::Error)]
pub enum SealingError {
    /// The service could not be reached (connection, TLS, timeout)
    #[error("sealing service unreachable: {0}")]
    Transport(String),
    /// The service answered but refused the request
    #[error("sealing service rejected the request: {0}")]
    Rejected(String),
    /// The service answered with something we cannot decode
    #[error("invalid response from sealing service: {0}")]
    InvalidResponse(String),
}

impl Categorized for SealingError {
    fn category(&self) -> ErrorCategory {
        match self {
            SealingError::Transport(_) => ErrorCategory::Transport,
            SealingError::Rejected(_) | SealingError::InvalidResponse(_) => ErrorCategory::Remote,
        }
    }
}

/// Remote authority that wraps and unwraps key material for a node identity.
///
/// For a fixed identity, `unseal(seal(k)) == k`. Unsealing under a different
/// identity than the blob was sealed for must fail.
#[async_trait]
pub trait SealingService: Send + Sync + Debug {
    async fn seal(
        &self,
        identity: &NodeIdentity,
        plaintext: &[u8],
    ) -> Result<SealedBlob, SealingError>;

    async fn unseal(
        &self,
        identity: &NodeIdentity,
        sealed: &SealedBlob,
    ) -> Result<Zeroizing<Vec<u8>>, SealingError>;
}
