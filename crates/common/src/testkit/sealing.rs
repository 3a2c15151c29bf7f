use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use zeroize::Zeroizing;

use crate::crypto::SealedBlob;
use crate::identity::NodeIdentity;
use crate::sealing::{SealingError, SealingService};

/// Size of ChaCha20-Poly1305 nonce in bytes
const NONCE_SIZE: usize = 12;
const NODE_KEY_CONTEXT: &str = "kms-seals testkit 2024-01-01 node sealing key";

/// Failure the in-memory service should report instead of answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Transport,
    Rejected,
}

/// In-process sealing service.
///
/// Blobs are `nonce || ChaCha20-Poly1305(plaintext)` under a key derived from
/// the service's master secret and the node identity, so a blob only unseals
/// for the identity it was sealed for, and only on the same service instance.
#[derive(Clone)]
pub struct MemorySealingService {
    inner: Arc<MemorySealingServiceInner>,
}

struct MemorySealingServiceInner {
    master: [u8; 32],
    seal_calls: AtomicUsize,
    unseal_calls: AtomicUsize,
    failure: Mutex<Option<InjectedFailure>>,
}

impl fmt::Debug for MemorySealingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySealingService")
            .field("seal_calls", &self.seal_calls())
            .field("unseal_calls", &self.unseal_calls())
            .finish()
    }
}

impl Default for MemorySealingService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySealingService {
    pub fn new() -> Self {
        let mut master = [0u8; 32];
        getrandom::getrandom(&mut master).expect("failed to generate random bytes");
        Self {
            inner: Arc::new(MemorySealingServiceInner {
                master,
                seal_calls: AtomicUsize::new(0),
                unseal_calls: AtomicUsize::new(0),
                failure: Mutex::new(None),
            }),
        }
    }

    /// Make every following call fail with `failure` (or succeed again with `None`)
    pub fn fail_with(&self, failure: Option<InjectedFailure>) {
        *self
            .inner
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = failure;
    }

    pub fn seal_calls(&self) -> usize {
        self.inner.seal_calls.load(Ordering::SeqCst)
    }

    pub fn unseal_calls(&self) -> usize {
        self.inner.unseal_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.seal_calls() + self.unseal_calls()
    }

    fn injected(&self) -> Result<(), SealingError> {
        let failure = *self
            .inner
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match failure {
            Some(InjectedFailure::Transport) => {
                Err(SealingError::Transport("connection refused".to_string()))
            }
            Some(InjectedFailure::Rejected) => {
                Err(SealingError::Rejected("permission denied".to_string()))
            }
            None => Ok(()),
        }
    }

    fn cipher(&self, identity: &NodeIdentity) -> ChaCha20Poly1305 {
        let mut material = Vec::with_capacity(32 + identity.as_str().len());
        material.extend_from_slice(&self.inner.master);
        material.extend_from_slice(identity.as_str().as_bytes());
        let node_key = Zeroizing::new(blake3::derive_key(NODE_KEY_CONTEXT, &material));
        ChaCha20Poly1305::new(Key::from_slice(&node_key[..]))
    }
}

#[async_trait]
impl SealingService for MemorySealingService {
    async fn seal(
        &self,
        identity: &NodeIdentity,
        plaintext: &[u8],
    ) -> Result<SealedBlob, SealingError> {
        self.inner.seal_calls.fetch_add(1, Ordering::SeqCst);
        self.injected()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| SealingError::Rejected(format!("failed to generate nonce: {}", e)))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher(identity)
            .encrypt(nonce, plaintext)
            .map_err(|_| SealingError::Rejected("encrypt error".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(&ciphertext);
        Ok(SealedBlob::from(out))
    }

    async fn unseal(
        &self,
        identity: &NodeIdentity,
        sealed: &SealedBlob,
    ) -> Result<Zeroizing<Vec<u8>>, SealingError> {
        self.inner.unseal_calls.fetch_add(1, Ordering::SeqCst);
        self.injected()?;

        if sealed.len() < NONCE_SIZE {
            return Err(SealingError::Rejected("sealed data too short".to_string()));
        }
        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher(identity)
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map(Zeroizing::new)
            .map_err(|_| SealingError::Rejected(format!("cannot unseal for node {}", identity)))
    }
}
