use clap::Args;

use common::crypto::SealedBlob;
use common::error::{Categorized, ErrorCategory};

use crate::cli::op::{self, ContextError, LifecycleFailure, OpContext, Plaintext};

/// Unseal a blob read from stdin and write the plaintext to stdout.
#[derive(Args, Debug, Clone)]
pub struct UnsealBytes;

#[derive(Debug, thiserror::Error)]
pub enum UnsealBytesError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleFailure),
}

impl Categorized for UnsealBytesError {
    fn category(&self) -> ErrorCategory {
        match self {
            UnsealBytesError::Context(e) => e.category(),
            UnsealBytesError::Lifecycle(e) => e.category(),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for UnsealBytes {
    type Error = UnsealBytesError;
    type Output = Plaintext;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let lifecycle = ctx.lifecycle().await?;
        // the blob is opaque; no trimming
        let sealed = SealedBlob::from(op::read_stdin().await?.to_vec());

        let plaintext = lifecycle.unseal_bytes(&sealed).await?;
        tracing::info!(len = plaintext.len(), "unsealed bytes");
        Ok(Plaintext(plaintext))
    }
}
