use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use common::error::{Categorized, ErrorCategory};
use common::keyslot::{KeySlot, SlotCredential};
use common::lifecycle::SealReceipt;

use crate::cli::op::{self, ContextError, LifecycleFailure, OpContext, Report};

/// Generate a fresh key, seal it with the KMS, and enroll it into a key slot.
///
/// The passphrase in the reserved slot authorizes the enrollment and is read
/// from stdin.
#[derive(Args, Debug, Clone)]
pub struct Seal {
    /// Encrypted block device
    #[arg(long)]
    pub device: PathBuf,

    /// Key slot to enroll the sealed key into (slot 0 is reserved)
    #[arg(long)]
    pub slot: KeySlot,
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleFailure),
}

impl Categorized for SealError {
    fn category(&self) -> ErrorCategory {
        match self {
            SealError::Context(e) => e.category(),
            SealError::Lifecycle(e) => e.category(),
        }
    }
}

impl Report for SealReceipt {
    fn report(&self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Seal {
    type Error = SealError;
    type Output = SealReceipt;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let device = op::require_device(&self.device)?;
        // reject before waiting on stdin
        if self.slot.is_reserved() {
            return Err(LifecycleFailure::ReservedSlot(self.slot).into());
        }

        let lifecycle = ctx.lifecycle().await?;
        let input = op::read_stdin().await?;
        let existing = SlotCredential::existing(&input);

        tracing::info!(device = %device.display(), slot = %self.slot, "sealing a new key");
        let receipt = lifecycle.seal(device, self.slot, &existing).await?;
        Ok(receipt)
    }
}
