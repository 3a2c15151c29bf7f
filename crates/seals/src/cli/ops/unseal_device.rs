use std::path::PathBuf;

use clap::Args;

use common::error::{Categorized, ErrorCategory};
use common::keyslot::KeySlot;

use crate::cli::op::{self, ContextError, LifecycleFailure, OpContext, Plaintext};

/// Unseal the key stored in a device's token and write it to stdout.
#[derive(Args, Debug, Clone)]
pub struct UnsealDevice {
    /// Encrypted block device
    #[arg(long)]
    pub device: PathBuf,

    /// Key slot whose token holds the sealed key
    #[arg(long)]
    pub slot: KeySlot,
}

#[derive(Debug, thiserror::Error)]
pub enum UnsealDeviceError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleFailure),
}

impl Categorized for UnsealDeviceError {
    fn category(&self) -> ErrorCategory {
        match self {
            UnsealDeviceError::Context(e) => e.category(),
            UnsealDeviceError::Lifecycle(e) => e.category(),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for UnsealDevice {
    type Error = UnsealDeviceError;
    type Output = Plaintext;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let device = op::require_device(&self.device)?;
        let lifecycle = ctx.lifecycle().await?;

        let plaintext = lifecycle.unseal_device(device, self.slot).await?;
        tracing::info!(device = %device.display(), slot = %self.slot, "unsealed device key");
        Ok(Plaintext(plaintext))
    }
}
