use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use common::error::{Categorized, ErrorCategory};
use common::keyslot::KeySlot;
use common::lifecycle::OpenOutcome;

use crate::cli::op::{self, ContextError, LifecycleFailure, OpContext, Report};

/// Unlock a device with its sealed key, unless the mapping is already open.
#[derive(Args, Debug, Clone)]
pub struct Open {
    /// Encrypted block device
    #[arg(long)]
    pub device: PathBuf,

    /// Key slot whose token holds the sealed key
    #[arg(long)]
    pub slot: KeySlot,

    /// Name of the device-mapper node to create under /dev/mapper
    #[arg(long)]
    pub mapped_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleFailure),
}

impl Categorized for OpenError {
    fn category(&self) -> ErrorCategory {
        match self {
            OpenError::Context(e) => e.category(),
            OpenError::Lifecycle(e) => e.category(),
        }
    }
}

// the mapped path is logged; stdout stays reserved for key material
impl Report for OpenOutcome {
    fn report(&self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Open {
    type Error = OpenError;
    type Output = OpenOutcome;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let device = op::require_device(&self.device)?;

        let lifecycle = ctx.lifecycle().await?;
        let outcome = lifecycle.open(device, self.slot, &self.mapped_name).await?;
        tracing::debug!(transitions = ?outcome.transitions, "open finished");
        Ok(outcome)
    }
}
