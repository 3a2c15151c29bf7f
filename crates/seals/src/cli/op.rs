use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use tokio::io::AsyncReadExt;
use zeroize::Zeroizing;

use common::error::{Categorized, ErrorCategory};
use common::identity::IdentityError;
use common::lifecycle::{KeyLifecycle, LifecycleError};

use kms_seals::{Config, ConfigError, CryptsetupError, CryptsetupStore, KmsClient, KmsClientError};

pub type Lifecycle = KeyLifecycle<KmsClient, CryptsetupStore>;
pub type LifecycleFailure = LifecycleError<CryptsetupError>;

/// Failures assembling what an op needs before it does any work
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("a device path is required")]
    MissingDevice,
    #[error("failed to read stdin: {0}")]
    Stdin(#[source] io::Error),
}

impl Categorized for ContextError {
    fn category(&self) -> ErrorCategory {
        match self {
            ContextError::Config(e) => e.category(),
            ContextError::Identity(e) => e.category(),
            ContextError::MissingDevice => ErrorCategory::Configuration,
            ContextError::Stdin(_) => ErrorCategory::Environment,
        }
    }
}

pub struct OpContext {
    pub config: Config,
    pub kms: KmsClient,
    pub store: CryptsetupStore,
}

impl OpContext {
    pub fn new(config: Config) -> Result<Self, KmsClientError> {
        let kms = KmsClient::new(&config.endpoint, config.request_timeout)?;
        let store = CryptsetupStore::new(&config.cryptsetup);
        Ok(Self { config, kms, store })
    }

    /// Resolve the node identity and assemble the key lifecycle.
    pub async fn lifecycle(&self) -> Result<Lifecycle, ContextError> {
        let provider = self.config.identity()?.provider()?;
        let identity = provider.node_identity().await?;
        tracing::info!(node = %identity, endpoint = %self.config.endpoint, "using node identity");

        Ok(KeyLifecycle::new(
            identity,
            self.kms.clone(),
            self.store.clone(),
        ))
    }
}

pub fn require_device(device: &Path) -> Result<&Path, ContextError> {
    if device.as_os_str().is_empty() {
        return Err(ContextError::MissingDevice);
    }
    Ok(device)
}

/// Read stdin to the end.
pub async fn read_stdin() -> Result<Zeroizing<Vec<u8>>, ContextError> {
    let mut input = Zeroizing::new(Vec::new());
    tokio::io::stdin()
        .read_to_end(&mut *input)
        .await
        .map_err(ContextError::Stdin)?;
    Ok(input)
}

/// Writes an op's result to stdout
pub trait Report {
    fn report(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl Report for String {
    fn report(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self)
    }
}

/// Unsealed bytes, written to stdout exactly as received
pub struct Plaintext(pub Zeroizing<Vec<u8>>);

impl fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plaintext(<{} bytes>)", self.0.len())
    }
}

impl Report for Plaintext {
    fn report(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.0)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Categorized + Send + Sync + 'static;
    type Output: Report + fmt::Debug;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl $crate::cli::op::Report for OpOutput {
            fn report(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
                match self {
                    $(
                        OpOutput::$variant(output) => $crate::cli::op::Report::report(output, out),
                    )*
                }
            }
        }

        impl common::error::Categorized for OpError {
            fn category(&self) -> common::error::ErrorCategory {
                match self {
                    $(
                        OpError::$variant(e) => common::error::Categorized::category(e),
                    )*
                }
            }
        }
    };
}
