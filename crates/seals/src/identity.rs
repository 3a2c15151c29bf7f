use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::identity::{IdentityError, NodeIdentity, NodeIdentityProvider, StaticIdentity};

/// Where the kernel exposes the SMBIOS system UUID
pub const DEFAULT_SMBIOS_UUID_PATH: &str = "/sys/class/dmi/id/product_uuid";

fn default_smbios_path() -> PathBuf {
    PathBuf::from(DEFAULT_SMBIOS_UUID_PATH)
}

/// Configuration for how the node identity is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentitySource {
    /// A fixed identifier supplied by the operator
    Static { uuid: String },

    /// The host's SMBIOS system UUID, read when the operation starts
    Smbios {
        /// Path to the UUID file (defaults to the sysfs DMI entry)
        #[serde(default = "default_smbios_path")]
        path: PathBuf,
    },
}

impl IdentitySource {
    pub fn smbios() -> Self {
        IdentitySource::Smbios {
            path: default_smbios_path(),
        }
    }

    /// Build the provider for this source.
    ///
    /// A static identity is validated here, so an empty identifier is caught
    /// before anything touches the device or the KMS.
    pub fn provider(&self) -> Result<Arc<dyn NodeIdentityProvider>, IdentityError> {
        match self {
            IdentitySource::Static { uuid } => {
                Ok(Arc::new(StaticIdentity::new(NodeIdentity::new(uuid)?)))
            }
            IdentitySource::Smbios { path } => Ok(Arc::new(SmbiosIdentity::new(path.clone()))),
        }
    }
}

/// Reads the node identity from the host's SMBIOS tables
#[derive(Debug, Clone)]
pub struct SmbiosIdentity {
    path: PathBuf,
}

impl SmbiosIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for SmbiosIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_SMBIOS_UUID_PATH)
    }
}

#[async_trait]
impl NodeIdentityProvider for SmbiosIdentity {
    async fn node_identity(&self) -> Result<NodeIdentity, IdentityError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read SMBIOS UUID from {}", self.path.display()))?;

        // firmware reports the UUID in upper case
        let identity = NodeIdentity::new(raw.to_ascii_lowercase())?;
        tracing::debug!(path = %self.path.display(), "read SMBIOS node identity");
        Ok(identity)
    }
}
