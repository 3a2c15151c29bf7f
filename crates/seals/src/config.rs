use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use common::error::{Categorized, ErrorCategory};

use crate::identity::IdentitySource;
use crate::kms::Transport;

pub const DEFAULT_ENDPOINT: &str = "grpc://127.0.0.1:4050";
pub const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;
pub const DEFAULT_CRYPTSETUP: &str = "cryptsetup";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    Endpoint { endpoint: String, reason: String },
    #[error("invalid log level {0:?}, expected one of trace, debug, info, warn, error")]
    LogLevel(String),
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("no node identity configured; pass --node-uuid or --in-cluster, or set [identity] in the config file")]
    MissingIdentity,
}

impl Categorized for ConfigError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// On-disk configuration, every field optional.
///
/// ```toml
/// endpoint = "grpcs://kms.example.com:4050"
/// request_timeout_secs = 30
/// log_level = "debug"
/// cryptsetup = "/sbin/cryptsetup"
///
/// [identity]
/// type = "smbios"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// KMS endpoint, `grpc://` or `grpcs://`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// How the node identity is obtained
    #[serde(default)]
    pub identity: Option<IdentitySource>,
    /// Timeout for each remote call, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Path to the cryptsetup binary
    #[serde(default)]
    pub cryptsetup: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values supplied on the command line; these win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub node_uuid: Option<String>,
    pub in_cluster: bool,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub cryptsetup: Option<PathBuf>,
}

/// Fully resolved configuration, built once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    /// Transport selected by the endpoint scheme
    pub transport: Transport,
    /// `None` when nothing configured an identity; only operations that talk
    /// to the KMS need one.
    pub identity: Option<IdentitySource>,
    pub request_timeout: Option<Duration>,
    pub log_level: tracing::Level,
    pub cryptsetup: PathBuf,
}

impl Config {
    /// Layer `overrides` over `file` over the built-in defaults.
    pub fn resolve(overrides: &Overrides, file: Option<&ConfigFile>) -> Result<Self, ConfigError> {
        let file = file.cloned().unwrap_or_default();

        let endpoint = overrides
            .endpoint
            .clone()
            .or(file.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let (endpoint, transport) = parse_endpoint(&endpoint)?;

        let identity = if let Some(uuid) = &overrides.node_uuid {
            Some(IdentitySource::Static { uuid: uuid.clone() })
        } else if overrides.in_cluster {
            // keep a custom SMBIOS path from the file
            match file.identity {
                Some(source @ IdentitySource::Smbios { .. }) => Some(source),
                _ => Some(IdentitySource::smbios()),
            }
        } else {
            file.identity
        };

        let request_timeout = match overrides.timeout_secs.or(file.request_timeout_secs) {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let log_level = match overrides.log_level.as_deref().or(file.log_level.as_deref()) {
            Some(level) => parse_log_level(level)?,
            None => DEFAULT_LOG_LEVEL,
        };

        let cryptsetup = overrides
            .cryptsetup
            .clone()
            .or(file.cryptsetup)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CRYPTSETUP));

        Ok(Self {
            endpoint,
            transport,
            identity,
            request_timeout,
            log_level,
            cryptsetup,
        })
    }

    pub fn identity(&self) -> Result<&IdentitySource, ConfigError> {
        self.identity.as_ref().ok_or(ConfigError::MissingIdentity)
    }
}

pub fn parse_endpoint(endpoint: &str) -> Result<(Url, Transport), ConfigError> {
    let invalid = |reason: String| ConfigError::Endpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    let transport = Transport::for_endpoint(&url).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok((url, transport))
}

pub fn parse_log_level(level: &str) -> Result<tracing::Level, ConfigError> {
    level
        .trim()
        .parse()
        .map_err(|_| ConfigError::LogLevel(level.to_string()))
}
