use std::path::PathBuf;

use clap::Parser;

use kms_seals::config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "kms-seals")]
#[command(about = "Seal LUKS key slots with a remote KMS, and unseal them to unlock devices")]
pub struct Args {
    /// KMS endpoint; `https://` selects TLS [default: http://127.0.0.1:4050]
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Only act when this node's name matches; otherwise exit successfully
    #[arg(long, global = true)]
    pub only_on_node: Option<String>,

    /// Name of this node, compared against --only-on-node
    #[arg(long, global = true, env = "NODE_NAME")]
    pub node_name: Option<String>,

    /// Static node identity presented to the KMS
    #[arg(long, global = true, conflicts_with = "in_cluster")]
    pub node_uuid: Option<String>,

    /// Use the host's SMBIOS system UUID as the node identity
    #[arg(long, global = true)]
    pub in_cluster: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Timeout for each KMS request, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to the cryptsetup binary [default: cryptsetup]
    #[arg(long, global = true)]
    pub cryptsetup: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            node_uuid: self.node_uuid.clone(),
            in_cluster: self.in_cluster,
            timeout_secs: self.timeout,
            log_level: self.log_level.clone(),
            cryptsetup: self.cryptsetup.clone(),
        }
    }
}
