/**
 * Configuration: command line over config file over defaults.
 */
pub mod config;
/**
 * Key-slot store driving the cryptsetup binary.
 */
pub mod cryptsetup;
/**
 * The `--only-on-node` execution guard.
 */
pub mod guard;
/**
 * Node identity sources: static or SMBIOS.
 */
pub mod identity;
/**
 * gRPC client for the remote sealing service.
 */
pub mod kms;
/**
 * Logging, panic reporting, and signal handling
 *  for the CLI process.
 */
pub mod process;

pub use config::{Config, ConfigError, ConfigFile, Overrides};
pub use cryptsetup::{CryptsetupError, CryptsetupStore};
pub use kms::{KmsClient, KmsClientError};
