//! Key-slot store backed by the `cryptsetup` binary.
//!
//! | primitive    | invocation                                                          |
//! |--------------|---------------------------------------------------------------------|
//! | `read_token` | `luksDump --dump-json-metadata <device>`                            |
//! | `set_token`  | `token import --token-id <slot> --token-replace --json-file - <device>` |
//! | `add_key`    | `luksAddKey --key-slot <slot> --key-file - <device> <new key file>`  |
//! | `is_open`    | `status <mapped name>`                                              |
//! | `open`       | `open --type luks2 --key-slot <slot> --key-file - <device> <mapped name>` |
//!
//! Secrets only travel over stdin, except the new key for `luksAddKey`, which
//! cryptsetup insists on reading from a file. That file is private to the
//! process and removed as soon as the command returns.

pub mod output;

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use common::keyslot::{mapper_path, KeySlot, KeySlotError, KeySlotStore, SlotCredential, Token};

/// cryptsetup exit status for a refused passphrase
const EXIT_PERMISSION_DENIED: i32 = 2;
/// cryptsetup exit status for a missing or inactive device
const EXIT_NO_DEVICE: i32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum CryptsetupError {
    #[error("failed to run {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error talking to cryptsetup {command}: {source}")]
    Io {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("cryptsetup {command} failed ({status}): {stderr}")]
    Failed {
        command: &'static str,
        status: ExitStatus,
        stderr: String,
    },
    #[error("unexpected output from cryptsetup {command}: {reason}")]
    Output {
        command: &'static str,
        reason: String,
    },
    #[error("failed to stage new key file: {0}")]
    KeyFile(#[source] std::io::Error),
}

impl CryptsetupError {
    fn failed(command: &'static str, output: &Output) -> Self {
        CryptsetupError::Failed {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

type StoreResult<T> = Result<T, KeySlotError<CryptsetupError>>;

/// Drives LUKS2 headers through the `cryptsetup` command line tool
#[derive(Debug, Clone)]
pub struct CryptsetupStore {
    binary: PathBuf,
}

impl CryptsetupStore {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run cryptsetup and collect its output whatever the exit status.
    async fn run(
        &self,
        command: &'static str,
        args: Vec<OsString>,
        stdin: Option<&[u8]>,
    ) -> Result<Output, CryptsetupError> {
        tracing::debug!(binary = %self.binary.display(), command, "running cryptsetup");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CryptsetupError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            match pipe.write_all(input).await {
                // cryptsetup may bail out before reading; its exit status says why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(source) => return Err(CryptsetupError::Io { command, source }),
                Ok(()) => {}
            }
            // closing stdin marks the end of the key
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| CryptsetupError::Io { command, source })?;
        tracing::debug!(command, status = %output.status, "cryptsetup finished");
        Ok(output)
    }
}

/// Canonical form of a device path, for comparing symlinked names
async fn canonical(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

#[async_trait]
impl KeySlotStore for CryptsetupStore {
    type Error = CryptsetupError;

    async fn read_token(&self, device: &Path, slot: KeySlot) -> StoreResult<Option<Token>> {
        const COMMAND: &str = "luksDump";

        let output = self
            .run(
                COMMAND,
                vec![COMMAND.into(), "--dump-json-metadata".into(), device.into()],
                None,
            )
            .await?;
        if !output.status.success() {
            return Err(CryptsetupError::failed(COMMAND, &output).into());
        }

        let value = output::token_at_slot(&output.stdout, slot).map_err(|reason| {
            CryptsetupError::Output {
                command: COMMAND,
                reason,
            }
        })?;
        value
            .map(Token::from_value)
            .transpose()
            .map_err(|e| KeySlotError::token(slot, e))
    }

    async fn set_token(&self, device: &Path, slot: KeySlot, token: &Token) -> StoreResult<()> {
        const COMMAND: &str = "token import";

        let json = token.to_json().map_err(|e| KeySlotError::token(slot, e))?;
        let token_id = slot.to_string();
        let output = self
            .run(
                COMMAND,
                vec![
                    "token".into(),
                    "import".into(),
                    "--token-id".into(),
                    token_id.into(),
                    "--token-replace".into(),
                    "--json-file".into(),
                    "-".into(),
                    device.into(),
                ],
                Some(json.as_slice()),
            )
            .await?;
        if !output.status.success() {
            return Err(CryptsetupError::failed(COMMAND, &output).into());
        }
        Ok(())
    }

    async fn add_key(
        &self,
        device: &Path,
        existing: &SlotCredential,
        new: &SlotCredential,
    ) -> StoreResult<()> {
        const COMMAND: &str = "luksAddKey";

        let mut key_file = tempfile::Builder::new()
            .prefix(".kms-seals-key-")
            .tempfile()
            .map_err(CryptsetupError::KeyFile)?;
        key_file
            .write_all(new.passphrase())
            .and_then(|_| key_file.flush())
            .map_err(CryptsetupError::KeyFile)?;

        let new_slot = new.slot().to_string();
        let output = self
            .run(
                COMMAND,
                vec![
                    COMMAND.into(),
                    "--key-slot".into(),
                    new_slot.into(),
                    "--key-file".into(),
                    "-".into(),
                    device.into(),
                    key_file.path().into(),
                ],
                Some(existing.passphrase()),
            )
            .await;
        // remove the key file before looking at the result
        drop(key_file);
        let output = output?;

        match output.status.code() {
            Some(0) => Ok(()),
            Some(EXIT_PERMISSION_DENIED) => Err(KeySlotError::CredentialRejected {
                slot: existing.slot(),
            }),
            _ => Err(CryptsetupError::failed(COMMAND, &output).into()),
        }
    }

    async fn is_open(&self, device: &Path, mapped_name: &str) -> StoreResult<bool> {
        const COMMAND: &str = "status";

        let output = self
            .run(COMMAND, vec![COMMAND.into(), mapped_name.into()], None)
            .await?;

        match output.status.code() {
            Some(0) => {}
            Some(EXIT_NO_DEVICE) => return Ok(false),
            _ => return Err(CryptsetupError::failed(COMMAND, &output).into()),
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let backing = output::status_device(&stdout).ok_or_else(|| CryptsetupError::Output {
            command: COMMAND,
            reason: format!("no backing device reported for {}", mapped_name),
        })?;

        if canonical(&backing).await == canonical(device).await {
            Ok(true)
        } else {
            Err(KeySlotError::MappingConflict {
                mapped_name: mapped_name.to_string(),
                backing,
            })
        }
    }

    async fn open(
        &self,
        device: &Path,
        mapped_name: &str,
        credential: &SlotCredential,
    ) -> StoreResult<PathBuf> {
        const COMMAND: &str = "open";

        let slot = credential.slot().to_string();
        let output = self
            .run(
                COMMAND,
                vec![
                    COMMAND.into(),
                    "--type".into(),
                    "luks2".into(),
                    "--key-slot".into(),
                    slot.into(),
                    "--key-file".into(),
                    "-".into(),
                    device.into(),
                    mapped_name.into(),
                ],
                Some(credential.passphrase()),
            )
            .await?;

        match output.status.code() {
            Some(0) => Ok(mapper_path(mapped_name)),
            Some(EXIT_PERMISSION_DENIED) => Err(KeySlotError::CredentialRejected {
                slot: credential.slot(),
            }),
            _ => Err(CryptsetupError::failed(COMMAND, &output).into()),
        }
    }
}
