#![allow(dead_code)]

pub mod kms;

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

use kms_seals::CryptsetupStore;

pub const DEVICE: &str = "/dev/sdx";
pub const NODE_UUID: &str = "75717bc6-8bec-42da-ab62-402a27ac6dd2";

/// Stands in for cryptsetup: records every invocation and its stdin, and
/// answers from per-command fixture files next to it.
const FAKE_CRYPTSETUP: &str = r#"#!/bin/sh
dir=$(dirname "$0")
cmd=$1
echo "$*" >> "$dir/calls"
cat > "$dir/stdin.$cmd"
if [ "$cmd" = luksAddKey ]; then
    for last; do :; done
    cp "$last" "$dir/newkey"
fi
if [ -f "$dir/stdout.$cmd" ]; then cat "$dir/stdout.$cmd"; fi
if [ -f "$dir/stderr.$cmd" ]; then cat "$dir/stderr.$cmd" >&2; fi
if [ -f "$dir/exit.$cmd" ]; then exit "$(cat "$dir/exit.$cmd")"; fi
exit 0
"#;

pub struct FakeCryptsetup {
    dir: TempDir,
}

impl FakeCryptsetup {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("cryptsetup");
        {
            let mut file = fs::File::create(&binary).unwrap();
            file.write_all(FAKE_CRYPTSETUP.as_bytes()).unwrap();
            file.sync_all().unwrap();
        }
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    pub fn binary(&self) -> PathBuf {
        self.dir.path().join("cryptsetup")
    }

    pub fn store(&self) -> CryptsetupStore {
        CryptsetupStore::new(self.binary())
    }

    fn fixture(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Make `command` print `stdout`
    pub fn respond(&self, command: &str, stdout: impl AsRef<[u8]>) {
        fs::write(self.fixture(&format!("stdout.{}", command)), stdout).unwrap();
    }

    /// Make `command` fail with `code` and `stderr`
    pub fn fail(&self, command: &str, code: i32, stderr: &str) {
        fs::write(self.fixture(&format!("exit.{}", command)), code.to_string()).unwrap();
        fs::write(self.fixture(&format!("stderr.{}", command)), stderr).unwrap();
    }

    pub fn succeed(&self, command: &str) {
        let _ = fs::remove_file(self.fixture(&format!("exit.{}", command)));
        let _ = fs::remove_file(self.fixture(&format!("stderr.{}", command)));
    }

    /// Every invocation so far, arguments joined by spaces
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.fixture("calls"))
            .map(|calls| calls.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// What the last invocation of `command` read from stdin
    pub fn stdin(&self, command: &str) -> Vec<u8> {
        fs::read(self.fixture(&format!("stdin.{}", command))).unwrap()
    }

    /// Contents of the new key file handed to the last `luksAddKey`
    pub fn new_key(&self) -> Vec<u8> {
        fs::read(self.fixture("newkey")).unwrap()
    }

    /// A `luksDump --dump-json-metadata` document carrying `tokens`
    pub fn dump_with_tokens(&self, tokens: serde_json::Value) {
        let dump = serde_json::json!({
            "keyslots": { "0": { "type": "luks2" } },
            "tokens": tokens,
            "segments": {},
            "digests": {},
            "config": {}
        });
        self.respond("luksDump", serde_json::to_vec(&dump).unwrap());
    }
}

/// The kms-seals binary with a clean environment
pub fn kms_seals() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_kms-seals"));
    command.env_remove("NODE_NAME").env_remove("RUST_LOG");
    command
}

/// Run `command` feeding `stdin`, and collect its output
pub fn run_with_stdin(command: &mut Command, stdin: &[u8]) -> Output {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let mut pipe = child.stdin.take().unwrap();
        // the process may exit before reading
        let _ = pipe.write_all(stdin);
    }
    child.wait_with_output().unwrap()
}

pub fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap()
}

pub fn device() -> &'static Path {
    Path::new(DEVICE)
}
