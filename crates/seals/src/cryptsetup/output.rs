//! Parsers for cryptsetup's textual and JSON output

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use common::keyslot::KeySlot;

/// The part of `luksDump --dump-json-metadata` we read
#[derive(Debug, Deserialize)]
struct LuksMetadata {
    #[serde(default)]
    tokens: HashMap<String, serde_json::Value>,
}

/// Pick the token whose id is `slot` out of a LUKS2 metadata dump.
pub fn token_at_slot(dump: &[u8], slot: KeySlot) -> Result<Option<serde_json::Value>, String> {
    let mut metadata: LuksMetadata =
        serde_json::from_slice(dump).map_err(|e| format!("invalid LUKS2 metadata: {}", e))?;
    Ok(metadata.tokens.remove(&slot.to_string()))
}

/// Backing device from `cryptsetup status` output.
pub fn status_device(status: &str) -> Option<PathBuf> {
    status.lines().find_map(|line| {
        line.trim()
            .strip_prefix("device:")
            .map(str::trim)
            .filter(|device| !device.is_empty())
            .map(PathBuf::from)
    })
}
