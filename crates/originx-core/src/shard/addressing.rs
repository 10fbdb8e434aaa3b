//! Shard addressing.
//!
//! A shard is named `{mode}_{sha256(root)}` where the digest is lowercase hex
//! over the UTF-8 bytes of the resolved absolute root. Hex keeps the name
//! fixed-length and free of separators and padding on every filesystem.

use crate::config::PathsConfig;
use crate::models::StorageMode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Stable identifier of one shard file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the shard inside the versions directory.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, PathsConfig::SHARD_FILE_EXTENSION)
    }

    /// Recover the identifier from a shard file name.
    ///
    /// Returns `None` for anything that is not `<mode>_<hex>.json`, including
    /// temp and backup files left next to shards.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(&format!(".{}", PathsConfig::SHARD_FILE_EXTENSION))?;
        let (mode, digest) = stem.split_once('_')?;
        let known_mode = StorageMode::ALL.iter().any(|m| m.as_str() == mode);
        let is_digest = digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit());
        (known_mode && is_digest).then(|| ShardId(stem.to_string()))
    }

    /// Storage mode encoded in the identifier.
    pub fn storage_mode(&self) -> Option<StorageMode> {
        let (mode, _) = self.0.split_once('_')?;
        StorageMode::ALL.into_iter().find(|m| m.as_str() == mode)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the shard identifier for `(mode, root)`.
///
/// `root` must already be the resolved absolute root.
pub fn shard_id(mode: StorageMode, root: &Path) -> ShardId {
    let digest = Sha256::digest(root.to_string_lossy().as_bytes());
    ShardId(format!("{}_{}", mode.as_str(), hex::encode(digest)))
}
