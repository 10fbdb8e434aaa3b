//! Shard persistence.
//!
//! [`ShardStore`] is the seam between the catalog and shard files, so the
//! catalog can be exercised against instrumented doubles. [`JsonShardStore`]
//! is the on-disk implementation: one pretty-printed JSON array per shard,
//! fronted by a [`ShardCache`].

use super::{ShardCache, ShardId};
use crate::config::CatalogConfig;
use crate::models::VersionRecord;
use crate::persist::{atomic_write_json, read_json, remove_file_if_exists};
use crate::{CatalogError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a shard read was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadOutcome {
    /// Parsed from disk or served from cache.
    Ok,
    /// No file: an empty shard.
    NotPresent,
    /// The file exists but could not be read or parsed; treated as empty.
    CorruptDegraded,
}

/// Records of one shard plus how they were obtained.
#[derive(Debug, Clone)]
pub struct ShardRead {
    pub records: Vec<VersionRecord>,
    pub outcome: ReadOutcome,
}

impl ShardRead {
    fn empty(outcome: ReadOutcome) -> Self {
        Self {
            records: Vec::new(),
            outcome,
        }
    }
}

/// Reads and writes the full records of individual shards.
#[async_trait]
pub trait ShardStore: Send + Sync {
    /// Load a shard. Missing or unreadable shards come back empty with the
    /// matching [`ReadOutcome`]; errors are reserved for stores that cannot
    /// serve reads at all.
    async fn read(&self, shard: &ShardId) -> Result<ShardRead>;

    /// Persist the full record list of a shard.
    async fn write(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<()>;

    /// Drop the cache entry and file of `shard` when `records` is empty.
    ///
    /// Returns whether the shard was evicted.
    async fn evict_if_empty(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<bool>;

    /// Every shard currently persisted, sorted.
    async fn list_shards(&self) -> Result<Vec<ShardId>>;

    /// Delete every shard and empty the cache. Returns the number of shards removed.
    async fn clear(&self) -> Result<usize>;
}

/// Shard store backed by one JSON file per shard.
#[derive(Debug)]
pub struct JsonShardStore {
    shards_dir: PathBuf,
    cache: ShardCache,
}

impl JsonShardStore {
    pub fn new(shards_dir: impl Into<PathBuf>) -> Self {
        Self {
            shards_dir: shards_dir.into(),
            cache: ShardCache::new(),
        }
    }

    pub fn shards_dir(&self) -> &Path {
        &self.shards_dir
    }

    /// Location of the file backing `shard`.
    pub fn shard_path(&self, shard: &ShardId) -> PathBuf {
        self.shards_dir.join(shard.file_name())
    }

    pub fn cache(&self) -> &ShardCache {
        &self.cache
    }
}

#[async_trait]
impl ShardStore for JsonShardStore {
    async fn read(&self, shard: &ShardId) -> Result<ShardRead> {
        let generation = self.cache.generation();
        if let Some(records) = self.cache.get(shard) {
            return Ok(ShardRead {
                records,
                outcome: ReadOutcome::Ok,
            });
        }

        let path = self.shard_path(shard);
        match read_json::<Vec<VersionRecord>>(&path).await {
            Ok(Some(records)) => {
                debug!("Loaded shard {} ({} records)", shard, records.len());
                if !self.cache.fill(shard.clone(), &records, generation) {
                    // A write landed while the file was loading
                    if let Some(newer) = self.cache.get(shard) {
                        return Ok(ShardRead {
                            records: newer,
                            outcome: ReadOutcome::Ok,
                        });
                    }
                }
                Ok(ShardRead {
                    records,
                    outcome: ReadOutcome::Ok,
                })
            }
            Ok(None) => Ok(ShardRead::empty(ReadOutcome::NotPresent)),
            Err(e) => {
                let diagnostic = CatalogError::CorruptStore {
                    path,
                    message: e.to_string(),
                };
                warn!("Treating shard {} as empty: {}", shard, diagnostic);
                Ok(ShardRead::empty(ReadOutcome::CorruptDegraded))
            }
        }
    }

    async fn write(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<()> {
        let path = self.shard_path(shard);
        atomic_write_json(&path, records, CatalogConfig::BACKUP_SHARDS).await?;
        self.cache.insert(shard.clone(), records);
        debug!("Wrote shard {} ({} records)", shard, records.len());
        Ok(())
    }

    async fn evict_if_empty(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<bool> {
        if !records.is_empty() {
            return Ok(false);
        }

        self.cache.remove(shard);
        if remove_file_if_exists(&self.shard_path(shard)).await? {
            debug!("Evicted empty shard {}", shard);
        }
        Ok(true)
    }

    async fn list_shards(&self) -> Result<Vec<ShardId>> {
        let mut entries = match tokio::fs::read_dir(&self.shards_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogError::io_with_path(e, &self.shards_dir)),
        };

        let mut shards = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogError::io_with_path(e, &self.shards_dir))?
        {
            if let Some(shard) = entry.file_name().to_str().and_then(ShardId::from_file_name) {
                shards.push(shard);
            }
        }

        shards.sort();
        Ok(shards)
    }

    async fn clear(&self) -> Result<usize> {
        let shards = self.list_shards().await?;
        let mut removed = 0;
        for shard in &shards {
            if remove_file_if_exists(&self.shard_path(shard)).await? {
                removed += 1;
            }
        }
        self.cache.clear();
        debug!("Cleared {} shards from {}", removed, self.shards_dir.display());
        Ok(removed)
    }
}
