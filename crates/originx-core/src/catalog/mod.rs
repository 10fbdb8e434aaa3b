//! The version catalog.
//!
//! [`VersionCatalog`] composes shard addressing, the shard store and the
//! brief index. Listing, membership and grouping are answered from the brief
//! index; full records are loaded only from the shards a query implicates.
//!
//! Mutations are funneled through a per-catalog async mutex, so the
//! read-modify-write cycles on shard files and on the index never interleave
//! within one process. Reads take no lock.
//!
//! Method implementations are split across submodules:
//! - `mutations`: add / update / delete / clear
//! - `repair`: consistency check and resync

mod builder;
mod mutations;
mod repair;

pub use builder::VersionCatalogBuilder;
pub use repair::{ConsistencyReport, RepairReport};

use crate::index::BriefIndex;
use crate::models::{BriefRecord, StorageMode, VersionGroup, VersionRecord};
use crate::shard::{ReadOutcome, ShardId, ShardStore};
use crate::storage::RootResolver;
use crate::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// File-backed catalog of version records.
pub struct VersionCatalog {
    data_root: PathBuf,
    shards: Arc<dyn ShardStore>,
    index: BriefIndex,
    resolver: Arc<dyn RootResolver>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for VersionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCatalog")
            .field("data_root", &self.data_root)
            .field("index", &self.index.path())
            .finish_non_exhaustive()
    }
}

impl VersionCatalog {
    /// Start configuring a catalog rooted at `data_root`.
    pub fn builder(data_root: impl Into<PathBuf>) -> VersionCatalogBuilder {
        VersionCatalogBuilder::new(data_root)
    }

    /// Open (creating if needed) the catalog at `data_root` with default
    /// components.
    pub async fn open(data_root: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(data_root).auto_create_dirs(true).build().await
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn brief_index(&self) -> &BriefIndex {
        &self.index
    }

    /// Brief projection of `record` under this catalog's resolver.
    pub fn project(&self, record: &VersionRecord) -> BriefRecord {
        BriefRecord::project(record, self.resolver.as_ref())
    }

    // ========================================
    // Queries
    // ========================================

    /// Every record in every shard, shards visited in id order.
    pub async fn get_all(&self) -> Result<Vec<VersionRecord>> {
        let mut all = Vec::new();
        for shard in self.shards.list_shards().await? {
            all.extend(self.shards.read(&shard).await?.records);
        }
        Ok(all)
    }

    /// Look up one record through its brief, loading only its shard.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<VersionRecord>> {
        let Some(brief) = self.index.find(id).await else {
            return Ok(None);
        };
        self.load_indexed(&brief).await
    }

    /// Records stored under `mode`, loading only the shards the index names.
    pub async fn get_by_storage_mode(&self, mode: StorageMode) -> Result<Vec<VersionRecord>> {
        let mut by_shard: Vec<(ShardId, HashSet<String>)> = Vec::new();
        for brief in self
            .index
            .read_all()
            .await
            .into_iter()
            .filter(|b| b.storage_mode == mode)
        {
            let shard = brief.shard_id();
            match by_shard.iter_mut().find(|(s, _)| *s == shard) {
                Some((_, ids)) => {
                    ids.insert(brief.id);
                }
                None => by_shard.push((shard, HashSet::from([brief.id]))),
            }
        }

        let mut matched = Vec::new();
        for (shard, ids) in &by_shard {
            let read = self.shards.read(shard).await?;
            matched.extend(read.records.into_iter().filter(|r| ids.contains(&r.id)));
        }
        Ok(matched)
    }

    /// Grouped listing built from the brief index alone.
    pub async fn get_grouped_by_storage_and_root(&self) -> Vec<VersionGroup> {
        VersionGroup::build_all(&self.index.read_all().await)
    }

    /// Index membership; never touches shard files.
    pub async fn exists(&self, id: &str) -> bool {
        self.index.find(id).await.is_some()
    }

    /// Load the record a brief points at.
    async fn load_indexed(&self, brief: &BriefRecord) -> Result<Option<VersionRecord>> {
        let shard = brief.shard_id();
        let read = self.shards.read(&shard).await?;
        let found = read.records.into_iter().find(|r| r.id == brief.id);
        if found.is_none() {
            match read.outcome {
                ReadOutcome::CorruptDegraded => {
                    warn!("Version {} is indexed but shard {} is unreadable", brief.id, shard)
                }
                _ => warn!("Version {} is indexed but missing from shard {}", brief.id, shard),
            }
        }
        Ok(found)
    }

    /// Persist a shard after a removal, dropping it entirely when empty.
    async fn persist_shard(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<()> {
        if !self.shards.evict_if_empty(shard, records).await? {
            self.shards.write(shard, records).await?;
        }
        Ok(())
    }
}
