//! In-memory cache of shard contents.
//!
//! Owned by a shard store instance; every read hands out a copy so callers
//! can never mutate cached state.
//!
//! Lock-free readers fill the cache after parsing a file. A fill only lands
//! if no write or eviction happened since the reader sampled
//! [`ShardCache::generation`], so a slow reader cannot replace newer records
//! with the file it loaded earlier.

use super::ShardId;
use crate::models::VersionRecord;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Shard id → records, for shards that currently hold at least one record.
#[derive(Debug, Default)]
pub struct ShardCache {
    entries: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    shards: HashMap<ShardId, Vec<VersionRecord>>,
    /// Bumped by every change made on the write path.
    generation: u64,
}

impl ShardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the cached records, if present.
    pub fn get(&self, shard: &ShardId) -> Option<Vec<VersionRecord>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .shards
            .get(shard)
            .cloned()
    }

    /// Current write generation. Sample it before loading a shard from disk
    /// and hand it to [`ShardCache::fill`].
    pub fn generation(&self) -> u64 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Replace the entry for `shard`. Empty lists remove the entry instead.
    pub fn insert(&self, shard: ShardId, records: &[VersionRecord]) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.generation += 1;
        if records.is_empty() {
            entries.shards.remove(&shard);
        } else {
            entries.shards.insert(shard, records.to_vec());
        }
    }

    /// Cache records loaded from disk, unless the cache changed since
    /// `generation` or already holds the shard.
    ///
    /// Returns whether the records were stored.
    pub fn fill(&self, shard: ShardId, records: &[VersionRecord], generation: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.generation != generation || records.is_empty() {
            return false;
        }
        match entries.shards.entry(shard) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(records.to_vec());
                true
            }
        }
    }

    pub fn remove(&self, shard: &ShardId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.generation += 1;
        entries.shards.remove(shard).is_some()
    }

    pub fn contains(&self, shard: &ShardId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .shards
            .contains_key(shard)
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.generation += 1;
        entries.shards.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .shards
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
