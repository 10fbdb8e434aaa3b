//! Mutating methods on VersionCatalog.

use super::VersionCatalog;
use crate::error::{CatalogError, Result};
use crate::models::{BriefRecord, VersionRecord};
use crate::shard::ShardId;
use crate::storage::StorageConfig;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

impl VersionCatalog {
    /// Add a new version.
    ///
    /// Fails with `Validation` for a blank id and `AlreadyExists` when the id
    /// is already indexed; the store is left untouched in both cases.
    pub async fn add(&self, record: VersionRecord) -> Result<()> {
        if record.has_blank_id() {
            return Err(CatalogError::validation("id", "version id must not be blank"));
        }

        let _guard = self.write_lock.lock().await;

        let mut briefs = self.index.read_all().await;
        if briefs.iter().any(|b| b.id == record.id) {
            return Err(CatalogError::AlreadyExists { id: record.id });
        }

        let brief = self.project(&record);
        let shard = brief.shard_id();
        let mut records = self.shards.read(&shard).await?.records;
        // An unindexed copy can only be debris from an interrupted write
        if records.iter().any(|r| r.id == record.id) {
            debug!("Replacing unindexed copy of {} in shard {}", record.id, shard);
            records.retain(|r| r.id != record.id);
        }
        records.push(record);
        self.shards.write(&shard, &records).await?;

        info!("Added version {} to shard {}", brief.id, shard);
        briefs.push(brief);
        self.index.write_all(&briefs).await
    }

    /// Add many versions with one write per touched shard and one index
    /// rewrite.
    ///
    /// Blank ids, ids already indexed or already present in the target
    /// shard, and repeats within the batch (first one wins) are skipped
    /// silently. Returns the number of records accepted.
    ///
    /// Not all-or-nothing: if a shard write fails, shards written before it
    /// keep their new records and the index is updated for those before the
    /// error is returned.
    pub async fn bulk_add(&self, records: Vec<VersionRecord>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut briefs = self.index.read_all().await;
        let mut seen: HashSet<String> = briefs.iter().map(|b| b.id.clone()).collect();

        // Briefs in input order; batches refer back to them by position
        let mut pending: Vec<(BriefRecord, bool)> = Vec::new();
        let mut batches: BTreeMap<ShardId, Vec<(usize, VersionRecord)>> = BTreeMap::new();
        for record in records {
            if record.has_blank_id() || !seen.insert(record.id.clone()) {
                continue;
            }
            let brief = self.project(&record);
            batches
                .entry(brief.shard_id())
                .or_default()
                .push((pending.len(), record));
            pending.push((brief, false));
        }

        let mut failure = None;
        for (shard, batch) in batches {
            let mut contents = match self.shards.read(&shard).await {
                Ok(read) => read.records,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            let present: HashSet<String> = contents.iter().map(|r| r.id.clone()).collect();

            let mut taken = Vec::new();
            for (slot, record) in batch {
                if !present.contains(&record.id) {
                    contents.push(record);
                    taken.push(slot);
                }
            }
            if taken.is_empty() {
                continue;
            }

            if let Err(e) = self.shards.write(&shard, &contents).await {
                failure = Some(e);
                break;
            }
            for slot in taken {
                pending[slot].1 = true;
            }
        }

        let before = briefs.len();
        briefs.extend(
            pending
                .into_iter()
                .filter_map(|(brief, accepted)| accepted.then_some(brief)),
        );
        let accepted = briefs.len() - before;
        if accepted > 0 {
            self.index.write_all(&briefs).await?;
        }
        info!("Bulk add accepted {} versions", accepted);

        match failure {
            Some(e) => Err(e),
            None => Ok(accepted),
        }
    }

    /// Replace an existing version, relocating it when its storage placement
    /// changed.
    ///
    /// Relocation writes the new placement (new shard, then the brief
    /// replaced in place) before removing the old shard entry. An
    /// interruption in between leaves a duplicate for [`repair`] to drop,
    /// never a lost record.
    ///
    /// [`repair`]: VersionCatalog::repair
    pub async fn update(&self, record: VersionRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.update_locked(record).await
    }

    /// Swap the storage configuration of an existing version.
    pub async fn update_storage_options(&self, id: &str, options: StorageConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound { id: id.to_string() })?;
        record.storage_options = options;
        self.update_locked(record).await
    }

    async fn update_locked(&self, record: VersionRecord) -> Result<()> {
        let mut briefs = self.index.read_all().await;
        let Some(position) = briefs.iter().position(|b| b.id == record.id) else {
            return Err(CatalogError::NotFound { id: record.id });
        };
        if self.load_indexed(&briefs[position]).await?.is_none() {
            return Err(CatalogError::NotFound { id: record.id });
        }

        let old_shard = briefs[position].shard_id();
        let brief = self.project(&record);
        let new_shard = brief.shard_id();
        let id = record.id.clone();

        if old_shard == new_shard {
            let mut records = self.shards.read(&new_shard).await?.records;
            match records.iter_mut().find(|r| r.id == id) {
                Some(slot) => *slot = record,
                None => records.push(record),
            }
            self.shards.write(&new_shard, &records).await?;
            briefs[position] = brief;
            self.index.write_all(&briefs).await?;
            info!("Updated version {} in shard {}", id, new_shard);
            return Ok(());
        }

        let mut target = self.shards.read(&new_shard).await?.records;
        target.retain(|r| r.id != id);
        target.push(record);
        self.shards.write(&new_shard, &target).await?;

        briefs[position] = brief;
        self.index.write_all(&briefs).await?;

        let mut source = self.shards.read(&old_shard).await?.records;
        source.retain(|r| r.id != id);
        self.persist_shard(&old_shard, &source).await?;

        info!("Relocated version {} from shard {} to {}", id, old_shard, new_shard);
        Ok(())
    }

    /// Delete one version.
    ///
    /// Returns `false` when the id is not indexed. Otherwise the brief is
    /// dropped and the result reports whether the shard actually held the
    /// record.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut briefs = self.index.read_all().await;
        let Some(position) = briefs.iter().position(|b| b.id == id) else {
            return Ok(false);
        };

        let shard = briefs[position].shard_id();
        let mut records = self.shards.read(&shard).await?.records;
        let before = records.len();
        records.retain(|r| r.id != id);
        let removed = records.len() < before;
        if removed {
            self.persist_shard(&shard, &records).await?;
        } else {
            warn!("Version {} was indexed but absent from shard {}", id, shard);
        }

        briefs.remove(position);
        self.index.write_all(&briefs).await?;

        info!("Deleted version {}", id);
        Ok(removed)
    }

    /// Delete many versions with one pass per touched shard and one index
    /// rewrite. Returns how many records were removed from shards.
    pub async fn bulk_delete<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let wanted: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let briefs = self.index.read_all().await;

        let mut by_shard: BTreeMap<ShardId, HashSet<&str>> = BTreeMap::new();
        for brief in briefs.iter().filter(|b| wanted.contains(b.id.as_str())) {
            by_shard
                .entry(brief.shard_id())
                .or_default()
                .insert(brief.id.as_str());
        }
        if by_shard.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        for (shard, doomed) in &by_shard {
            let mut records = self.shards.read(shard).await?.records;
            let before = records.len();
            records.retain(|r| !doomed.contains(r.id.as_str()));
            if records.len() < before {
                removed += before - records.len();
                self.persist_shard(shard, &records).await?;
            }
        }

        let surviving: Vec<BriefRecord> = briefs
            .iter()
            .filter(|b| !wanted.contains(b.id.as_str()))
            .cloned()
            .collect();
        self.index.write_all(&surviving).await?;

        info!("Bulk delete removed {} versions", removed);
        Ok(removed)
    }

    /// Remove every shard and reset the index to empty.
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let removed = self.shards.clear().await?;
        self.index.write_all(&[]).await?;
        info!("Cleared version catalog ({} shards removed)", removed);
        Ok(())
    }
}
