//! Consistency checking and resync between the brief index and the shards.
//!
//! The index and the shards are separate files written in sequence, so an
//! interrupted mutation can leave them disagreeing. `verify_consistency`
//! reports the disagreement without touching anything; `repair` rebuilds the
//! index from the shards and puts every record back where its configuration
//! says it belongs.

use super::VersionCatalog;
use crate::error::Result;
use crate::models::{BriefRecord, VersionRecord};
use crate::shard::{ReadOutcome, ShardId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

/// Differences found between the brief index and the shards.
///
/// All lists are sorted and free of repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    /// Indexed ids with no record in any shard.
    pub missing_records: Vec<String>,
    /// Stored ids with no brief.
    pub orphaned_records: Vec<String>,
    /// Briefs that differ from the projection of their record.
    pub drifted_briefs: Vec<String>,
    /// Ids stored more than once across all shards.
    pub duplicated_records: Vec<String>,
    /// Ids indexed more than once.
    pub duplicated_briefs: Vec<String>,
    /// Records stored in a shard other than the one their configuration
    /// resolves to.
    pub misplaced_records: Vec<String>,
    /// Shards whose file could not be parsed.
    pub corrupt_shards: Vec<ShardId>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_records.is_empty()
            && self.orphaned_records.is_empty()
            && self.drifted_briefs.is_empty()
            && self.duplicated_records.is_empty()
            && self.duplicated_briefs.is_empty()
            && self.misplaced_records.is_empty()
            && self.corrupt_shards.is_empty()
    }
}

/// What a `repair` pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Entries in the rebuilt index.
    pub briefs_written: usize,
    /// Extra copies dropped from shards.
    pub duplicates_removed: usize,
    /// Records moved to the shard their configuration resolves to.
    pub records_relocated: usize,
    /// Shard files deleted because they ended up empty.
    pub shards_removed: usize,
    /// Briefs dropped because no readable shard holds their record and the
    /// shard they name is not corrupt.
    pub briefs_dropped: usize,
    /// Shards left untouched because they could not be parsed.
    pub corrupt_shards: Vec<ShardId>,
}

/// An entry of the rebuilt index.
enum Slot {
    /// Projected from the copy kept for this id.
    Rebuilt(String),
    /// Carried over unchanged; its record is in a corrupt shard.
    Unreadable(BriefRecord),
}

/// One stored copy of a record.
struct Located {
    shard: ShardId,
    record: VersionRecord,
}

impl VersionCatalog {
    /// Read every shard, in id order, splitting readable from corrupt ones.
    async fn scan_shards(&self) -> Result<(Vec<(ShardId, Vec<VersionRecord>)>, Vec<ShardId>)> {
        let mut readable = Vec::new();
        let mut corrupt = Vec::new();
        for shard in self.shards.list_shards().await? {
            let read = self.shards.read(&shard).await?;
            match read.outcome {
                ReadOutcome::CorruptDegraded => corrupt.push(shard),
                _ => readable.push((shard, read.records)),
            }
        }
        Ok((readable, corrupt))
    }

    /// Compare the brief index against every shard. Read-only.
    pub async fn verify_consistency(&self) -> Result<ConsistencyReport> {
        let briefs = self.index.read_all().await;
        let (shards, corrupt_shards) = self.scan_shards().await?;

        let mut stored: HashMap<&str, Vec<(&ShardId, &VersionRecord)>> = HashMap::new();
        for (shard, records) in &shards {
            for record in records {
                stored.entry(record.id.as_str()).or_default().push((shard, record));
            }
        }

        let mut report = ConsistencyReport {
            corrupt_shards,
            ..Default::default()
        };

        let mut indexed: HashSet<&str> = HashSet::new();
        let mut duplicated_briefs = BTreeSet::new();
        let mut drifted = BTreeSet::new();
        let mut missing = BTreeSet::new();
        for brief in &briefs {
            if !indexed.insert(brief.id.as_str()) {
                duplicated_briefs.insert(brief.id.clone());
                continue;
            }
            let Some(copies) = stored.get(brief.id.as_str()) else {
                missing.insert(brief.id.clone());
                continue;
            };
            let indexed_shard = brief.shard_id();
            let (_, record) = copies
                .iter()
                .find(|(shard, _)| **shard == indexed_shard)
                .unwrap_or(&copies[0]);
            if self.project(record) != *brief {
                drifted.insert(brief.id.clone());
            }
        }

        let mut orphaned = BTreeSet::new();
        let mut duplicated = BTreeSet::new();
        let mut misplaced = BTreeSet::new();
        for (id, copies) in &stored {
            if !indexed.contains(id) {
                orphaned.insert(id.to_string());
            }
            if copies.len() > 1 {
                duplicated.insert(id.to_string());
            }
            if copies
                .iter()
                .any(|(shard, record)| self.project(record).shard_id() != **shard)
            {
                misplaced.insert(id.to_string());
            }
        }

        report.missing_records = missing.into_iter().collect();
        report.orphaned_records = orphaned.into_iter().collect();
        report.drifted_briefs = drifted.into_iter().collect();
        report.duplicated_records = duplicated.into_iter().collect();
        report.duplicated_briefs = duplicated_briefs.into_iter().collect();
        report.misplaced_records = misplaced.into_iter().collect();

        if !report.is_consistent() {
            warn!("Version catalog is inconsistent: {:?}", report);
        }
        Ok(report)
    }

    /// Rebuild the brief index from the shards and restore placement.
    ///
    /// - keeps one copy per id, preferring the shard the current index names
    /// - moves records to the shard their configuration resolves to
    /// - deletes shards left empty
    /// - rewrites the index: surviving indexed ids first in their old order,
    ///   then previously unindexed ids in shard order
    ///
    /// Corrupt shards are neither rewritten nor deleted, and records are not
    /// moved into them. Briefs naming a corrupt shard stay in the index so the
    /// id cannot be reused over the damaged file.
    pub async fn repair(&self) -> Result<RepairReport> {
        let _guard = self.write_lock.lock().await;

        let old_briefs = self.index.read_all().await;
        let (shards, corrupt) = self.scan_shards().await?;
        let corrupt_set: HashSet<&ShardId> = corrupt.iter().collect();

        let mut preferred: HashMap<&str, ShardId> = HashMap::new();
        for brief in &old_briefs {
            preferred
                .entry(brief.id.as_str())
                .or_insert_with(|| brief.shard_id());
        }

        // Pick one copy per id
        let mut keepers: HashMap<String, Located> = HashMap::new();
        let mut scan_order: Vec<String> = Vec::new();
        let mut copies = 0;
        for (shard, records) in &shards {
            for record in records {
                copies += 1;
                let prefer_this = preferred.get(record.id.as_str()) == Some(shard);
                match keepers.get_mut(&record.id) {
                    Some(kept) => {
                        if prefer_this && preferred.get(record.id.as_str()) != Some(&kept.shard) {
                            *kept = Located {
                                shard: shard.clone(),
                                record: record.clone(),
                            };
                        }
                    }
                    None => {
                        scan_order.push(record.id.clone());
                        keepers.insert(
                            record.id.clone(),
                            Located {
                                shard: shard.clone(),
                                record: record.clone(),
                            },
                        );
                    }
                }
            }
        }

        // Final index order. Briefs whose record sits in a corrupt shard are
        // kept as they are: the record cannot be read, but it is not gone.
        let mut order: Vec<Slot> = Vec::new();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut briefs_dropped = 0;
        for brief in &old_briefs {
            if keepers.contains_key(&brief.id) {
                if placed.insert(brief.id.as_str()) {
                    order.push(Slot::Rebuilt(brief.id.clone()));
                }
            } else if corrupt_set.contains(&brief.shard_id()) {
                if placed.insert(brief.id.as_str()) {
                    order.push(Slot::Unreadable(brief.clone()));
                }
            } else {
                briefs_dropped += 1;
            }
        }
        for id in &scan_order {
            if placed.insert(id.as_str()) {
                order.push(Slot::Rebuilt(id.clone()));
            }
        }

        let mut report = RepairReport {
            duplicates_removed: copies - keepers.len(),
            briefs_dropped,
            corrupt_shards: corrupt.clone(),
            ..Default::default()
        };

        // Target layout
        let mut layout: BTreeMap<ShardId, Vec<VersionRecord>> = BTreeMap::new();
        let mut briefs: Vec<BriefRecord> = Vec::with_capacity(order.len());
        for slot in order {
            let id = match slot {
                Slot::Rebuilt(id) => id,
                Slot::Unreadable(brief) => {
                    warn!("Keeping brief {}: its shard {} is corrupt", brief.id, brief.shard_id());
                    briefs.push(brief);
                    continue;
                }
            };
            let Some(kept) = keepers.get(&id) else {
                continue;
            };
            let projected = self.project(&kept.record);
            let target = projected.shard_id();
            let target = if corrupt_set.contains(&target) {
                warn!("Leaving {} in shard {}: its target shard is corrupt", id, kept.shard);
                kept.shard.clone()
            } else {
                target
            };
            if target != kept.shard {
                report.records_relocated += 1;
            }
            layout.entry(target).or_default().push(kept.record.clone());
            briefs.push(projected);
        }

        // New placements first, then drop what is left behind
        let current: HashMap<&ShardId, &Vec<VersionRecord>> =
            shards.iter().map(|(shard, records)| (shard, records)).collect();
        for (shard, records) in &layout {
            if current.get(shard).map(|c| *c == records).unwrap_or(false) {
                continue;
            }
            self.shards.write(shard, records).await?;
        }
        self.index.write_all(&briefs).await?;

        for (shard, _) in &shards {
            if !layout.contains_key(shard) && self.shards.evict_if_empty(shard, &[]).await? {
                report.shards_removed += 1;
            }
        }

        report.briefs_written = briefs.len();
        info!(
            "Repaired version catalog: {} briefs, {} duplicates removed, {} relocated, {} shards removed",
            report.briefs_written,
            report.duplicates_removed,
            report.records_relocated,
            report.shards_removed
        );
        Ok(report)
    }
}
