//! Brief index entries and the grouped listing built from them.

use super::version::{StorageMode, VersionRecord, VersionStatus};
use crate::shard::{shard_id, ShardId};
use crate::storage::RootResolver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimal projection of a [`VersionRecord`].
///
/// Enough to list, group and locate a version without loading its shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefRecord {
    pub id: String,
    pub display_name: String,
    pub storage_mode: StorageMode,
    /// Resolved absolute root, not the raw configuration.
    pub root_path: PathBuf,
    #[serde(default)]
    pub status: VersionStatus,
    #[serde(default)]
    pub is_favorite: bool,
}

impl BriefRecord {
    /// Project a full record. This is the only way briefs are produced.
    pub fn project(record: &VersionRecord, resolver: &dyn RootResolver) -> Self {
        Self {
            id: record.id.clone(),
            display_name: record.display_name.clone(),
            storage_mode: record.storage_mode(),
            root_path: resolver.resolve_root(&record.storage_options),
            status: record.status,
            is_favorite: record.is_favorite,
        }
    }

    /// The shard holding the full record.
    pub fn shard_id(&self) -> ShardId {
        shard_id(self.storage_mode, &self.root_path)
    }
}

/// Display-only fields of a version inside a [`VersionGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: String,
    pub display_name: String,
    pub status: VersionStatus,
    pub is_favorite: bool,
}

impl From<&BriefRecord> for VersionSummary {
    fn from(brief: &BriefRecord) -> Self {
        Self {
            id: brief.id.clone(),
            display_name: brief.display_name.clone(),
            status: brief.status,
            is_favorite: brief.is_favorite,
        }
    }
}

/// Versions sharing one resolved root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootGroup {
    pub root_path: PathBuf,
    pub versions: Vec<VersionSummary>,
}

/// Versions of one storage mode, split by root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionGroup {
    pub storage_mode: StorageMode,
    /// First root seen for this mode.
    pub root_path: Option<PathBuf>,
    pub root_groups: Vec<RootGroup>,
}

impl VersionGroup {
    /// Group briefs by mode, then by root. Both levels keep first-appearance
    /// order of the input.
    pub fn build_all(briefs: &[BriefRecord]) -> Vec<VersionGroup> {
        let mut groups: Vec<VersionGroup> = Vec::new();

        for brief in briefs {
            let group = match groups
                .iter()
                .position(|g| g.storage_mode == brief.storage_mode)
            {
                Some(idx) => &mut groups[idx],
                None => {
                    groups.push(VersionGroup {
                        storage_mode: brief.storage_mode,
                        root_path: Some(brief.root_path.clone()),
                        root_groups: Vec::new(),
                    });
                    let last = groups.len() - 1;
                    &mut groups[last]
                }
            };

            match group
                .root_groups
                .iter_mut()
                .find(|r| r.root_path == brief.root_path)
            {
                Some(root_group) => root_group.versions.push(brief.into()),
                None => group.root_groups.push(RootGroup {
                    root_path: brief.root_path.clone(),
                    versions: vec![brief.into()],
                }),
            }
        }

        groups
    }

    /// Total number of versions across all roots.
    pub fn len(&self) -> usize {
        self.root_groups.iter().map(|r| r.versions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
