//! Version record types.

use crate::storage::StorageConfig;
use crate::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy deciding where a version's resources live on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum StorageMode {
    /// Every version shares one game directory.
    GlobalShared,
    /// Each version has its own directory.
    VersionIsolated,
    /// Core resources shared, version-specific resources isolated.
    #[default]
    SmartHybrid,
    /// Every resource directory is set explicitly.
    FullCustom,
}

impl StorageMode {
    pub const ALL: [StorageMode; 4] = [
        StorageMode::GlobalShared,
        StorageMode::VersionIsolated,
        StorageMode::SmartHybrid,
        StorageMode::FullCustom,
    ];

    /// Stable name, used in shard identifiers. Must never change.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::GlobalShared => "GlobalShared",
            StorageMode::VersionIsolated => "VersionIsolated",
            StorageMode::SmartHybrid => "SmartHybrid",
            StorageMode::FullCustom => "FullCustom",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = CatalogError;

    /// Accepts `GlobalShared`, `global-shared`, `global_shared`, etc.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        StorageMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().to_lowercase() == normalized)
            .ok_or_else(|| {
                CatalogError::validation("storage_mode", format!("unknown storage mode '{}'", s))
            })
    }
}

/// Release channel of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VersionType {
    #[default]
    Release,
    Snapshot,
    Beta,
    Alpha,
    /// User-made packs.
    Custom,
}

/// Mod loader bundled with a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LoaderType {
    #[default]
    Vanilla,
    Forge,
    Fabric,
    Quilt,
    OptiFine,
}

/// Installation state of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VersionStatus {
    #[default]
    NotInstalled,
    Installed,
    UpdateAvailable,
    Installing,
    InstallFailed,
}

/// Full record for one installed or installable version.
///
/// The storage mode lives inside `storage_options`; [`VersionRecord::storage_mode`]
/// reads it from there. The JSON form also carries it as a top-level
/// `storageMode`, written from `storage_options`. On read, that field only
/// matters when `storageOptions` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredVersion", into = "StoredVersion")]
pub struct VersionRecord {
    /// Globally unique identity, e.g. `1.20.1` or `1.19.4-forge-45.0.54`.
    pub id: String,
    pub display_name: String,
    pub version_type: VersionType,
    pub loader_type: LoaderType,
    pub release_date: Option<DateTime<Utc>>,
    pub status: VersionStatus,
    pub icon_path: Option<String>,
    pub is_favorite: bool,
    pub storage_options: StorageConfig,
}

/// On-disk shape of a [`VersionRecord`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredVersion {
    id: String,
    display_name: String,
    #[serde(default)]
    version_type: VersionType,
    #[serde(default)]
    loader_type: LoaderType,
    #[serde(default)]
    release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    status: VersionStatus,
    #[serde(default)]
    icon_path: Option<String>,
    #[serde(default)]
    is_favorite: bool,
    #[serde(default)]
    storage_mode: Option<StorageMode>,
    #[serde(default)]
    storage_options: Option<StorageConfig>,
}

impl From<StoredVersion> for VersionRecord {
    fn from(stored: StoredVersion) -> Self {
        let storage_options = match (stored.storage_options, stored.storage_mode) {
            (Some(options), _) => options,
            (None, Some(mode)) => StorageConfig::new(mode),
            (None, None) => StorageConfig::default(),
        };
        Self {
            id: stored.id,
            display_name: stored.display_name,
            version_type: stored.version_type,
            loader_type: stored.loader_type,
            release_date: stored.release_date,
            status: stored.status,
            icon_path: stored.icon_path,
            is_favorite: stored.is_favorite,
            storage_options,
        }
    }
}

impl From<VersionRecord> for StoredVersion {
    fn from(record: VersionRecord) -> Self {
        Self {
            storage_mode: Some(record.storage_mode()),
            id: record.id,
            display_name: record.display_name,
            version_type: record.version_type,
            loader_type: record.loader_type,
            release_date: record.release_date,
            status: record.status,
            icon_path: record.icon_path,
            is_favorite: record.is_favorite,
            storage_options: Some(record.storage_options),
        }
    }
}

impl VersionRecord {
    /// Create a record with default metadata.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        storage_options: StorageConfig,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            version_type: VersionType::default(),
            loader_type: LoaderType::default(),
            release_date: None,
            status: VersionStatus::default(),
            icon_path: None,
            is_favorite: false,
            storage_options,
        }
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_options.storage_mode
    }

    /// Whether the identity is empty or whitespace only.
    pub fn has_blank_id(&self) -> bool {
        self.id.trim().is_empty()
    }
}
