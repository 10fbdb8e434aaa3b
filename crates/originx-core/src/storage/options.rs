//! Per-version storage configuration.
//!
//! A [`StorageConfig`] names the roots a version may use and, together with
//! its [`StorageMode`], decides the concrete directory of every resource kind.

use crate::config::{CatalogConfig, PathsConfig};
use crate::models::StorageMode;
use crate::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Resource directories a game version reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Assets,
    Config,
    Saves,
    Mods,
    Shaders,
    ResourcePacks,
    Logs,
    Screenshots,
    Replays,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Assets,
        ResourceKind::Config,
        ResourceKind::Saves,
        ResourceKind::Mods,
        ResourceKind::Shaders,
        ResourceKind::ResourcePacks,
        ResourceKind::Logs,
        ResourceKind::Screenshots,
        ResourceKind::Replays,
    ];

    /// Directory name under a game root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ResourceKind::Assets => "assets",
            ResourceKind::Config => "config",
            ResourceKind::Saves => "saves",
            ResourceKind::Mods => "mods",
            ResourceKind::Shaders => "shaderpacks",
            ResourceKind::ResourcePacks => "resourcepacks",
            ResourceKind::Logs => "logs",
            ResourceKind::Screenshots => "screenshots",
            ResourceKind::Replays => "replays",
        }
    }
}

/// Storage configuration carried by every version record.
///
/// Blank paths behave exactly like unset ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub storage_mode: StorageMode,

    /// Shared game directory (GlobalShared / SmartHybrid).
    pub global_root: Option<PathBuf>,
    /// Version-specific directory; falls back to the global root.
    pub version_root: Option<PathBuf>,

    // FullCustom paths
    pub custom_assets_path: Option<PathBuf>,
    pub custom_config_path: Option<PathBuf>,
    pub custom_saves_path: Option<PathBuf>,
    pub custom_mods_path: Option<PathBuf>,
    pub custom_shaders_path: Option<PathBuf>,
    pub custom_resource_packs_path: Option<PathBuf>,
    /// Overrides the logs directory in every mode.
    pub custom_logs_path: Option<PathBuf>,
    pub custom_screenshots_path: Option<PathBuf>,
    pub custom_replays_path: Option<PathBuf>,

    pub auto_create_folders: bool,
    pub validate_resources: bool,
    cache_retention_days: u32,
    /// SmartHybrid only: share resource packs across versions.
    pub allow_cross_version_resource_packs: bool,
    /// VersionIsolated only: mirror screenshots into the global root.
    pub backup_screenshots_to_global: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            global_root: None,
            version_root: None,
            custom_assets_path: None,
            custom_config_path: None,
            custom_saves_path: None,
            custom_mods_path: None,
            custom_shaders_path: None,
            custom_resource_packs_path: None,
            custom_logs_path: None,
            custom_screenshots_path: None,
            custom_replays_path: None,
            auto_create_folders: true,
            validate_resources: true,
            cache_retention_days: CatalogConfig::DEFAULT_CACHE_RETENTION_DAYS,
            allow_cross_version_resource_packs: true,
            backup_screenshots_to_global: false,
        }
    }
}

impl StorageConfig {
    /// Configuration for `mode` with every path unset.
    pub fn new(mode: StorageMode) -> Self {
        Self {
            storage_mode: mode,
            ..Default::default()
        }
    }

    pub fn with_global_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.global_root = Some(root.into());
        self
    }

    pub fn with_version_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.version_root = Some(root.into());
        self
    }

    /// Set the custom directory for `kind` (FullCustom).
    pub fn with_custom_path(mut self, kind: ResourceKind, path: impl Into<PathBuf>) -> Self {
        let path = Some(path.into());
        match kind {
            ResourceKind::Assets => self.custom_assets_path = path,
            ResourceKind::Config => self.custom_config_path = path,
            ResourceKind::Saves => self.custom_saves_path = path,
            ResourceKind::Mods => self.custom_mods_path = path,
            ResourceKind::Shaders => self.custom_shaders_path = path,
            ResourceKind::ResourcePacks => self.custom_resource_packs_path = path,
            ResourceKind::Logs => self.custom_logs_path = path,
            ResourceKind::Screenshots => self.custom_screenshots_path = path,
            ResourceKind::Replays => self.custom_replays_path = path,
        }
        self
    }

    /// Global root, or the platform default game directory when unset.
    pub fn global_root(&self) -> PathBuf {
        non_blank(&self.global_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(default_global_root)
    }

    pub fn version_root(&self) -> Option<&Path> {
        non_blank(&self.version_root)
    }

    /// The custom directory configured for `kind`, if any.
    pub fn custom_path(&self, kind: ResourceKind) -> Option<&Path> {
        let path = match kind {
            ResourceKind::Assets => &self.custom_assets_path,
            ResourceKind::Config => &self.custom_config_path,
            ResourceKind::Saves => &self.custom_saves_path,
            ResourceKind::Mods => &self.custom_mods_path,
            ResourceKind::Shaders => &self.custom_shaders_path,
            ResourceKind::ResourcePacks => &self.custom_resource_packs_path,
            ResourceKind::Logs => &self.custom_logs_path,
            ResourceKind::Screenshots => &self.custom_screenshots_path,
            ResourceKind::Replays => &self.custom_replays_path,
        };
        non_blank(path)
    }

    pub fn cache_retention_days(&self) -> u32 {
        self.cache_retention_days
            .max(CatalogConfig::MIN_CACHE_RETENTION_DAYS)
    }

    pub fn set_cache_retention_days(&mut self, days: u32) {
        self.cache_retention_days = days.max(CatalogConfig::MIN_CACHE_RETENTION_DAYS);
    }

    /// Resolve the directory used for `kind` under the current mode.
    ///
    /// FullCustom requires an explicit path for every kind and reports a
    /// validation error when one is missing.
    pub fn resource_dir(&self, kind: ResourceKind) -> Result<PathBuf> {
        if kind == ResourceKind::Logs {
            if let Some(logs) = self.custom_path(ResourceKind::Logs) {
                return Ok(logs.to_path_buf());
            }
        }

        let global = self.global_root();
        let isolated = self
            .version_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| global.clone());

        let base = match self.storage_mode {
            StorageMode::GlobalShared => global,
            StorageMode::VersionIsolated => isolated,
            StorageMode::SmartHybrid => match kind {
                ResourceKind::Config | ResourceKind::Mods => isolated,
                ResourceKind::ResourcePacks if !self.allow_cross_version_resource_packs => isolated,
                _ => global,
            },
            StorageMode::FullCustom => {
                return self
                    .custom_path(kind)
                    .map(Path::to_path_buf)
                    .ok_or_else(|| {
                        CatalogError::validation(
                            format!("custom_{}_path", kind.dir_name()),
                            "FullCustom storage requires an explicit path",
                        )
                    });
            }
        };

        Ok(base.join(kind.dir_name()))
    }

    /// Create every resolved resource directory.
    ///
    /// Does nothing when `auto_create_folders` is off. Returns the directories
    /// that were ensured.
    pub async fn initialize_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.auto_create_folders {
            return Ok(Vec::new());
        }

        let mut dirs = ResourceKind::ALL
            .iter()
            .map(|kind| self.resource_dir(*kind))
            .collect::<Result<Vec<_>>>()?;

        if self.storage_mode == StorageMode::VersionIsolated && self.backup_screenshots_to_global {
            dirs.push(
                self.global_root()
                    .join(PathsConfig::SCREENSHOTS_BACKUP_DIR_NAME),
            );
        }

        for dir in &dirs {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CatalogError::io_with_path(e, dir))?;
            debug!("Ensured storage directory {}", dir.display());
        }

        Ok(dirs)
    }

    /// Shared cache directory under the global root.
    pub fn cache_dir(&self) -> PathBuf {
        self.global_root().join(PathsConfig::CACHE_DIR_NAME)
    }

    /// Delete cached files not modified within the retention window.
    ///
    /// Only SmartHybrid keeps a shared cache; other modes return 0. Files that
    /// cannot be inspected or removed (in use, no permission) are skipped.
    /// Returns the number of files deleted.
    pub fn cleanup_expired_cache(&self) -> Result<usize> {
        if self.storage_mode != StorageMode::SmartHybrid {
            return Ok(0);
        }

        let cache_dir = self.cache_dir();
        if !cache_dir.is_dir() {
            return Ok(0);
        }

        let retention = Duration::from_secs(u64::from(self.cache_retention_days()) * 24 * 60 * 60);
        let cutoff = SystemTime::now()
            .checked_sub(retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for entry in WalkDir::new(&cache_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(modified)) => modified,
                _ => continue,
            };
            if modified >= cutoff {
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => debug!("Skipping cache file {}: {}", entry.path().display(), e),
            }
        }

        if removed > 0 {
            info!("Removed {} expired cache files from {}", removed, cache_dir.display());
        }
        Ok(removed)
    }
}

pub(crate) fn non_blank(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref()
        .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
}

fn default_global_root() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PathsConfig::DEFAULT_GAME_DIR_NAME)
}
