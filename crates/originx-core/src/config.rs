//! Centralized configuration for the OriginX version catalog.
//!
//! Directory and file names of the persisted layout, plus the persistence
//! policy applied to each file kind.

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "OriginX";
    /// Directory under the platform data dir that holds launcher data.
    pub const APP_DATA_DIR_NAME: &'static str = "AppData";
}

/// Names of the files and directories that make up a catalog on disk.
pub struct PathsConfig;

impl PathsConfig {
    /// Directory holding one JSON file per shard.
    pub const VERSIONS_DIR_NAME: &'static str = "versions";
    /// The single global brief index.
    pub const BRIEF_INDEX_FILENAME: &'static str = "version_briefs.json";
    /// Extension of persisted shard files.
    pub const SHARD_FILE_EXTENSION: &'static str = "json";
    /// Game directory name used when a storage configuration has no global root.
    pub const DEFAULT_GAME_DIR_NAME: &'static str = ".minecraft";
    /// Backup directory created next to the global root for isolated screenshots.
    pub const SCREENSHOTS_BACKUP_DIR_NAME: &'static str = "screenshots_backup";
    /// Shared download cache under the global root (SmartHybrid).
    pub const CACHE_DIR_NAME: &'static str = "cache";
}

/// Persistence policy for catalog files.
pub struct CatalogConfig;

impl CatalogConfig {
    /// Keep a `.bak` of the previous brief index on every rewrite.
    pub const BACKUP_BRIEF_INDEX: bool = true;
    /// Shards are small and rewritten often; no backups.
    pub const BACKUP_SHARDS: bool = false;
    /// Suffix of in-flight temp files. Files with this suffix are never shards.
    pub const TEMP_FILE_SUFFIX: &'static str = "tmp";
    /// Lower bound for `StorageConfig::cache_retention_days`.
    pub const MIN_CACHE_RETENTION_DAYS: u32 = 1;
    pub const DEFAULT_CACHE_RETENTION_DAYS: u32 = 30;
}
