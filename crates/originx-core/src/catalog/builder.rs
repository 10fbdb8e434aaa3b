//! Builder for configuring VersionCatalog initialization.

use super::VersionCatalog;
use crate::config::PathsConfig;
use crate::error::{CatalogError, Result};
use crate::index::BriefIndex;
use crate::shard::{JsonShardStore, ShardStore};
use crate::storage::{RootResolver, StorageRootResolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Builder for configuring VersionCatalog initialization.
///
/// # Example
///
/// ```rust,ignore
/// use originx_core::VersionCatalog;
///
/// let catalog = VersionCatalog::builder("./AppData")
///     .auto_create_dirs(true)
///     .build()
///     .await?;
/// ```
pub struct VersionCatalogBuilder {
    data_root: PathBuf,
    auto_create_dirs: bool,
    resolver: Option<Arc<dyn RootResolver>>,
    shard_store: Option<Arc<dyn ShardStore>>,
}

impl VersionCatalogBuilder {
    /// Create a new builder with the catalog data directory.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            auto_create_dirs: false,
            resolver: None,
            shard_store: None,
        }
    }

    /// Auto-create the data root and its `versions/` directory.
    ///
    /// Default: `false` (the data root must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Use a custom root resolver instead of [`StorageRootResolver`].
    pub fn with_resolver(mut self, resolver: Arc<dyn RootResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use a custom shard store instead of a [`JsonShardStore`] under
    /// `<data_root>/versions`.
    pub fn with_shard_store(mut self, store: Arc<dyn ShardStore>) -> Self {
        self.shard_store = Some(store);
        self
    }

    async fn create_dir(dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CatalogError::Io {
                message: format!("Failed to create directory: {}", dir.display()),
                path: Some(dir.to_path_buf()),
                source: Some(e),
            })
    }

    /// Build the catalog, writing an empty brief index if none exists.
    pub async fn build(self) -> Result<VersionCatalog> {
        let versions_dir = self.data_root.join(PathsConfig::VERSIONS_DIR_NAME);

        if self.auto_create_dirs {
            Self::create_dir(&self.data_root).await?;
            Self::create_dir(&versions_dir).await?;
        } else if !tokio::fs::try_exists(&self.data_root).await.unwrap_or(false) {
            return Err(CatalogError::Config {
                message: format!("Catalog root does not exist: {}", self.data_root.display()),
            });
        }

        let index = BriefIndex::new(self.data_root.join(PathsConfig::BRIEF_INDEX_FILENAME));
        index.ensure_initialized().await?;

        let shards: Arc<dyn ShardStore> = match self.shard_store {
            Some(store) => store,
            None => Arc::new(JsonShardStore::new(versions_dir)),
        };
        let resolver: Arc<dyn RootResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(StorageRootResolver),
        };

        info!("Opened version catalog at {}", self.data_root.display());
        Ok(VersionCatalog {
            data_root: self.data_root,
            shards,
            index,
            resolver,
            write_lock: Mutex::new(()),
        })
    }
}
