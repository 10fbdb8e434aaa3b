//! The global brief index file.

use crate::config::CatalogConfig;
use crate::models::BriefRecord;
use crate::persist::{atomic_write_json, read_json};
use crate::shard::ReadOutcome;
use crate::{CatalogError, Result};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Result of reading the brief index.
#[derive(Debug, Clone)]
pub struct IndexRead {
    pub briefs: Vec<BriefRecord>,
    pub outcome: ReadOutcome,
}

/// Ordered list of [`BriefRecord`]s persisted as one JSON array.
///
/// Reads are served from an in-memory copy once the file has been loaded
/// successfully; every `write_all` refreshes that copy.
#[derive(Debug)]
pub struct BriefIndex {
    path: PathBuf,
    cached: RwLock<Option<Vec<BriefRecord>>>,
}

impl BriefIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an empty index if no file exists yet.
    ///
    /// Returns whether the file was created.
    pub async fn ensure_initialized(&self) -> Result<bool> {
        let present = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| CatalogError::io_with_path(e, &self.path))?;
        if present {
            return Ok(false);
        }
        self.write_all(&[]).await?;
        debug!("Initialized brief index at {}", self.path.display());
        Ok(true)
    }

    pub async fn read(&self) -> IndexRead {
        let cached = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(briefs) = cached {
            return IndexRead {
                briefs,
                outcome: ReadOutcome::Ok,
            };
        }

        match read_json::<Vec<BriefRecord>>(&self.path).await {
            Ok(Some(briefs)) => {
                self.store_copy(&briefs);
                IndexRead {
                    briefs,
                    outcome: ReadOutcome::Ok,
                }
            }
            Ok(None) => IndexRead {
                briefs: Vec::new(),
                outcome: ReadOutcome::NotPresent,
            },
            Err(e) => {
                warn!("Brief index {} unreadable, treating as empty: {}", self.path.display(), e);
                IndexRead {
                    briefs: Vec::new(),
                    outcome: ReadOutcome::CorruptDegraded,
                }
            }
        }
    }

    /// All briefs in stored order; empty when the file is missing or corrupt.
    pub async fn read_all(&self) -> Vec<BriefRecord> {
        self.read().await.briefs
    }

    pub async fn find(&self, id: &str) -> Option<BriefRecord> {
        self.read_all().await.into_iter().find(|b| b.id == id)
    }

    /// Replace the whole index.
    pub async fn write_all(&self, briefs: &[BriefRecord]) -> Result<()> {
        atomic_write_json(&self.path, briefs, CatalogConfig::BACKUP_BRIEF_INDEX).await?;
        self.store_copy(briefs);
        debug!("Wrote brief index ({} entries)", briefs.len());
        Ok(())
    }

    /// Drop the in-memory copy so the next read goes to disk.
    pub fn invalidate(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn store_copy(&self, briefs: &[BriefRecord]) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(briefs.to_vec());
    }
}
