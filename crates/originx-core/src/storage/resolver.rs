//! Root-path resolution.
//!
//! The catalog groups records by the single root directory their storage
//! configuration reduces to. The rule is owned by the storage configuration;
//! the catalog only calls it through [`RootResolver`].

use super::options::{ResourceKind, StorageConfig};
use crate::models::StorageMode;
use std::path::{Component, Path, PathBuf};

/// Maps a storage configuration to one canonical absolute root.
///
/// Implementations must be deterministic: the same configuration always
/// yields the same path, across process restarts.
pub trait RootResolver: Send + Sync {
    fn resolve_root(&self, options: &StorageConfig) -> PathBuf;
}

/// Default resolution rule.
///
/// - GlobalShared, SmartHybrid: the global root
/// - VersionIsolated: the version root, else the global root
/// - FullCustom: the first set of custom assets, saves, mods; else the global root
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageRootResolver;

impl RootResolver for StorageRootResolver {
    fn resolve_root(&self, options: &StorageConfig) -> PathBuf {
        let root = match options.storage_mode {
            StorageMode::GlobalShared | StorageMode::SmartHybrid => options.global_root(),
            StorageMode::VersionIsolated => options
                .version_root()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| options.global_root()),
            StorageMode::FullCustom => [ResourceKind::Assets, ResourceKind::Saves, ResourceKind::Mods]
                .into_iter()
                .find_map(|kind| options.custom_path(kind).map(Path::to_path_buf))
                .unwrap_or_else(|| options.global_root()),
        };

        absolutize(&root)
    }
}

/// Make `path` absolute against the current directory and drop `.` / `..`
/// segments lexically. The filesystem is not consulted, so missing
/// directories and symlinks do not change the result.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a drive prefix
                if matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
