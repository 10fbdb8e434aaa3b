//! OriginX Core - sharded, file-backed catalog of launcher versions.
//!
//! Full version records are partitioned into small JSON shard files keyed by
//! `(storage mode, resolved root)`. A single brief index answers membership,
//! listing and grouping without loading any shard.
//!
//! # Example
//!
//! ```rust,ignore
//! use originx_core::{StorageConfig, StorageMode, VersionCatalog, VersionRecord};
//!
//! #[tokio::main]
//! async fn main() -> originx_core::Result<()> {
//!     let catalog = VersionCatalog::open("/path/to/OriginX/AppData").await?;
//!
//!     let options = StorageConfig::new(StorageMode::GlobalShared)
//!         .with_global_root("/home/u/.minecraft");
//!     catalog.add(VersionRecord::new("1.20.1", "1.20.1", options)).await?;
//!
//!     for group in catalog.get_grouped_by_storage_and_root().await {
//!         println!("{}: {} versions", group.storage_mode, group.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod models;
pub mod persist;
pub mod shard;
pub mod storage;

// Re-export commonly used types
pub use catalog::{ConsistencyReport, RepairReport, VersionCatalog, VersionCatalogBuilder};
pub use error::{CatalogError, Result};
pub use index::{BriefIndex, IndexRead};
pub use models::{
    BriefRecord, LoaderType, RootGroup, StorageMode, VersionGroup, VersionRecord, VersionStatus,
    VersionSummary, VersionType,
};
pub use shard::{shard_id, JsonShardStore, ReadOutcome, ShardCache, ShardId, ShardRead, ShardStore};
pub use storage::{absolutize, ResourceKind, RootResolver, StorageConfig, StorageRootResolver};
