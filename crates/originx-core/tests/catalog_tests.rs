//! Integration tests for the VersionCatalog public interface.
//!
//! Each test opens a catalog in its own temp directory; roots handed to
//! storage configurations are plain absolute paths and never created.

use async_trait::async_trait;
use originx_core::{
    CatalogError, JsonShardStore, ResourceKind, Result, ShardId, ShardRead, ShardStore,
    StorageConfig, StorageMode, VersionCatalog, VersionRecord, VersionStatus,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn options(mode: StorageMode, root: &str) -> StorageConfig {
    let config = StorageConfig::new(mode);
    match mode {
        StorageMode::GlobalShared | StorageMode::SmartHybrid => config.with_global_root(root),
        StorageMode::VersionIsolated => config.with_version_root(root),
        StorageMode::FullCustom => config.with_custom_path(ResourceKind::Assets, root),
    }
}

fn record(id: &str, mode: StorageMode, root: &str) -> VersionRecord {
    VersionRecord::new(id, format!("Minecraft {}", id), options(mode, root))
}

/// Open a catalog whose shard store the test can also inspect directly.
async fn open_with_store(root: &Path) -> (VersionCatalog, Arc<JsonShardStore>) {
    let store = Arc::new(JsonShardStore::new(root.join("versions")));
    let catalog = VersionCatalog::builder(root)
        .auto_create_dirs(true)
        .with_shard_store(store.clone())
        .build()
        .await
        .unwrap();
    (catalog, store)
}

fn ids(records: &[VersionRecord]) -> Vec<&str> {
    let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    ids
}

/// Shard store that refuses every call and counts the attempts.
#[derive(Default)]
struct FailingShardStore {
    calls: AtomicUsize,
}

impl FailingShardStore {
    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CatalogError::Other("shard store unavailable".into()))
    }
}

#[async_trait]
impl ShardStore for FailingShardStore {
    async fn read(&self, _shard: &ShardId) -> Result<ShardRead> {
        self.fail()
    }

    async fn write(&self, _shard: &ShardId, _records: &[VersionRecord]) -> Result<()> {
        self.fail()
    }

    async fn evict_if_empty(&self, _shard: &ShardId, _records: &[VersionRecord]) -> Result<bool> {
        self.fail()
    }

    async fn list_shards(&self) -> Result<Vec<ShardId>> {
        self.fail()
    }

    async fn clear(&self) -> Result<usize> {
        self.fail()
    }
}

/// Shard store on disk whose `write` fails from the given call onwards.
struct WriteLimitedShardStore {
    inner: JsonShardStore,
    writes: AtomicUsize,
    fail_from: usize,
}

impl WriteLimitedShardStore {
    fn new(shards_dir: impl Into<std::path::PathBuf>, fail_from: usize) -> Self {
        Self {
            inner: JsonShardStore::new(shards_dir),
            writes: AtomicUsize::new(0),
            fail_from,
        }
    }
}

#[async_trait]
impl ShardStore for WriteLimitedShardStore {
    async fn read(&self, shard: &ShardId) -> Result<ShardRead> {
        self.inner.read(shard).await
    }

    async fn write(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<()> {
        let call = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.fail_from {
            return Err(CatalogError::Other(format!("disk full writing {}", shard)));
        }
        self.inner.write(shard, records).await
    }

    async fn evict_if_empty(&self, shard: &ShardId, records: &[VersionRecord]) -> Result<bool> {
        self.inner.evict_if_empty(shard, records).await
    }

    async fn list_shards(&self) -> Result<Vec<ShardId>> {
        self.inner.list_shards().await
    }

    async fn clear(&self) -> Result<usize> {
        self.inner.clear().await
    }
}

#[tokio::test]
async fn test_example_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = VersionCatalog::open(temp_dir.path()).await.unwrap();

    catalog
        .add(record("1.20.1", StorageMode::GlobalShared, "/home/u/.minecraft"))
        .await
        .unwrap();
    catalog
        .add(record("1.19.4", StorageMode::VersionIsolated, "/home/u/mc-1194"))
        .await
        .unwrap();

    let groups = catalog.get_grouped_by_storage_and_root().await;
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].storage_mode, StorageMode::GlobalShared);
    assert_eq!(groups[0].len(), 1);
    assert_eq!(groups[0].root_groups[0].versions[0].id, "1.20.1");
    assert_eq!(groups[1].storage_mode, StorageMode::VersionIsolated);
    assert_eq!(groups[1].len(), 1);
    assert_eq!(groups[1].root_groups[0].versions[0].id, "1.19.4");

    assert!(catalog.delete("1.20.1").await.unwrap());
    let all = catalog.get_all().await.unwrap();
    assert_eq!(ids(&all), vec!["1.19.4"]);
}

#[tokio::test]
async fn test_round_trip_through_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let mut original = record("1.20.1-fabric", StorageMode::SmartHybrid, "/games/mc");
    original.status = VersionStatus::Installed;
    original.is_favorite = true;
    original.icon_path = Some("icons/fabric.png".into());

    {
        let catalog = VersionCatalog::open(temp_dir.path()).await.unwrap();
        catalog.add(original.clone()).await.unwrap();
        assert_eq!(catalog.get_by_id("1.20.1-fabric").await.unwrap(), Some(original.clone()));
    }

    let reopened = VersionCatalog::open(temp_dir.path()).await.unwrap();
    assert!(reopened.exists("1.20.1-fabric").await);
    assert_eq!(reopened.get_by_id("1.20.1-fabric").await.unwrap(), Some(original));
    assert_eq!(reopened.get_by_id("1.8.9").await.unwrap(), None);
}

#[tokio::test]
async fn test_add_rejects_duplicate_and_leaves_store_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;

    let first = record("1.20.1", StorageMode::GlobalShared, "/mc");
    let shard = catalog.project(&first).shard_id();
    catalog.add(first).await.unwrap();
    let before = std::fs::read_to_string(store.shard_path(&shard)).unwrap();

    // Same id, different placement: still a collision
    let err = catalog
        .add(record("1.20.1", StorageMode::VersionIsolated, "/elsewhere"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    assert_eq!(std::fs::read_to_string(store.shard_path(&shard)).unwrap(), before);
    assert_eq!(catalog.get_all().await.unwrap().len(), 1);
    assert_eq!(store.list_shards().await.unwrap(), vec![shard]);
}

#[tokio::test]
async fn test_add_rejects_blank_id() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = VersionCatalog::open(temp_dir.path()).await.unwrap();

    let err = catalog
        .add(record("   ", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }));
    assert!(catalog.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_index_stays_derivable_after_churn() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = VersionCatalog::open(temp_dir.path()).await.unwrap();

    for (id, mode, root) in [
        ("1.20.1", StorageMode::GlobalShared, "/mc"),
        ("1.19.4", StorageMode::VersionIsolated, "/mc-1194"),
        ("1.18.2", StorageMode::GlobalShared, "/mc"),
        ("1.16.5", StorageMode::FullCustom, "/custom/assets"),
    ] {
        catalog.add(record(id, mode, root)).await.unwrap();
    }

    // Same-shard edit
    let mut renamed = catalog.get_by_id("1.18.2").await.unwrap().unwrap();
    renamed.display_name = "Caves & Cliffs II".into();
    renamed.is_favorite = true;
    catalog.update(renamed).await.unwrap();

    // Relocation to a new mode and root
    catalog
        .update_storage_options("1.20.1", options(StorageMode::SmartHybrid, "/hybrid"))
        .await
        .unwrap();

    catalog.delete("1.19.4").await.unwrap();

    let all = catalog.get_all().await.unwrap();
    assert_eq!(ids(&all), vec!["1.16.5", "1.18.2", "1.20.1"]);

    let briefs = catalog.brief_index().read_all().await;
    assert_eq!(briefs.len(), all.len());
    for live in &all {
        let brief = briefs.iter().find(|b| b.id == live.id).unwrap();
        assert_eq!(*brief, catalog.project(live));
    }
    assert!(catalog.verify_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_emptied_shard_is_collected() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;

    let only = record("1.12.2", StorageMode::VersionIsolated, "/mc-1122");
    let shard = catalog.project(&only).shard_id();
    catalog.add(only).await.unwrap();
    assert!(store.shard_path(&shard).exists());
    assert!(store.cache().contains(&shard));

    assert!(catalog.delete("1.12.2").await.unwrap());
    assert!(!store.shard_path(&shard).exists());
    assert!(!store.cache().contains(&shard));
    assert!(store.list_shards().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_grouping_and_membership_never_touch_shards() {
    let temp_dir = TempDir::new().unwrap();
    {
        let catalog = VersionCatalog::open(temp_dir.path()).await.unwrap();
        catalog
            .add(record("1.20.1", StorageMode::GlobalShared, "/mc"))
            .await
            .unwrap();
        catalog
            .add(record("1.19.4", StorageMode::GlobalShared, "/mc-old"))
            .await
            .unwrap();
    }

    let failing = Arc::new(FailingShardStore::default());
    let catalog = VersionCatalog::builder(temp_dir.path())
        .with_shard_store(failing.clone())
        .build()
        .await
        .unwrap();

    let groups = catalog.get_grouped_by_storage_and_root().await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].root_groups.len(), 2);
    assert!(catalog.exists("1.20.1").await);
    assert!(!catalog.exists("1.7.10").await);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 0);

    // Anything needing full records surfaces the store failure
    assert!(catalog.get_by_id("1.20.1").await.is_err());
    assert!(failing.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_clear_all_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    catalog
        .add(record("1.20.1", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap();
    catalog
        .add(record("1.19.4", StorageMode::VersionIsolated, "/mc-1194"))
        .await
        .unwrap();

    catalog.clear_all().await.unwrap();
    catalog.clear_all().await.unwrap();

    assert!(catalog.get_all().await.unwrap().is_empty());
    assert!(catalog.get_grouped_by_storage_and_root().await.is_empty());
    assert!(store.list_shards().await.unwrap().is_empty());
    assert!(store.cache().is_empty());
    let index = std::fs::read_to_string(catalog.brief_index().path()).unwrap();
    assert_eq!(index.trim(), "[]");
}

#[tokio::test]
async fn test_relocation_moves_record_between_shards() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;

    let original = record("1.20.1", StorageMode::GlobalShared, "/mc");
    let old_shard = catalog.project(&original).shard_id();
    catalog.add(original.clone()).await.unwrap();
    catalog
        .add(record("1.18.2", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap();

    let mut moved = original;
    moved.storage_options = options(StorageMode::VersionIsolated, "/mc-1201");
    let new_shard = catalog.project(&moved).shard_id();
    catalog.update(moved.clone()).await.unwrap();

    let old_contents = store.read(&old_shard).await.unwrap().records;
    assert_eq!(ids(&old_contents), vec!["1.18.2"]);
    let new_contents = store.read(&new_shard).await.unwrap().records;
    assert_eq!(new_contents, vec![moved.clone()]);

    let brief = catalog.brief_index().find("1.20.1").await.unwrap();
    assert_eq!(brief.storage_mode, StorageMode::VersionIsolated);
    assert_eq!(brief.shard_id(), new_shard);

    // Index order is kept across relocation
    let order: Vec<String> = catalog
        .brief_index()
        .read_all()
        .await
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(order, vec!["1.20.1", "1.18.2"]);

    // Moving the last record out of a shard collects it
    let mut last = catalog.get_by_id("1.18.2").await.unwrap().unwrap();
    last.storage_options = options(StorageMode::VersionIsolated, "/mc-1182");
    catalog.update(last).await.unwrap();
    assert!(!store.shard_path(&old_shard).exists());
}

#[tokio::test]
async fn test_update_of_unknown_version_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = VersionCatalog::open(temp_dir.path()).await.unwrap();

    let err = catalog
        .update(record("1.4.7", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = catalog
        .update_storage_options("1.4.7", options(StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(catalog.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_add_skips_duplicates_and_blanks() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    catalog
        .add(record("1.20.1", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap();

    let mut repeat = record("1.19.4", StorageMode::GlobalShared, "/mc");
    repeat.display_name = "second copy".into();
    let accepted = catalog
        .bulk_add(vec![
            record("1.19.4", StorageMode::GlobalShared, "/mc"),
            record("", StorageMode::GlobalShared, "/mc"),
            record("1.20.1", StorageMode::VersionIsolated, "/mc-1201"),
            repeat,
            record("1.18.2", StorageMode::VersionIsolated, "/mc-1182"),
            record("1.17.1", StorageMode::GlobalShared, "/mc"),
        ])
        .await
        .unwrap();
    assert_eq!(accepted, 3);

    let all = catalog.get_all().await.unwrap();
    assert_eq!(ids(&all), vec!["1.17.1", "1.18.2", "1.19.4", "1.20.1"]);
    let first_wins = catalog.get_by_id("1.19.4").await.unwrap().unwrap();
    assert_eq!(first_wins.display_name, "Minecraft 1.19.4");

    // The pre-existing 1.20.1 was not relocated by the skipped duplicate
    let brief = catalog.brief_index().find("1.20.1").await.unwrap();
    assert_eq!(brief.storage_mode, StorageMode::GlobalShared);

    assert_eq!(store.list_shards().await.unwrap().len(), 2);
    assert!(catalog.verify_consistency().await.unwrap().is_consistent());

    // Nothing new: no error, zero accepted
    let again = catalog
        .bulk_add(vec![record("1.17.1", StorageMode::GlobalShared, "/mc")])
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn test_bulk_add_keeps_shards_written_before_a_failure() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(WriteLimitedShardStore::new(temp_dir.path().join("versions"), 2));
    let catalog = VersionCatalog::builder(temp_dir.path())
        .auto_create_dirs(true)
        .with_shard_store(store.clone())
        .build()
        .await
        .unwrap();

    let global = [
        record("1.20.1", StorageMode::GlobalShared, "/mc"),
        record("1.19.4", StorageMode::GlobalShared, "/mc"),
    ];
    let isolated = [record("1.18.2", StorageMode::VersionIsolated, "/mc-1182")];

    // Shards are written in id order; the first one succeeds, the second fails
    let global_shard = catalog.project(&global[0]).shard_id();
    let isolated_shard = catalog.project(&isolated[0]).shard_id();
    let (written, failed) = if global_shard < isolated_shard {
        (vec!["1.19.4", "1.20.1"], vec!["1.18.2"])
    } else {
        (vec!["1.18.2"], vec!["1.19.4", "1.20.1"])
    };

    let batch: Vec<VersionRecord> = global.into_iter().chain(isolated).collect();
    assert!(catalog.bulk_add(batch).await.is_err());
    assert_eq!(store.writes.load(Ordering::SeqCst), 2);

    for id in &written {
        assert!(catalog.exists(id).await, "{} should be indexed", id);
        assert!(catalog.get_by_id(id).await.unwrap().is_some());
    }
    for id in &failed {
        assert!(!catalog.exists(id).await, "{} should not be indexed", id);
    }
    assert_eq!(ids(&catalog.get_all().await.unwrap()), written);
    assert!(catalog.verify_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_bulk_add_skips_records_already_in_shard() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;

    // A stored record the index does not know about
    let stray = record("1.12.2", StorageMode::GlobalShared, "/mc");
    let shard = catalog.project(&stray).shard_id();
    store.write(&shard, &[stray]).await.unwrap();

    let accepted = catalog
        .bulk_add(vec![
            record("1.12.2", StorageMode::GlobalShared, "/mc"),
            record("1.13.2", StorageMode::GlobalShared, "/mc"),
        ])
        .await
        .unwrap();
    assert_eq!(accepted, 1);
    assert_eq!(store.read(&shard).await.unwrap().records.len(), 2);
    assert!(!catalog.exists("1.12.2").await);
}

#[tokio::test]
async fn test_bulk_delete_counts_removed_records() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    catalog
        .bulk_add(vec![
            record("1.20.1", StorageMode::GlobalShared, "/mc"),
            record("1.19.4", StorageMode::GlobalShared, "/mc"),
            record("1.18.2", StorageMode::VersionIsolated, "/mc-1182"),
            record("1.17.1", StorageMode::SmartHybrid, "/hybrid"),
        ])
        .await
        .unwrap();

    let removed = catalog
        .bulk_delete(&["1.20.1", "1.19.4", "1.18.2", "9.9.9"])
        .await
        .unwrap();
    assert_eq!(removed, 3);

    let all = catalog.get_all().await.unwrap();
    assert_eq!(ids(&all), vec!["1.17.1"]);
    assert_eq!(store.list_shards().await.unwrap().len(), 1);
    assert_eq!(catalog.brief_index().read_all().await.len(), 1);

    let none: [&str; 0] = [];
    assert_eq!(catalog.bulk_delete(&none).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_reports_index_shard_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;

    assert!(!catalog.delete("never-added").await.unwrap());

    let version = record("1.20.1", StorageMode::GlobalShared, "/mc");
    let shard = catalog.project(&version).shard_id();
    catalog.add(version).await.unwrap();
    catalog
        .add(record("1.19.4", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap();

    // Drop the record behind the catalog's back
    let remaining: Vec<VersionRecord> = store
        .read(&shard)
        .await
        .unwrap()
        .records
        .into_iter()
        .filter(|r| r.id != "1.20.1")
        .collect();
    store.write(&shard, &remaining).await.unwrap();

    assert!(!catalog.delete("1.20.1").await.unwrap());
    assert!(!catalog.exists("1.20.1").await);
    assert!(catalog.exists("1.19.4").await);
}

#[tokio::test]
async fn test_get_by_storage_mode_loads_indexed_records_only() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    catalog
        .bulk_add(vec![
            record("1.20.1", StorageMode::GlobalShared, "/mc"),
            record("1.19.4", StorageMode::GlobalShared, "/mc-old"),
            record("1.18.2", StorageMode::VersionIsolated, "/mc-1182"),
        ])
        .await
        .unwrap();

    // Unindexed record sharing a GlobalShared shard
    let shard = catalog.project(&record("x", StorageMode::GlobalShared, "/mc")).shard_id();
    let mut contents = store.read(&shard).await.unwrap().records;
    contents.push(record("stray", StorageMode::GlobalShared, "/mc"));
    store.write(&shard, &contents).await.unwrap();

    let shared = catalog.get_by_storage_mode(StorageMode::GlobalShared).await.unwrap();
    assert_eq!(ids(&shared), vec!["1.19.4", "1.20.1"]);

    let isolated = catalog.get_by_storage_mode(StorageMode::VersionIsolated).await.unwrap();
    assert_eq!(ids(&isolated), vec!["1.18.2"]);

    assert!(catalog
        .get_by_storage_mode(StorageMode::FullCustom)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_corrupt_shard_degrades_reads() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    let broken = record("1.20.1", StorageMode::GlobalShared, "/mc");
    let shard = catalog.project(&broken).shard_id();
    catalog.add(broken).await.unwrap();
    catalog
        .add(record("1.18.2", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap();
    catalog
        .add(record("1.19.4", StorageMode::VersionIsolated, "/mc-1194"))
        .await
        .unwrap();

    let damaged = "[{\"id\": \"1.20.1\", ";
    std::fs::write(store.shard_path(&shard), damaged).unwrap();

    // A fresh catalog has a cold cache and must read the damaged file
    let (cold, _) = open_with_store(temp_dir.path()).await;
    assert_eq!(cold.get_by_id("1.20.1").await.unwrap(), None);
    assert!(cold.exists("1.20.1").await);
    assert_eq!(ids(&cold.get_all().await.unwrap()), vec!["1.19.4"]);

    let report = cold.verify_consistency().await.unwrap();
    assert_eq!(report.corrupt_shards, vec![shard.clone()]);
    assert_eq!(
        report.missing_records,
        vec!["1.18.2".to_string(), "1.20.1".to_string()]
    );

    // Repair leaves the damaged file and the briefs pointing at it alone
    let repaired = cold.repair().await.unwrap();
    assert_eq!(repaired.corrupt_shards, vec![shard.clone()]);
    assert_eq!(repaired.briefs_dropped, 0);
    assert_eq!(repaired.briefs_written, 3);
    let order: Vec<String> = cold
        .brief_index()
        .read_all()
        .await
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(order, vec!["1.20.1", "1.18.2", "1.19.4"]);

    // The ids stay taken, so nothing gets written over the damaged shard
    assert!(cold.exists("1.18.2").await);
    let err = cold
        .add(record("1.18.2", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(std::fs::read_to_string(store.shard_path(&shard)).unwrap(), damaged);
}

#[tokio::test]
async fn test_repair_resolves_interrupted_relocation() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;

    let original = record("1.20.1", StorageMode::GlobalShared, "/mc");
    let old_shard = catalog.project(&original).shard_id();
    catalog.add(original.clone()).await.unwrap();

    let mut moved = original.clone();
    moved.storage_options = options(StorageMode::VersionIsolated, "/mc-1201");
    catalog.update(moved.clone()).await.unwrap();

    // Replay an interruption before the old copy was removed
    store.write(&old_shard, &[original]).await.unwrap();

    let report = catalog.verify_consistency().await.unwrap();
    assert_eq!(report.duplicated_records, vec!["1.20.1".to_string()]);
    // The stale copy still sits where its old configuration resolves
    assert!(report.misplaced_records.is_empty());
    assert!(report.drifted_briefs.is_empty());

    let repaired = catalog.repair().await.unwrap();
    assert_eq!(repaired.duplicates_removed, 1);
    assert_eq!(repaired.shards_removed, 1);
    assert!(!store.shard_path(&old_shard).exists());

    assert_eq!(catalog.get_all().await.unwrap(), vec![moved.clone()]);
    assert_eq!(catalog.get_by_id("1.20.1").await.unwrap(), Some(moved));
    assert!(catalog.verify_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_repair_indexes_orphans_and_relocates_misplaced() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    catalog
        .add(record("1.20.1", StorageMode::GlobalShared, "/mc"))
        .await
        .unwrap();

    // Orphan in its proper shard
    let orphan = record("1.19.4", StorageMode::VersionIsolated, "/mc-1194");
    store
        .write(&catalog.project(&orphan).shard_id(), &[orphan.clone()])
        .await
        .unwrap();

    // Record sitting in a shard its configuration does not resolve to
    let misplaced = record("1.18.2", StorageMode::VersionIsolated, "/mc-1182");
    let wrong_shard = catalog
        .project(&record("x", StorageMode::SmartHybrid, "/nowhere"))
        .shard_id();
    store.write(&wrong_shard, &[misplaced.clone()]).await.unwrap();

    let report = catalog.verify_consistency().await.unwrap();
    assert_eq!(
        report.orphaned_records,
        vec!["1.18.2".to_string(), "1.19.4".to_string()]
    );
    assert_eq!(report.misplaced_records, vec!["1.18.2".to_string()]);

    let repaired = catalog.repair().await.unwrap();
    assert_eq!(repaired.briefs_written, 3);
    assert_eq!(repaired.records_relocated, 1);
    assert!(!store.shard_path(&wrong_shard).exists());

    assert!(catalog.exists("1.19.4").await);
    assert_eq!(catalog.get_by_id("1.18.2").await.unwrap(), Some(misplaced));
    assert_eq!(
        catalog.brief_index().read_all().await[0].id,
        "1.20.1",
        "previously indexed entries keep their position"
    );
    assert!(catalog.verify_consistency().await.unwrap().is_consistent());

    // Already consistent: nothing to do
    let noop = catalog.repair().await.unwrap();
    assert_eq!(noop.duplicates_removed, 0);
    assert_eq!(noop.records_relocated, 0);
    assert_eq!(noop.shards_removed, 0);
}

#[tokio::test]
async fn test_concurrent_adds_are_all_kept() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(VersionCatalog::open(temp_dir.path()).await.unwrap());

    let mut handles = Vec::new();
    for n in 0..16 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move {
            catalog
                .add(record(&format!("1.{}.0", n), StorageMode::GlobalShared, "/mc"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(catalog.get_all().await.unwrap().len(), 16);
    assert_eq!(catalog.brief_index().read_all().await.len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cold_readers_never_hide_concurrent_adds() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog, store) = open_with_store(temp_dir.path()).await;
    let catalog = Arc::new(catalog);

    let reader = {
        let catalog = catalog.clone();
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                // Force every read back to disk
                store.cache().clear();
                catalog.get_all().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    for n in 0..40 {
        catalog
            .add(record(&format!("1.{}.0", n), StorageMode::GlobalShared, "/mc"))
            .await
            .unwrap();
        tokio::task::yield_now().await;
    }
    reader.await.unwrap();

    for n in 0..40 {
        let id = format!("1.{}.0", n);
        assert!(catalog.get_by_id(&id).await.unwrap().is_some(), "{} went missing", id);
    }
    assert_eq!(catalog.get_all().await.unwrap().len(), 40);
}
