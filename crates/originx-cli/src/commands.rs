//! Command execution.
//!
//! Every command returns a JSON object of the form
//! `{"success": true, "<key>": <payload>}`; failures surface as errors.

use crate::Command;
use anyhow::{bail, Context, Result};
use originx_core::{ResourceKind, StorageConfig, StorageMode, VersionCatalog, VersionRecord};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// Execute `command` against `catalog`.
pub async fn run(catalog: &VersionCatalog, command: Command) -> Result<Value> {
    let output = match command {
        Command::List { mode } => {
            let versions = match mode {
                Some(mode) => catalog.get_by_storage_mode(mode).await?,
                None => catalog.get_all().await?,
            };
            json!({ "success": true, "versions": versions })
        }

        Command::Groups => {
            let groups = catalog.get_grouped_by_storage_and_root().await;
            json!({ "success": true, "groups": groups })
        }

        Command::Show { id } => match catalog.get_by_id(&id).await? {
            Some(version) => json!({ "success": true, "version": version }),
            None => bail!("Version not found: {}", id),
        },

        Command::Exists { id } => {
            json!({ "success": true, "exists": catalog.exists(&id).await })
        }

        Command::Import { file } => {
            let records = read_records(&file).await?;
            let submitted = records.len();
            let accepted = catalog.bulk_add(records).await?;
            info!("Imported {} of {} records from {}", accepted, submitted, file.display());
            json!({
                "success": true,
                "accepted": accepted,
                "skipped": submitted - accepted,
            })
        }

        Command::Relocate { id, mode, root } => {
            catalog
                .update_storage_options(&id, storage_for(mode, root))
                .await?;
            let version = catalog.get_by_id(&id).await?;
            json!({ "success": true, "version": version })
        }

        Command::Delete { ids } => {
            let removed = catalog.bulk_delete(&ids).await?;
            json!({ "success": true, "removed": removed })
        }

        Command::Clear { yes } => {
            if !yes {
                bail!("Refusing to clear the catalog without --yes");
            }
            catalog.clear_all().await?;
            json!({ "success": true })
        }

        Command::Verify => {
            let report = catalog.verify_consistency().await?;
            json!({
                "success": true,
                "consistent": report.is_consistent(),
                "report": report,
            })
        }

        Command::Repair => {
            let report = catalog.repair().await?;
            json!({ "success": true, "report": report })
        }

        Command::CleanCache { id } => {
            let Some(version) = catalog.get_by_id(&id).await? else {
                bail!("Version not found: {}", id);
            };
            let options = version.storage_options;
            let removed = tokio::task::spawn_blocking(move || options.cleanup_expired_cache())
                .await
                .context("Cache cleanup task failed")??;
            json!({ "success": true, "removed": removed })
        }
    };

    Ok(output)
}

/// Load records from a file holding either one record or an array of them.
async fn read_records(file: &Path) -> Result<Vec<VersionRecord>> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    let records = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(records)
}

/// Storage configuration placing a version under `root` in `mode`.
fn storage_for(mode: StorageMode, root: PathBuf) -> StorageConfig {
    let options = StorageConfig::new(mode);
    match mode {
        StorageMode::GlobalShared | StorageMode::SmartHybrid => options.with_global_root(root),
        StorageMode::VersionIsolated => options.with_version_root(root),
        StorageMode::FullCustom => options.with_custom_path(ResourceKind::Assets, root),
    }
}
