//! Entity types stored and returned by the catalog.

mod brief;
mod version;

pub use brief::{BriefRecord, RootGroup, VersionGroup, VersionSummary};
pub use version::{LoaderType, StorageMode, VersionRecord, VersionStatus, VersionType};
