//! Storage configuration and root resolution.

mod options;
mod resolver;

pub use options::{ResourceKind, StorageConfig};
pub use resolver::{absolutize, RootResolver, StorageRootResolver};
