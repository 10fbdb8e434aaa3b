//! Shard addressing, caching and persistence.
//!
//! Full version records are partitioned into shards, one per
//! `(storage mode, resolved root)` pair.

mod addressing;
mod cache;
mod store;

pub use addressing::{shard_id, ShardId};
pub use cache::ShardCache;
pub use store::{JsonShardStore, ReadOutcome, ShardRead, ShardStore};
