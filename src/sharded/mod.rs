//! # Sharded Group Extension
//!
//! This module provides horizontal sharding for singleflight groups through
//! the `ShardedGroup` wrapper. It enables:
//!
//! - **Automatic key-based routing** to N independent [`Group`](crate::Group)s
//! - **Independent lock domains**, so unrelated keys contend on different
//!   locks under high key cardinality
//! - **Pluggable routing hash** via [`ShardOptions`](crate::ShardOptions)
//!
//! ## Architecture
//!
//! `ShardedGroup` is pure composition: it owns a fixed-length array of
//! groups plus a router, and every operation hashes the key's bytes, takes
//! the result modulo the shard count, and delegates verbatim to that shard.
//! It adds no new state-transition logic of its own.
//!
//! ## Example
//!
//! ```
//! use singleflight::sharded::ShardedGroup;
//! use singleflight::ShardOptions;
//!
//! let group = ShardedGroup::<String, u64, String>::with_options(ShardOptions {
//!   shard_count: 16,
//!   ..ShardOptions::default()
//! });
//!
//! let outcome = group.execute("users:42".to_string(), || Ok(7));
//! assert_eq!(outcome.result, Ok(7));
//! ```
//!
//! ## Limitations
//!
//! - **Fixed shard count**: immutable after construction; a different count
//!   changes routing for *all* keys, so there is no stability guarantee
//!   across reconfiguration.
//! - **No rebalancing or migration**: routing is a pure function of the key
//!   bytes and the configured hash.

mod group;
mod router;

pub use group::ShardedGroup;
