//! # Singleflight
//!
//! `singleflight` is a request-coalescing primitive: when many concurrent
//! callers ask for the same logical key, the expensive work function for that
//! key runs at most once at a time, and every concurrent caller observes the
//! single execution's result.
//!
//! It exists to protect downstream resources (databases, remote services,
//! expensive computations) from bursts of duplicate concurrent work. It is
//! **not** a cache: a completed call's result is discarded as soon as all
//! attached callers have received it, and the next call for the same key
//! starts fresh.
//!
//! ## Key Features
//!
//! * **Exactly-once in-flight execution**: concurrent calls for one key are
//!   coalesced into a single run of the work function.
//! * **Blocking and channel delivery**: [`Group::execute`] blocks the caller;
//!   [`Group::execute_chan`] returns immediately with a capacity-1 channel.
//! * **Explicit invalidation**: [`Group::forget`] detaches the in-flight call
//!   so the next caller starts an independent execution.
//! * **Sharding**: [`sharded::ShardedGroup`] partitions keys across N
//!   independent lock domains to bound contention under high key cardinality.
//! * **Transparent errors**: work-function errors pass through verbatim to
//!   every attached caller. Never retried, never wrapped.
//!
//! ## Example
//!
//! ```
//! use singleflight::Group;
//!
//! let group: Group<String, u64, String> = Group::new();
//!
//! let outcome = group.execute("users:42".to_string(), || Ok(7));
//! assert_eq!(outcome.result, Ok(7));
//! assert!(!outcome.shared);
//! ```
//!
//! ## Key and value types
//!
//! Keys need `Eq + Hash + Clone`; the sharded group additionally requires
//! `AsRef<[u8]>` so keys can be hashed by their byte representation for shard
//! routing. Values and errors are delivered to waiters by clone; wrap them in
//! `Arc` when clones are expensive or when reference-identical delivery is
//! required (this also covers non-`Clone` errors such as `std::io::Error`).

mod call;
mod config;
mod group;

// Sharded group extension (optional feature)
#[cfg(feature = "sharded")]
pub mod sharded;

// Re-exports for the flat public API
pub use call::Outcome;
pub use config::{default_hash, HashFn, ShardOptions, DEFAULT_SHARD_COUNT, MIN_SHARD_COUNT};
pub use group::Group;

use std::hash::Hash;

use crossbeam_channel::Receiver;

/// Anything that coalesces keyed calls: [`Group`] and
/// [`sharded::ShardedGroup`] both implement this.
///
/// Useful at seams where the caller should not care whether the coordinator
/// is sharded. The `Send + 'static` bounds come from the channel variant,
/// which runs the work function on a detached thread.
pub trait Coalesce<K, V, E>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  /// Executes `work` for `key`, coalescing with any in-flight call.
  /// Blocks until the (possibly shared) execution completes.
  fn execute<F>(&self, key: K, work: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>;

  /// Channel-based variant of [`Coalesce::execute`]; returns immediately.
  fn execute_chan<F>(&self, key: K, work: F) -> Receiver<Outcome<V, E>>
  where
    F: FnOnce() -> Result<V, E> + Send + 'static;

  /// Detaches any in-flight call for `key` so the next caller starts fresh.
  fn forget(&self, key: &K);
}
