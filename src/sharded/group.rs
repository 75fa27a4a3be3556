//! ShardedGroup implementation - the sharded public API.

use std::hash::Hash;

use crossbeam_channel::Receiver;

use crate::call::Outcome;
use crate::config::{ShardOptions, MIN_SHARD_COUNT};
use crate::group::Group;
use crate::sharded::router::Router;

/// A sharded singleflight group for workloads with many distinct keys.
///
/// Distributes keys across N independent [`Group`]s so that unrelated keys
/// contend on different locks. Deduplication behavior is identical to a
/// single `Group`; sharding only changes which lock a key funnels through.
///
/// Keys must be representable as bytes (`AsRef<[u8]>`) so the router can
/// hash them; values are unconstrained beyond the usual `Clone` delivery
/// bound.
///
/// # Example
///
/// ```
/// use singleflight::sharded::ShardedGroup;
///
/// let group = ShardedGroup::<String, String, String>::new();
/// let outcome = group.execute("profile:7".to_string(), || Ok("data".to_string()));
/// assert_eq!(outcome.result.unwrap(), "data");
/// assert!(!outcome.shared);
/// ```
pub struct ShardedGroup<K, V, E> {
  router: Router,
  shards: Vec<Group<K, V, E>>,
}

impl<K, V, E> ShardedGroup<K, V, E> {
  /// Creates a sharded group with [`ShardOptions::default`]:
  /// [`DEFAULT_SHARD_COUNT`](crate::DEFAULT_SHARD_COUNT) shards routed by
  /// [`default_hash`](crate::default_hash).
  pub fn new() -> Self {
    Self::with_options(ShardOptions::default())
  }

  /// Creates a sharded group from explicit options.
  ///
  /// Shard counts below [`MIN_SHARD_COUNT`] are silently raised to it
  /// rather than rejected; fewer than two shards provides no contention
  /// benefit. Both the count and the hash are fixed for the lifetime of
  /// the instance.
  pub fn with_options(options: ShardOptions) -> Self {
    let shard_count = options.shard_count.max(MIN_SHARD_COUNT);
    let shards = (0..shard_count).map(|_| Group::new()).collect();

    Self {
      router: Router::new(shard_count, options.hash_fn),
      shards,
    }
  }

  /// Returns the effective number of shards.
  pub fn shard_count(&self) -> usize {
    self.router.shard_count()
  }
}

impl<K, V, E> Default for ShardedGroup<K, V, E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, E> ShardedGroup<K, V, E>
where
  K: AsRef<[u8]> + Eq + Hash + Clone,
  V: Clone,
  E: Clone,
{
  fn shard(&self, key: &K) -> &Group<K, V, E> {
    &self.shards[self.router.route(key.as_ref())]
  }

  /// Executes and deduplicates `work` on the shard determined by `key`.
  ///
  /// Behavior matches [`Group::execute`]; sharding only reduces contention
  /// between unrelated keys.
  pub fn execute<F>(&self, key: K, work: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    self.shard(&key).execute(key, work)
  }

  /// Channel-based variant of [`ShardedGroup::execute`], scoped to the
  /// shard determined by `key`. Behavior matches [`Group::execute_chan`].
  pub fn execute_chan<F>(&self, key: K, work: F) -> Receiver<Outcome<V, E>>
  where
    F: FnOnce() -> Result<V, E> + Send + 'static,
    K: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
  {
    self.shard(&key).execute_chan(key, work)
  }

  /// Detaches any in-flight call for `key` on its shard.
  /// Behavior matches [`Group::forget`].
  pub fn forget(&self, key: &K) {
    self.shard(key).forget(key);
  }
}

impl<K, V, E> crate::Coalesce<K, V, E> for ShardedGroup<K, V, E>
where
  K: AsRef<[u8]> + Eq + Hash + Clone + Send + 'static,
  V: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn execute<F>(&self, key: K, work: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    ShardedGroup::execute(self, key, work)
  }

  fn execute_chan<F>(&self, key: K, work: F) -> Receiver<Outcome<V, E>>
  where
    F: FnOnce() -> Result<V, E> + Send + 'static,
  {
    ShardedGroup::execute_chan(self, key, work)
  }

  fn forget(&self, key: &K) {
    ShardedGroup::forget(self, key)
  }
}
