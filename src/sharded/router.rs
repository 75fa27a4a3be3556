//! Key-based routing to determine shard assignment.

use crate::config::HashFn;

/// Routes keys to shard indices via hash-and-modulo.
pub(crate) struct Router {
  hash_fn: HashFn,
  shard_count: usize,
}

impl Router {
  /// Creates a new router. The caller is responsible for having already
  /// raised `shard_count` to the configured floor.
  pub fn new(shard_count: usize, hash_fn: HashFn) -> Self {
    debug_assert!(shard_count >= 2, "shard_count below the floor");
    Self {
      hash_fn,
      shard_count,
    }
  }

  /// Routes a key to its assigned shard index.
  ///
  /// # Returns
  ///
  /// A shard index in the range `0..shard_count`.
  ///
  /// # Determinism
  ///
  /// The same key always routes to the same shard for a given hash function
  /// and shard count. Distinct keys may collide; that is expected.
  #[inline]
  pub fn route(&self, key: &[u8]) -> usize {
    ((self.hash_fn)(key) % self.shard_count as u64) as usize
  }

  /// Returns the total number of shards.
  pub fn shard_count(&self) -> usize {
    self.shard_count
  }
}
