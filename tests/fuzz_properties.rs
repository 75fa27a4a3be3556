//! Property tests over the public API.

use proptest::prelude::*;
use singleflight::Group;

#[cfg(feature = "sharded")]
use singleflight::{default_hash, sharded::ShardedGroup, ShardOptions};

proptest! {
  // A solitary call is a transparent pass-through: the exact value comes
  // back, unshared, for arbitrary keys and values.
  #[test]
  fn solo_execute_passes_value_through(
    key in prop::collection::vec(any::<u8>(), 0..64),
    value in any::<u64>(),
  ) {
    let group: Group<Vec<u8>, u64, String> = Group::new();

    let outcome = group.execute(key, move || Ok(value));

    prop_assert_eq!(outcome.result, Ok(value));
    prop_assert!(!outcome.shared);
  }

  // Same for errors: passed through verbatim, never wrapped.
  #[test]
  fn solo_execute_passes_error_through(message in "[ -~]{0,48}") {
    let group: Group<&str, u64, String> = Group::new();

    let expected = message.clone();
    let outcome = group.execute("key", move || Err(message));

    prop_assert_eq!(outcome.result, Err(expected));
    prop_assert!(!outcome.shared);
  }
}

#[cfg(feature = "sharded")]
proptest! {
  // The effective shard count is the requested one, floored at 2.
  #[test]
  fn effective_shard_count_has_floor(requested in 0usize..64) {
    let group = ShardedGroup::<String, u64, String>::with_options(ShardOptions {
      shard_count: requested,
      hash_fn: default_hash,
    });

    prop_assert_eq!(group.shard_count(), requested.max(2));
  }

  // Sharded delegation preserves pass-through semantics for arbitrary
  // keys regardless of the requested shard count.
  #[test]
  fn sharded_solo_execute_passes_through(
    key in "[a-z0-9:_-]{1,32}",
    value in any::<u64>(),
    requested in 0usize..32,
  ) {
    let group = ShardedGroup::<String, u64, String>::with_options(ShardOptions {
      shard_count: requested,
      hash_fn: default_hash,
    });

    let outcome = group.execute(key, move || Ok(value));

    prop_assert_eq!(outcome.result, Ok(value));
    prop_assert!(!outcome.shared);
  }
}
