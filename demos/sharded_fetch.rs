//! Example: Coalescing a thundering herd of identical fetches
//!
//! This example demonstrates:
//! - Many threads requesting the same key while a fetch is slow
//! - Exactly one backend call serving all of them
//! - Forget forcing a fresh, independent fetch

#[cfg(feature = "sharded")]
fn main() {
  use singleflight::sharded::ShardedGroup;
  use singleflight::ShardOptions;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::thread;
  use std::time::Duration;

  println!("=== Singleflight Sharded Example ===\n");

  // 1. Create a sharded group with 16 shards
  let group = Arc::new(ShardedGroup::<String, String, String>::with_options(
    ShardOptions {
      shard_count: 16,
      ..ShardOptions::default()
    },
  ));
  println!("✓ Created ShardedGroup with {} shards", group.shard_count());

  // A slow "backend" that counts how often it is actually called
  let backend_calls = Arc::new(AtomicUsize::new(0));

  // 2. Stampede: 10 threads request the same key concurrently
  println!("\n--- Thundering Herd ---");
  let mut handles = vec![];
  for thread_id in 0..10 {
    let group = group.clone();
    let backend_calls = backend_calls.clone();
    handles.push(thread::spawn(move || {
      let outcome = group.execute("profile:42".to_string(), move || {
        backend_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100)); // Simulated fetch latency
        Ok("profile_data".to_string())
      });
      (thread_id, outcome)
    }));
  }

  for handle in handles {
    let (thread_id, outcome) = handle.join().unwrap();
    println!(
      "  thread {} -> {:?} (shared: {})",
      thread_id,
      outcome.result.unwrap(),
      outcome.shared
    );
  }
  println!(
    "✓ 10 concurrent requests, {} backend call(s)",
    backend_calls.load(Ordering::SeqCst)
  );

  // 3. Forget: force a fresh fetch despite coalescing
  println!("\n--- Forget ---");
  group.forget(&"profile:42".to_string());
  let calls = backend_calls.clone();
  let outcome = group.execute("profile:42".to_string(), move || {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok("fresh_profile_data".to_string())
  });
  println!("  refetched -> {:?}", outcome.result.unwrap());
  println!(
    "✓ Total backend calls: {}",
    backend_calls.load(Ordering::SeqCst)
  );

  // 4. Channel variant: bounded wait without blocking the caller
  println!("\n--- Channel Variant ---");
  let rx = group.execute_chan("profile:7".to_string(), || {
    thread::sleep(Duration::from_millis(50));
    Ok("other_profile".to_string())
  });
  println!("  request issued, caller not blocked");
  let outcome = rx.recv().unwrap();
  println!("  delivered -> {:?}", outcome.result.unwrap());

  println!("\n=== Done ===");
}

#[cfg(not(feature = "sharded"))]
fn main() {
  eprintln!("This example requires the `sharded` feature");
}
