use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use tracing::{error, trace};

use crate::call::{Call, CallState, Outcome};

/// A call-deduplication group: at most one execution of the work function is
/// in flight per key at any instant.
///
/// `Group` is a cheap handle (clones share the same state) so it can be
/// passed to worker threads freely. The internal lock guards only O(1)
/// bookkeeping on the key map; the work function always runs outside it, so
/// a slow execution for one key never blocks calls for other keys.
///
/// # Example
///
/// ```
/// use singleflight::Group;
///
/// let group: Group<String, String, String> = Group::new();
/// let outcome = group.execute("config".to_string(), || Ok("loaded".to_string()));
/// assert_eq!(outcome.result.unwrap(), "loaded");
/// ```
pub struct Group<K, V, E> {
  inner: Arc<GroupInner<K, V, E>>,
}

impl<K, V, E> Clone for Group<K, V, E> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<K, V, E> Group<K, V, E> {
  /// Creates an empty group.
  pub fn new() -> Self {
    Self {
      inner: Arc::new(GroupInner {
        calls: Mutex::new(HashMap::new()),
      }),
    }
  }
}

impl<K, V, E> Default for Group<K, V, E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, E> Group<K, V, E>
where
  K: Eq + Hash + Clone,
  V: Clone,
  E: Clone,
{
  /// Executes and deduplicates `work` for the given key.
  ///
  /// If a call for `key` is already in flight, this caller attaches to it
  /// and blocks until it completes, then observes the identical result. If
  /// not, this caller runs `work` on the current thread and delivers the
  /// result to everyone who attached in the meantime.
  ///
  /// The returned [`Outcome`] carries the work function's `Result`
  /// verbatim, plus the `shared` flag (`false` only for a caller that
  /// triggered an execution nobody else joined).
  ///
  /// # Panics
  ///
  /// If `work` panics, the panic is re-raised in every attached caller:
  /// the triggering caller resumes the original unwind, and attached
  /// callers panic with the captured message. No caller hangs.
  pub fn execute<F>(&self, key: K, work: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    let call = match self.inner.attach_or_create(&key, None) {
      Attach::Joined(call) => return call.wait(),
      Attach::Created(call) => call,
    };

    let result = panic::catch_unwind(AssertUnwindSafe(work));

    match self.inner.finish(&key, &call, result) {
      Ok(outcome) => outcome,
      Err(payload) => panic::resume_unwind(payload),
    }
  }

  /// Channel-based variant of [`Group::execute`] with identical
  /// deduplication semantics.
  ///
  /// Returns immediately. The receiver observes exactly one [`Outcome`],
  /// after which the channel disconnects. Each caller gets an independent
  /// capacity-1 channel, so a slow or dropped receiver cannot stall other
  /// receivers or the group. A fresh call runs `work` on a detached
  /// thread, hence the `Send + 'static` bounds.
  ///
  /// If `work` panics, no outcome is published: every subscriber's channel
  /// disconnects instead, so `recv()` reports an error rather than
  /// hanging.
  pub fn execute_chan<F>(&self, key: K, work: F) -> Receiver<Outcome<V, E>>
  where
    F: FnOnce() -> Result<V, E> + Send + 'static,
    K: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
  {
    let (tx, rx) = bounded(1);

    let call = match self.inner.attach_or_create(&key, Some(tx)) {
      Attach::Joined(_) => return rx,
      Attach::Created(call) => call,
    };

    let inner = self.inner.clone();
    thread::spawn(move || {
      let result = panic::catch_unwind(AssertUnwindSafe(work));
      if let Err(payload) = inner.finish(&key, &call, result) {
        error!(
          target: "singleflight",
          "detached work function panicked: {}",
          panic_message(payload.as_ref())
        );
      }
    });

    rx
  }

  /// Detaches any in-flight call for `key`.
  ///
  /// Callers already attached to that call still observe its completion
  /// normally, but any `execute`/`execute_chan` invoked after `forget`
  /// returns is guaranteed to start a brand-new, independent execution,
  /// even while the forgotten one is still running. A no-op for keys with
  /// no live call.
  ///
  /// This is the mechanism for forcing fresh work (e.g. after detecting a
  /// stale shared result) without waiting for the in-flight call.
  pub fn forget(&self, key: &K) {
    if self.inner.calls.lock().remove(key).is_some() {
      trace!(target: "singleflight", "forgot in-flight call");
    }
  }
}

/// How a caller entered the group: first for its key, or attached to an
/// existing in-flight call.
enum Attach<V, E> {
  Created(Arc<Call<V, E>>),
  Joined(Arc<Call<V, E>>),
}

struct GroupInner<K, V, E> {
  /// Key -> live call. The only shared mutable state; held for O(1)
  /// transitions only, never across the work function or a wait.
  calls: Mutex<HashMap<K, Arc<Call<V, E>>>>,
}

impl<K, V, E> GroupInner<K, V, E>
where
  K: Eq + Hash + Clone,
  V: Clone,
  E: Clone,
{
  /// Joins the live call for `key`, or creates one with this caller as the
  /// executor. A channel subscriber is registered under the map lock, so a
  /// completing executor (which must take the map lock first) can never
  /// miss it.
  fn attach_or_create(
    &self,
    key: &K,
    subscriber: Option<crossbeam_channel::Sender<Outcome<V, E>>>,
  ) -> Attach<V, E> {
    let mut calls = self.calls.lock();

    if let Some(existing) = calls.get(key) {
      existing.joiners.fetch_add(1, Ordering::Relaxed);
      if let Some(tx) = subscriber {
        existing.inner.lock().subscribers.push(tx);
      }
      trace!(target: "singleflight", "joined in-flight call");
      return Attach::Joined(existing.clone());
    }

    let call = Arc::new(Call::new());
    if let Some(tx) = subscriber {
      call.inner.lock().subscribers.push(tx);
    }
    calls.insert(key.clone(), call.clone());
    trace!(target: "singleflight", "created call");
    Attach::Created(call)
  }

  /// Records the executor's result, detaches the call from the map, and
  /// delivers the outcome to every attached caller.
  ///
  /// Returns the panic payload instead of an outcome if the work function
  /// panicked, so the blocking path can resume the original unwind.
  fn finish(
    &self,
    key: &K,
    call: &Arc<Call<V, E>>,
    result: thread::Result<Result<V, E>>,
  ) -> Result<Outcome<V, E>, Box<dyn Any + Send>> {
    // Detach first so the next caller for this key starts fresh. A racing
    // forget may have already replaced this entry with a successor call;
    // only remove our own.
    {
      let mut calls = self.calls.lock();
      let still_ours = calls
        .get(key)
        .map_or(false, |current| Arc::ptr_eq(current, call));
      if still_ours {
        calls.remove(key);
      }
    }

    // Every attach takes the map lock, so after the removal above the
    // joiner count and subscriber list are final.
    let shared = call.joiners.load(Ordering::Relaxed) > 0;

    match result {
      Ok(result) => {
        let outcome = Outcome { result, shared };
        let subscribers = {
          let mut inner = call.inner.lock();
          inner.state = CallState::Done {
            result: outcome.result.clone(),
            shared,
          };
          std::mem::take(&mut inner.subscribers)
        };
        call.done.notify_all();
        for tx in subscribers {
          // Capacity-1 channel, single message: try_send can never report
          // Full, and a disconnected (dropped) receiver is ignored.
          let _ = tx.try_send(outcome.clone());
        }
        Ok(outcome)
      }
      Err(payload) => {
        let message: Arc<str> = Arc::from(panic_message(payload.as_ref()));
        {
          let mut inner = call.inner.lock();
          inner.state = CallState::Poisoned { message };
          // Dropping the senders disconnects every channel waiter.
          inner.subscribers.clear();
        }
        call.done.notify_all();
        Err(payload)
      }
    }
  }
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "opaque panic payload".to_string()
  }
}

impl<K, V, E> crate::Coalesce<K, V, E> for Group<K, V, E>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn execute<F>(&self, key: K, work: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    Group::execute(self, key, work)
  }

  fn execute_chan<F>(&self, key: K, work: F) -> Receiver<Outcome<V, E>>
  where
    F: FnOnce() -> Result<V, E> + Send + 'static,
  {
    Group::execute_chan(self, key, work)
  }

  fn forget(&self, key: &K) {
    Group::forget(self, key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn panic_message_extracts_str_and_string() {
    let payload: Box<dyn Any + Send> = Box::new("static message");
    assert_eq!(panic_message(payload.as_ref()), "static message");

    let payload: Box<dyn Any + Send> = Box::new("owned".to_string());
    assert_eq!(panic_message(payload.as_ref()), "owned");

    let payload: Box<dyn Any + Send> = Box::new(42u8);
    assert_eq!(panic_message(payload.as_ref()), "opaque panic payload");
  }

  #[test]
  fn handles_share_state() {
    let group: Group<String, u64, String> = Group::new();
    let clone = group.clone();

    let outcome = clone.execute("k".to_string(), || Ok(1));
    assert_eq!(outcome.result, Ok(1));
    assert!(Arc::ptr_eq(&group.inner, &clone.inner));
  }
}
