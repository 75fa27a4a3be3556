use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};

/// The result of one coalesced execution, as observed by a single caller.
///
/// `result` is whatever the work function produced, passed through verbatim.
/// `shared` reports whether the execution had more than one participant:
/// it is `false` only when the caller that triggered the execution was still
/// the sole participant at the moment the result was recorded.
#[derive(Debug, Clone)]
pub struct Outcome<V, E> {
  pub result: Result<V, E>,
  pub shared: bool,
}

/// State of an in-flight call, written exactly once by the executing thread.
pub(crate) enum CallState<V, E> {
  /// The work function has not completed yet.
  Running,
  /// The work function returned. `shared` is computed from the joiner count
  /// at the moment of completion and reported identically to every caller.
  Done { result: Result<V, E>, shared: bool },
  /// The work function panicked. Blocking waiters re-raise with this
  /// message in their own calling context.
  Poisoned { message: Arc<str> },
}

pub(crate) struct CallInner<V, E> {
  pub state: CallState<V, E>,
  /// One private capacity-1 sender per channel caller. Drained at
  /// completion; dropped without a send if the executor panicked.
  pub subscribers: Vec<Sender<Outcome<V, E>>>,
}

/// The shared execution state for one key, from creation to completion.
///
/// At most one `Call` is live per key per group at any instant. Only the
/// thread running the work function ever writes `state`; everyone else
/// either waits on `done` or subscribes a channel sender.
pub(crate) struct Call<V, E> {
  pub inner: Mutex<CallInner<V, E>>,
  /// Signalled exactly once, when `state` leaves `Running`.
  pub done: Condvar,
  /// Number of callers that attached after creation. Incremented under the
  /// group's map lock; read once, at completion, to compute `shared`.
  pub joiners: AtomicUsize,
}

impl<V, E> Call<V, E> {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(CallInner {
        state: CallState::Running,
        subscribers: Vec::new(),
      }),
      done: Condvar::new(),
      joiners: AtomicUsize::new(0),
    }
  }
}

impl<V: Clone, E: Clone> Call<V, E> {
  /// Blocks until the call completes and returns the recorded outcome.
  ///
  /// # Panics
  ///
  /// Re-raises if the work function panicked, so an attached caller fails
  /// the same way the triggering caller did instead of hanging.
  pub(crate) fn wait(&self) -> Outcome<V, E> {
    let mut inner = self.inner.lock();
    loop {
      match &inner.state {
        CallState::Running => {}
        CallState::Done { result, shared } => {
          return Outcome {
            result: result.clone(),
            shared: *shared,
          };
        }
        CallState::Poisoned { message } => {
          let message = message.clone();
          drop(inner);
          panic!("singleflight: work function panicked: {}", message);
        }
      }
      self.done.wait(&mut inner);
    }
  }
}
