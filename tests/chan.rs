//! Channel-path (non-blocking) semantics.

use singleflight::Group;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn delivers_exactly_one_outcome_then_disconnects() {
  let group: Group<&str, u64, String> = Group::new();

  let rx = group.execute_chan("key", || Ok(9));

  let outcome = rx.recv().unwrap();
  assert_eq!(outcome.result, Ok(9));
  assert!(!outcome.shared);

  // The channel is single-use: after the one delivery it is terminal.
  assert!(rx.recv().is_err());
}

#[test]
fn chan_callers_share_one_execution() {
  let group: Group<String, u64, String> = Group::new();
  let executions = Arc::new(AtomicUsize::new(0));
  let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

  let mut receivers = Vec::new();
  for _ in 0..3 {
    let executions = executions.clone();
    let release_rx = release_rx.clone();
    receivers.push(group.execute_chan("hot".to_string(), move || {
      executions.fetch_add(1, Ordering::SeqCst);
      release_rx.recv().unwrap();
      Ok(5)
    }));
  }

  // All three calls returned immediately; the executor is still parked
  // inside the work function. Release it and collect.
  release_tx.send(()).unwrap();

  for rx in receivers {
    let outcome = rx.recv().unwrap();
    assert_eq!(outcome.result, Ok(5));
    assert!(outcome.shared);
  }
  assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[test]
fn blocking_and_chan_callers_coalesce() {
  let group: Group<&str, u64, String> = Group::new();
  let executions = Arc::new(AtomicUsize::new(0));
  let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

  let rx = {
    let executions = executions.clone();
    group.execute_chan("mixed", move || {
      executions.fetch_add(1, Ordering::SeqCst);
      release_rx.recv().unwrap();
      Ok(11)
    })
  };

  let blocking = {
    let group = group.clone();
    std::thread::spawn(move || group.execute("mixed", || Ok(99)))
  };

  // Let the blocking caller attach to the in-flight chan call.
  std::thread::sleep(Duration::from_millis(200));
  release_tx.send(()).unwrap();

  let blocked_outcome = blocking.join().unwrap();
  assert_eq!(blocked_outcome.result, Ok(11), "joined the chan execution");
  assert!(blocked_outcome.shared);

  let chan_outcome = rx.recv().unwrap();
  assert_eq!(chan_outcome.result, Ok(11));
  assert!(chan_outcome.shared);

  assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[test]
fn dropped_receiver_does_not_affect_others() {
  let group: Group<&str, u64, String> = Group::new();
  let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

  let rx_kept = {
    let release_rx = release_rx.clone();
    group.execute_chan("key", move || {
      release_rx.recv().unwrap();
      Ok(1)
    })
  };
  let rx_dropped = group.execute_chan("key", || Ok(0));
  drop(rx_dropped);

  release_tx.send(()).unwrap();

  let outcome = rx_kept.recv().unwrap();
  assert_eq!(outcome.result, Ok(1));
  assert!(outcome.shared);
}

#[test]
fn error_outcomes_reach_every_receiver() {
  let group: Group<&str, u64, String> = Group::new();
  let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

  let rx1 = {
    let release_rx = release_rx.clone();
    group.execute_chan("fail", move || {
      release_rx.recv().unwrap();
      Err("remote down".to_string())
    })
  };
  let rx2 = group.execute_chan("fail", || Ok(0));

  release_tx.send(()).unwrap();

  for rx in [rx1, rx2] {
    let outcome = rx.recv().unwrap();
    assert_eq!(outcome.result, Err("remote down".to_string()));
    assert!(outcome.shared);
  }
}

#[test]
fn executor_panic_disconnects_subscribers() {
  let group: Group<&str, u64, String> = Group::new();

  let rx = group.execute_chan("boom", || panic!("chan executor failed"));

  // No outcome is published; the disconnect is the observable failure,
  // so a waiter never hangs on a faulted execution.
  assert!(rx.recv().is_err());

  // The key recovers afterwards.
  let rx = group.execute_chan("boom", || Ok(1));
  assert_eq!(rx.recv().unwrap().result, Ok(1));
}

#[test]
fn receiver_supports_bounded_wait() {
  let group: Group<&str, u64, String> = Group::new();
  let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

  let rx = group.execute_chan("slow", move || {
    release_rx.recv().unwrap();
    Ok(1)
  });

  // A caller that wants a deadline races the receiver against its own
  // timer; the group itself never enforces timeouts.
  assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

  release_tx.send(()).unwrap();
  assert_eq!(rx.recv().unwrap().result, Ok(1));
}
