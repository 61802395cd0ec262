//! End-to-end tests of the runtime's core guarantees: the emission
//! protocol's one-terminal rule, subscription teardown, multicast
//! connection sharing, lift type-threading, and trampoline ordering.

use rxcore::prelude::*;
use std::{
  convert::Infallible,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier, Mutex,
  },
  thread,
};

/// Observer recording every signal it receives.
#[derive(Clone, Default)]
struct Record {
  next: Arc<Mutex<Vec<i32>>>,
  errors: Arc<Mutex<Vec<String>>>,
  completed: Arc<AtomicUsize>,
}

struct Recording(Record);

impl Observer<i32, String> for Recording {
  fn next(&mut self, value: i32) {
    if value == 5 {
      panic!("cannot take five");
    }
    self.0.next.lock().unwrap().push(value);
  }

  fn error(self, err: String) { self.0.errors.lock().unwrap().push(err); }

  fn complete(self) { self.0.completed.fetch_add(1, Ordering::SeqCst); }

  fn is_closed(&self) -> bool { false }
}

#[test]
fn at_most_one_terminal_signal() {
  let record = Record::default();

  create(|emitter: &mut dyn Emitter<i32, String>| {
    emitter.next(1);
    emitter.complete();
    // Everything after the terminal signal must be silently absorbed.
    emitter.next(2);
    emitter.error("late".to_owned());
    emitter.complete();
  })
  .subscribe_with(Recording(record.clone()));

  assert_eq!(*record.next.lock().unwrap(), vec![1]);
  assert!(record.errors.lock().unwrap().is_empty());
  assert_eq!(record.completed.load(Ordering::SeqCst), 1);
}

#[test]
fn dispose_is_idempotent_and_children_torn_down_once() {
  let torn_down = Arc::new(AtomicUsize::new(0));
  let parent = CompositeSubscription::new();
  let c_torn_down = torn_down.clone();
  parent.add(ClosureSubscription::new(move || {
    c_torn_down.fetch_add(1, Ordering::SeqCst);
  }));

  for _ in 0..4 {
    parent.clone().unsubscribe();
  }

  assert!(parent.is_closed());
  assert_eq!(torn_down.load(Ordering::SeqCst), 1);
}

#[test]
fn exception_redirected_into_exactly_one_error() {
  let record = Record::default();

  create(|emitter: &mut dyn Emitter<i32, String>| {
    emitter.next(1);
    emitter.next(5);
    // The panic above was redirected into `error`; nothing below lands.
    emitter.next(2);
    emitter.complete();
  })
  .subscribe_with(Recording(record.clone()));

  assert_eq!(*record.next.lock().unwrap(), vec![1]);
  assert_eq!(
    *record.errors.lock().unwrap(),
    vec!["cannot take five".to_owned()]
  );
  assert_eq!(record.completed.load(Ordering::SeqCst), 0);
}

// A probe operator: forwards untouched while logging what flows through the
// observer `lift` derived for the source.
struct ProbeOp {
  log: Arc<Mutex<Vec<String>>>,
}

struct ProbeObserver<D> {
  downstream: D,
  log: Arc<Mutex<Vec<String>>>,
}

impl<D> Operator<D> for ProbeOp {
  type Output = ProbeObserver<D>;

  fn apply(self, downstream: D) -> Self::Output {
    ProbeObserver { downstream, log: self.log }
  }
}

impl<D, Err> Observer<i32, Err> for ProbeObserver<D>
where
  D: Observer<i32, Err>,
{
  fn next(&mut self, value: i32) {
    self.log.lock().unwrap().push(format!("next({value})"));
    self.downstream.next(value);
  }

  fn error(self, err: Err) {
    self.log.lock().unwrap().push("error".to_owned());
    self.downstream.error(err);
  }

  fn complete(self) {
    self.log.lock().unwrap().push("complete".to_owned());
    self.downstream.complete();
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[test]
fn lift_threads_the_probe_observer_between_source_and_downstream() {
  let log = Arc::new(Mutex::new(vec![]));
  let seen = Arc::new(Mutex::new(vec![]));
  let c_seen = seen.clone();

  from_iter(vec![1, 2])
    .lift(ProbeOp { log: log.clone() })
    .subscribe(move |v: i32| c_seen.lock().unwrap().push(v));

  // The probe's observer received exactly the upstream emissions, in order,
  // and reproduced them downstream.
  assert_eq!(
    *log.lock().unwrap(),
    vec!["next(1)".to_owned(), "next(2)".to_owned(), "complete".to_owned()]
  );
  assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn ref_count_subscribes_source_exactly_once_while_subscribers_remain() {
  let subscribe_count = Arc::new(AtomicUsize::new(0));
  let c_count = subscribe_count.clone();

  // Never-completing source, so the connection lives until disconnected.
  let source = create(move |_emitter: &mut dyn Emitter<i32, Infallible>| {
    c_count.fetch_add(1, Ordering::SeqCst);
  });
  let shared = source.multicast().ref_count();

  assert_eq!(subscribe_count.load(Ordering::SeqCst), 0);

  let mut subscriptions: Vec<_> = (0..4)
    .map(|_| shared.clone().subscribe(|_: i32| {}))
    .collect();
  assert_eq!(subscribe_count.load(Ordering::SeqCst), 1);

  while let Some(mut subscription) = subscriptions.pop() {
    subscription.unsubscribe();
  }

  // A new subscriber after the last disposal starts a fresh connection.
  let _again = shared.clone().subscribe(|_: i32| {});
  assert_eq!(subscribe_count.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_connects_collapse_into_one() {
  for _ in 0..20 {
    let subscribe_count = Arc::new(AtomicUsize::new(0));
    let c_count = subscribe_count.clone();

    let source = create(move |_emitter: &mut dyn Emitter<i32, Infallible>| {
      c_count.fetch_add(1, Ordering::SeqCst);
    });
    let connectable = Arc::new(source.multicast());

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
      .map(|_| {
        let connectable = connectable.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
          barrier.wait();
          connectable.connect()
        })
      })
      .collect();

    let connections: Vec<CompositeSubscription> =
      handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Exactly one subscription into the source, and both callers hold the
    // same live connection.
    assert_eq!(subscribe_count.load(Ordering::SeqCst), 1);
    connections[0].clone().unsubscribe();
    assert!(connections[1].is_closed());
  }
}

#[test]
fn cancelled_pipeline_just_stops() {
  // Closing the shared handle from inside the reaction stops an endless
  // source: no error, no completion, the stream simply ceases.
  let seen = Arc::new(Mutex::new(vec![]));
  let c_seen = seen.clone();

  let handle = CompositeSubscription::new();
  let c_handle = handle.clone();
  let subscriber = Subscriber::with_subscription(
    FnMutObserver(move |v: i32| {
      c_seen.lock().unwrap().push(v);
      if v == 3 {
        c_handle.clone().unsubscribe();
      }
    }),
    handle.clone(),
  );
  from_iter(1..).actual_subscribe(subscriber);

  assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
  assert!(handle.is_closed());

  // A subscriber born cancelled receives nothing at all.
  let seen2 = Arc::new(Mutex::new(Vec::<i32>::new()));
  let c_seen2 = seen2.clone();
  from_iter(vec![1, 2, 3]).actual_subscribe(Subscriber::with_subscription(
    FnMutObserver(move |v: i32| c_seen2.lock().unwrap().push(v)),
    CompositeSubscription::closed(),
  ));
  assert!(seen2.lock().unwrap().is_empty());
}

#[test]
fn trampoline_orders_by_time_then_insertion() {
  let log = Arc::new(Mutex::new(vec![]));
  let worker = TrampolineScheduler.create_worker(CompositeSubscription::new());

  let state = (worker.clone(), log.clone());
  worker.defer(Task::new(state, |(worker, log)| {
    let base = Instant::now();
    for (delay_ms, label) in [(30, "t+30"), (10, "t+10"), (20, "t+20")] {
      worker.defer_at(
        base + Duration::from_millis(delay_ms),
        Task::new((log.clone(), label), |(log, label)| {
          log.lock().unwrap().push(*label);
          TaskState::Finished
        }),
      );
    }
    // Two items at the identical time point keep insertion order.
    let same = base + Duration::from_millis(40);
    for label in ["first", "second"] {
      worker.defer_at(
        same,
        Task::new((log.clone(), label), |(log, label)| {
          log.lock().unwrap().push(*label);
          TaskState::Finished
        }),
      );
    }
    TaskState::Finished
  }));

  assert_eq!(
    *log.lock().unwrap(),
    vec!["t+10", "t+20", "t+30", "first", "second"]
  );
}

#[test]
fn trampoline_reentrant_defer_waits_for_current_item() {
  let log = Arc::new(Mutex::new(vec![]));
  let worker = TrampolineScheduler.create_worker(CompositeSubscription::new());

  let state = (worker.clone(), log.clone());
  worker.defer(Task::new(state, |(worker, log)| {
    log.lock().unwrap().push("outer:start");
    worker.defer(Task::new(log.clone(), |log| {
      log.lock().unwrap().push("inner");
      TaskState::Finished
    }));
    // The inner item scheduled for "now" must not run through a nested
    // drain loop; it runs after this step returns.
    log.lock().unwrap().push("outer:end");
    TaskState::Finished
  }));

  assert_eq!(
    *log.lock().unwrap(),
    vec!["outer:start", "outer:end", "inner"]
  );
}

#[test]
fn pipeline_over_trampoline_delivers_in_order() {
  // A source that defers each emission through the trampoline: emissions
  // still arrive in order, and the subscription handle cancels them.
  let seen = Arc::new(Mutex::new(vec![]));
  let c_seen = seen.clone();

  let subscription = CompositeSubscription::new();
  let worker = TrampolineScheduler.create_worker(subscription.clone());

  let source = create(move |emitter: &mut dyn Emitter<i32, Infallible>| {
    emitter.next(0);
  });
  source.subscribe(move |v| c_seen.lock().unwrap().push(v));

  for v in [1, 2, 3] {
    let c = seen.clone();
    worker.defer(Task::new((c, v), |(seen, v)| {
      seen.lock().unwrap().push(*v);
      TaskState::Finished
    }));
  }

  assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
}
