//! Scheduler abstraction: deferring work to designated time points.
//!
//! A [`Scheduler`] hands out [`Worker`]s tied to a cancellation
//! subscription; a worker's [`defer_at`](Worker::defer_at) runs a [`Task`]
//! no earlier than the given time point. A task's step reports whether it is
//! [`Finished`](TaskState::Finished) or wants to run again after a delay
//! ([`Sleeping`](TaskState::Sleeping)), which is how periodic and retrying
//! work is expressed.
//!
//! Cancellation is cooperative: every blocking wait and every queue-
//! processing step rechecks the worker's subscription, and a cancelled
//! worker's remaining items are dropped without being executed.

pub use std::time::{Duration, Instant};

use crate::subscription::CompositeSubscription;

mod trampoline;
pub use trampoline::{TrampolineScheduler, TrampolineWorker};
#[cfg(feature = "pool-scheduler")]
mod thread_pool;
#[cfg(feature = "pool-scheduler")]
pub use thread_pool::{ThreadPoolScheduler, ThreadPoolWorker};

/// What a task's step reports back to the scheduler that ran it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
  /// The task is done; do not run it again.
  Finished,
  /// Run the task again, no earlier than this long after its scheduled
  /// time point.
  Sleeping(Duration),
}

/// A unit of deferrable work: some state plus a step function over it.
///
/// Keeping the state separate from a plain `fn` pointer lets call sites
/// build tasks from non-capturing closures without boxing:
///
/// ```
/// use rxcore::scheduler::{Task, TaskState};
///
/// let mut task = Task::new(0_u32, |count| {
///   *count += 1;
///   TaskState::Finished
/// });
/// assert_eq!(task.step(), TaskState::Finished);
/// ```
pub struct Task<S> {
  state: S,
  step: fn(&mut S) -> TaskState,
}

impl<S> Task<S> {
  pub fn new(state: S, step: fn(&mut S) -> TaskState) -> Self {
    Task { state, step }
  }

  /// Run one step of the task.
  pub fn step(&mut self) -> TaskState { (self.step)(&mut self.state) }
}

/// Executes tasks at designated time points on behalf of one cancellation
/// scope.
pub trait Worker {
  /// Run `task` no earlier than `at`. A task returning
  /// [`TaskState::Sleeping`] is rescheduled accordingly.
  fn defer_at<S: Send + 'static>(&self, at: Instant, task: Task<S>);

  /// Run `task` after `delay` from now.
  fn defer_after<S: Send + 'static>(&self, delay: Duration, task: Task<S>) {
    self.defer_at(Instant::now() + delay, task);
  }

  /// Run `task` as soon as possible.
  fn defer<S: Send + 'static>(&self, task: Task<S>) {
    self.defer_at(Instant::now(), task);
  }
}

/// A factory of [`Worker`]s.
pub trait Scheduler {
  type Worker: Worker;

  /// Create a worker whose pending work is dropped once `subscription`
  /// closes.
  fn create_worker(&self, subscription: CompositeSubscription) -> Self::Worker;
}

/// Sleep until `at`; returns immediately if the time point has passed.
pub(crate) fn sleep_until(at: Instant) {
  let now = Instant::now();
  if at > now {
    std::thread::sleep(at - now);
  }
}
