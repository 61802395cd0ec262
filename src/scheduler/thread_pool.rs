//! Pool-backed scheduler honoring the same worker contract as the
//! trampoline, demonstrating that `defer_at` generalizes beyond
//! run-on-the-calling-thread execution.

use futures::{executor::ThreadPool, task::SpawnExt};
use once_cell::sync::Lazy;

use super::{sleep_until, Instant, Scheduler, Task, TaskState, Worker};
use crate::subscription::{CompositeSubscription, Subscription};

static DEFAULT_POOL: Lazy<ThreadPool> =
  Lazy::new(|| ThreadPool::new().expect("build default thread pool failed."));

/// Scheduler running deferred work on a `futures` thread pool.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// A scheduler over its own pool.
  pub fn new(pool: ThreadPool) -> Self { ThreadPoolScheduler { pool } }
}

impl Default for ThreadPoolScheduler {
  /// The process-wide default pool.
  fn default() -> Self { ThreadPoolScheduler { pool: DEFAULT_POOL.clone() } }
}

impl Scheduler for ThreadPoolScheduler {
  type Worker = ThreadPoolWorker;

  fn create_worker(&self, subscription: CompositeSubscription) -> ThreadPoolWorker {
    ThreadPoolWorker { pool: self.pool.clone(), subscription }
  }
}

/// Worker of the [`ThreadPoolScheduler`].
#[derive(Clone)]
pub struct ThreadPoolWorker {
  pool: ThreadPool,
  subscription: CompositeSubscription,
}

impl Worker for ThreadPoolWorker {
  fn defer_at<S: Send + 'static>(&self, at: Instant, task: Task<S>) {
    if self.subscription.is_closed() {
      return;
    }
    let subscription = self.subscription.clone();
    let mut task = task;
    let mut at = at;
    let work = futures::future::lazy(move |_| loop {
      if subscription.is_closed() {
        return;
      }
      sleep_until(at);
      if subscription.is_closed() {
        return;
      }
      match task.step() {
        TaskState::Finished => return,
        TaskState::Sleeping(delay) => at = (at + delay).max(Instant::now()),
      }
    });
    self.pool.spawn(work).expect("spawn task to thread pool failed.");
  }
}
