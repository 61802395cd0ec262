//! Trampoline scheduler: time-ordered execution on the calling thread.
//!
//! Not a thread pool: work deferred through a [`TrampolineWorker`] runs on
//! whichever thread called `defer_at`, ordered by time point and, among
//! equal time points, by insertion order.
//!
//! The reentrancy protocol rests on one thread-local cell holding an
//! optional priority queue. The cell being occupied means "a drain loop owns
//! this thread right now":
//!
//! - A call arriving while the cell is empty becomes the drain-loop owner.
//!   It first runs its own task inline (sleeping, executing, and honoring
//!   reschedule requests) for as long as no reentrant call enqueues
//!   anything, so a plain non-reentrant scheduling chain never touches the
//!   heap. It then drains whatever the inline run left behind and finally
//!   empties the cell.
//! - A call arriving while the cell is occupied (the running task scheduled
//!   more work) pushes its item into the queue and returns; the owning
//!   drain loop picks it up after the current item returns. No nested drain
//!   loop is ever entered.
//!
//! The queue is thread-local and never touched across threads, so it needs
//! no lock; its correctness rests entirely on this ownership protocol.

use std::{
  cell::{Cell, RefCell},
  cmp::Ordering,
  collections::BinaryHeap,
};

use super::{sleep_until, Instant, Scheduler, Task, TaskState, Worker};
use crate::subscription::{CompositeSubscription, Subscription};

thread_local! {
  /// Occupied while a drain loop owns this thread.
  static QUEUE: RefCell<Option<BinaryHeap<QueuedItem>>> = const { RefCell::new(None) };
  /// Monotonic per-thread insertion ids, the FIFO tiebreak for items
  /// scheduled at the identical time point.
  static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

struct QueuedItem {
  at: Instant,
  id: u64,
  step: Box<dyn FnMut() -> TaskState>,
  subscription: CompositeSubscription,
}

impl PartialEq for QueuedItem {
  fn eq(&self, other: &Self) -> bool { self.at == other.at && self.id == other.id }
}

impl Eq for QueuedItem {}

impl PartialOrd for QueuedItem {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for QueuedItem {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by insertion id.
    other
      .at
      .cmp(&self.at)
      .then_with(|| other.id.cmp(&self.id))
  }
}

/// Scheduler deferring work to the calling thread, ordered by time.
#[derive(Clone, Copy, Default)]
pub struct TrampolineScheduler;

impl Scheduler for TrampolineScheduler {
  type Worker = TrampolineWorker;

  fn create_worker(&self, subscription: CompositeSubscription) -> TrampolineWorker {
    TrampolineWorker { subscription }
  }
}

/// Worker of the [`TrampolineScheduler`].
#[derive(Clone)]
pub struct TrampolineWorker {
  subscription: CompositeSubscription,
}

impl TrampolineWorker {
  /// Whether a drain loop owns the current thread.
  pub fn is_queue_owned() -> bool { QUEUE.with(|queue| queue.borrow().is_some()) }

  /// The cancellation subscription this worker was created with.
  pub fn subscription(&self) -> CompositeSubscription { self.subscription.clone() }
}

/// Empties the thread-local cell when the owning call exits, even if a task
/// step panics out of the drain loop.
struct ReleaseQueueOnExit;

impl Drop for ReleaseQueueOnExit {
  fn drop(&mut self) { QUEUE.with(|queue| *queue.borrow_mut() = None); }
}

impl Worker for TrampolineWorker {
  fn defer_at<S: Send + 'static>(&self, at: Instant, task: Task<S>) {
    if self.subscription.is_closed() {
      return;
    }

    if Self::is_queue_owned() {
      // Reentrant call: the owning drain loop on this thread serves it.
      let mut task = task;
      enqueue(at, Box::new(move || task.step()), self.subscription.clone());
      return;
    }

    QUEUE.with(|queue| *queue.borrow_mut() = Some(BinaryHeap::new()));
    let _release = ReleaseQueueOnExit;

    if let Some((at, mut task)) = self.run_inline(at, task) {
      // A reentrant call preempted the inline run; from here on the task
      // takes the queue like everything else.
      enqueue(at, Box::new(move || task.step()), self.subscription.clone());
    }
    drain_queue();
  }
}

impl TrampolineWorker {
  /// Run `task` directly while the thread's queue stays empty. Returns the
  /// task and its next time point if a reentrant enqueue preempted it.
  fn run_inline<S>(&self, mut at: Instant, mut task: Task<S>) -> Option<(Instant, Task<S>)> {
    loop {
      if self.subscription.is_closed() {
        return None;
      }
      let preempted =
        QUEUE.with(|queue| queue.borrow().as_ref().is_some_and(|heap| !heap.is_empty()));
      if preempted {
        return Some((at, task));
      }
      sleep_until(at);
      if self.subscription.is_closed() {
        return None;
      }
      match task.step() {
        TaskState::Finished => return None,
        TaskState::Sleeping(delay) => at = (at + delay).max(Instant::now()),
      }
    }
  }
}

fn enqueue(at: Instant, step: Box<dyn FnMut() -> TaskState>, subscription: CompositeSubscription) {
  let id = NEXT_ID.with(|next| {
    let id = next.get();
    next.set(id + 1);
    id
  });
  QUEUE.with(|queue| {
    if let Some(heap) = queue.borrow_mut().as_mut() {
      heap.push(QueuedItem { at, id, step, subscription });
    }
  });
}

fn drain_queue() {
  loop {
    // Pop before executing: running the item may enqueue new items this
    // same loop must also serve. Nothing can slip in ahead of the popped
    // item while we sleep: only this thread touches the queue, and it is
    // sleeping.
    let item = QUEUE.with(|queue| queue.borrow_mut().as_mut().and_then(BinaryHeap::pop));
    let Some(mut item) = item else { return };

    if item.subscription.is_closed() {
      continue;
    }
    sleep_until(item.at);
    if item.subscription.is_closed() {
      continue;
    }
    match (item.step)() {
      TaskState::Finished => {}
      TaskState::Sleeping(delay) => {
        let at = (item.at + delay).max(Instant::now());
        enqueue(at, item.step, item.subscription);
      }
    }
  }
}
