//! Subject: a broadcast relay that is both observer and observable.
//!
//! A subject's observer half fans every signal out to the subscribers
//! registered through its observable half. It keeps no buffer: subscribers
//! receive only what is emitted while they are subscribed, and a subscriber
//! arriving after the subject terminated is closed immediately. The
//! subject's own liveness is exposed as a subscription
//! ([`Subject::subscription`]), closed once a terminal signal has been
//! relayed.
//!
//! Emissions are not re-entrant: calling `next`/`error`/`complete` on a
//! subject from inside one of that subject's own callbacks panics with a
//! clear message rather than deadlocking on the subscriber list.

use smallvec::SmallVec;
use std::sync::{Arc, Mutex, TryLockError};

use crate::{
  error::FromPanic,
  observable::{CoreObservable, ObservableType},
  observer::{BoxedObserver, Observer},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, Subscription},
};

struct Subscribers<Item, Err> {
  next_id: usize,
  list: SmallVec<[(usize, BoxedObserver<Item, Err>); 2]>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Subscribers { next_id: 0, list: SmallVec::new() } }
}

/// A hot broadcast relay multicasting values to many observers.
pub struct Subject<Item, Err> {
  subscribers: Arc<Mutex<Subscribers<Item, Err>>>,
  subscription: CompositeSubscription,
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Subscription reflecting this subject's liveness; closed once the
  /// subject has relayed a terminal signal (or was cancelled from outside).
  pub fn subscription(&self) -> CompositeSubscription { self.subscription.clone() }

  /// Number of currently registered subscribers.
  pub fn subscriber_count(&self) -> usize {
    self.subscribers.lock().unwrap().list.len()
  }

  fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Subscribers<Item, Err>> {
    match self.subscribers.try_lock() {
      Ok(guard) => guard,
      Err(TryLockError::WouldBlock) => panic!(
        "re-entrant Subject access: the subscriber list is locked by an \
         in-progress broadcast on this thread"
      ),
      Err(TryLockError::Poisoned(e)) => panic!("subject subscriber list poisoned: {e}"),
    }
  }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self {
    Subject {
      subscribers: Arc::new(Mutex::new(Subscribers::default())),
      subscription: CompositeSubscription::new(),
    }
  }
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self {
    Subject {
      subscribers: self.subscribers.clone(),
      subscription: self.subscription.clone(),
    }
  }
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    if self.subscription.is_closed() {
      return;
    }
    let mut subscribers = self.lock_subscribers();
    subscribers.list.retain(|(_, observer)| {
      observer.next(value.clone());
      !observer.is_closed()
    });
  }

  fn error(self, err: Err) {
    if self.subscription.is_closed() {
      return;
    }
    let drained = std::mem::take(&mut self.lock_subscribers().list);
    self.subscription.clone().unsubscribe();
    // Callbacks run after the list lock is released.
    for (_, observer) in drained {
      observer.error(err.clone());
    }
  }

  fn complete(self) {
    if self.subscription.is_closed() {
      return;
    }
    let drained = std::mem::take(&mut self.lock_subscribers().list);
    self.subscription.clone().unsubscribe();
    for (_, observer) in drained {
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}

impl<Item, Err> ObservableType for Subject<Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<Item, Err, O> CoreObservable<O> for Subject<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: FromPanic + 'static,
{
  fn actual_subscribe(self, subscriber: Subscriber<O>) {
    if self.subscription.is_closed() {
      // Terminated subject: nothing will ever be produced.
      subscriber.subscription().unsubscribe();
      return;
    }
    if subscriber.is_closed() {
      return;
    }
    // The removal token is attached to the subscriber's subscription, not
    // its upstream slot: the slot tracks upstream *production* handles and
    // replacing its content disposes the previous one, which must not
    // happen to an auto-connect handle installed before subscribing.
    let mut subscribers = self.lock_subscribers();
    let id = subscribers.next_id;
    subscribers.next_id += 1;
    subscriber.subscription().add(SubjectSubscription {
      subscribers: self.subscribers.clone(),
      id,
      removed: false,
    });
    subscribers.list.push((id, Box::new(subscriber)));
  }
}

/// Removes one subscriber from its subject when unsubscribed.
struct SubjectSubscription<Item, Err> {
  subscribers: Arc<Mutex<Subscribers<Item, Err>>>,
  id: usize,
  removed: bool,
}

impl<Item, Err> Subscription for SubjectSubscription<Item, Err> {
  fn unsubscribe(&mut self) {
    if self.removed {
      return;
    }
    self.removed = true;
    // During a broadcast the list is locked by the emitting thread; in that
    // case removal happens lazily: the broadcast's retain pass drops
    // observers that report themselves closed, which this one now does.
    if let Ok(mut subscribers) = self.subscribers.try_lock() {
      subscribers.list.retain(|(id, _)| *id != self.id);
    }
  }

  fn is_closed(&self) -> bool { self.removed }
}
