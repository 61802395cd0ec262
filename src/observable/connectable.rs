//! ConnectableObservable: multicasting with an explicit connection lifecycle.
//!
//! A connectable observable decouples production from subscription: it
//! bridges a source observable and a [`Subject`], subscribers listen to the
//! subject, and nothing is produced until [`connect`] subscribes the subject
//! to the source. While a connection is live, further `connect` calls return
//! the same connection handle: there is at most one live production per
//! connectable, and concurrent calls collapse into one. Once that connection
//! is disposed (by any party), a later `connect` starts a fresh generation.
//!
//! [`ref_count`] derives a view that drives the connection automatically:
//! the first subscriber connects, subscribers arriving while the connection
//! lives share it, and the last subscriber's disposal disconnects.
//!
//! [`connect`]: ConnectableObservable::connect
//! [`ref_count`]: ConnectableObservable::ref_count

use std::sync::{Arc, Mutex};

use crate::{
  error::FromPanic,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subject::Subject,
  subscriber::Subscriber,
  subscription::{CompositeSubscription, RefCountSubscription, Subscription},
};

/// An observable whose production starts only when [`connect`] is called.
///
/// [`connect`]: ConnectableObservable::connect
pub struct ConnectableObservable<S, Item, Err> {
  source: S,
  subject: Subject<Item, Err>,
  connection: Arc<Mutex<Option<CompositeSubscription>>>,
}

impl<S, Item, Err> ConnectableObservable<S, Item, Err> {
  pub(crate) fn new(source: S) -> Self {
    ConnectableObservable {
      source,
      subject: Subject::new(),
      connection: Arc::new(Mutex::new(None)),
    }
  }

  /// The subject all subscribers of this connectable listen to.
  pub fn fork(&self) -> Subject<Item, Err> { self.subject.clone() }
}

impl<S, Item, Err> Clone for ConnectableObservable<S, Item, Err>
where
  S: Clone,
{
  fn clone(&self) -> Self {
    ConnectableObservable {
      source: self.source.clone(),
      subject: self.subject.clone(),
      connection: self.connection.clone(),
    }
  }
}

impl<S, Item, Err> ObservableType for ConnectableObservable<S, Item, Err> {
  type Item = Item;
  type Err = Err;
}

// Subscribing a connectable subscribes its subject: no production starts.
impl<S, Item, Err, O> CoreObservable<O> for ConnectableObservable<S, Item, Err>
where
  Subject<Item, Err>: CoreObservable<O>,
{
  fn actual_subscribe(self, subscriber: Subscriber<O>) {
    self.subject.actual_subscribe(subscriber);
  }
}

impl<S, Item, Err> ConnectableObservable<S, Item, Err>
where
  S: CoreObservable<Subject<Item, Err>> + Clone,
  Item: Clone,
  Err: Clone + FromPanic,
{
  /// Start producing into the subject, with a fresh connection subscription.
  /// See [`connect_with`](ConnectableObservable::connect_with).
  pub fn connect(&self) -> CompositeSubscription {
    self.connect_with(CompositeSubscription::new())
  }

  /// Start producing into the subject, adopting `connection` as the
  /// connection subscription.
  ///
  /// Returns the live connection handle: the adopted one if this call
  /// connected, the existing one if a connection was already live, or a
  /// closed handle if the subject has already terminated (nothing to
  /// produce into). Disposing the returned handle tears the production
  /// down and permits a new `connect` cycle.
  pub fn connect_with(&self, connection: CompositeSubscription) -> CompositeSubscription {
    {
      let mut current = self.connection.lock().unwrap();
      if self.subject.subscription().is_closed() {
        return CompositeSubscription::closed();
      }
      if let Some(live) = current.as_ref() {
        if !live.is_closed() {
          return live.clone();
        }
      }
      *current = Some(connection.clone());
    }
    // The lock is released before subscribing: the source's production is
    // arbitrary user code and may itself call back into this connectable.
    let subscriber = Subscriber::with_subscription(self.subject.clone(), connection.clone());
    self.source.clone().actual_subscribe(subscriber);
    connection
  }

  /// An observable that connects when its first subscriber arrives and
  /// disconnects when the last one unsubscribes.
  pub fn ref_count(&self) -> RefCountObservable<S, Item, Err> {
    RefCountObservable {
      connectable: self.clone(),
      shared: Arc::new(Mutex::new(None)),
    }
  }
}

/// Auto-connecting view over a [`ConnectableObservable`], produced by
/// [`ref_count`](ConnectableObservable::ref_count).
pub struct RefCountObservable<S, Item, Err> {
  connectable: ConnectableObservable<S, Item, Err>,
  shared: Arc<Mutex<Option<RefCountSubscription>>>,
}

impl<S, Item, Err> Clone for RefCountObservable<S, Item, Err>
where
  S: Clone,
{
  fn clone(&self) -> Self {
    RefCountObservable {
      connectable: self.connectable.clone(),
      shared: self.shared.clone(),
    }
  }
}

impl<S, Item, Err> ObservableType for RefCountObservable<S, Item, Err> {
  type Item = Item;
  type Err = Err;
}

impl<S, Item, Err, O> CoreObservable<O> for RefCountObservable<S, Item, Err>
where
  S: CoreObservable<Subject<Item, Err>> + Clone,
  O: Observer<Item, Err> + Send + 'static,
  Item: Clone + 'static,
  Err: Clone + FromPanic + 'static,
{
  fn actual_subscribe(self, mut subscriber: Subscriber<O>) {
    let (handle, fresh_connection) = {
      let mut shared = self.shared.lock().unwrap();
      match shared.as_ref() {
        Some(live) if !live.is_closed() => (live.add_ref(), None),
        _ => {
          let generation = RefCountSubscription::new(CompositeSubscription::new());
          let handle = generation.add_ref();
          let connection = generation.underlying();
          *shared = Some(generation);
          (handle, Some(connection))
        }
      }
    };
    // The upstream handle is installed before subscribing into the subject
    // and before connecting, so a disposal racing with connection
    // establishment is still observed.
    subscriber.set_upstream(handle);
    self.connectable.subject.clone().actual_subscribe(subscriber);
    if let Some(connection) = fresh_connection {
      self.connectable.connect_with(connection);
    }
  }
}
