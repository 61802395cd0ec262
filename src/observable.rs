//! Observable protocol and the `lift` operator-chaining primitive.
//!
//! An observable is a copy-cheap *description* of how to produce a stream; a
//! running computation begins only at subscribe time. The production logic,
//! the subscription strategy, lives in [`CoreObservable::actual_subscribe`],
//! which receives the protocol-wrapped observer and is expected to call
//! `set_upstream` on it before or while starting production.
//!
//! [`Observable::lift`] is the sole mechanism for building operator chains:
//! it maps the downstream observer into the observer handed to the source,
//! preserving the disposal relationship, with every type mismatch rejected at
//! compile time.

use std::{convert::Infallible, marker::PhantomData};

use crate::{
  observer::{FnMutObserver, Observer},
  subscriber::Subscriber,
  subscription::{CompositeSubscription, SubscriptionWrapper},
};

mod connectable;
mod create;
mod from_iter;
pub use connectable::{ConnectableObservable, RefCountObservable};
pub use create::{create, Create};
pub use from_iter::{from_iter, FromIter};

/// Element and error types of an observable.
pub trait ObservableType {
  type Item;
  type Err;
}

/// The subscription strategy: how this observable starts producing for one
/// concrete observer type.
///
/// Parameterizing the trait by the observer keeps the whole chain statically
/// typed: an operator stack is a stack of `CoreObservable` impls, with no
/// downcasting anywhere. Strategies are free to run synchronously
/// (pull-to-push conversion) or defer production onto a scheduler.
pub trait CoreObservable<O>: ObservableType {
  fn actual_subscribe(self, subscriber: Subscriber<O>);
}

/// User-facing observable operations, blanket-implemented for every
/// [`ObservableType`].
pub trait Observable: ObservableType + Sized {
  /// Subscribe with a full observer. Returns the handle that cancels the
  /// subscription.
  fn subscribe_with<O>(self, observer: O) -> SubscriptionWrapper<CompositeSubscription>
  where
    Self: CoreObservable<O>,
    O: Observer<Self::Item, Self::Err>,
  {
    let subscriber = Subscriber::new(observer);
    let subscription = subscriber.subscription();
    self.actual_subscribe(subscriber);
    SubscriptionWrapper(subscription)
  }

  /// Subscribe with a closure receiving each value. Only available on
  /// streams that cannot error.
  fn subscribe<F>(self, next: F) -> SubscriptionWrapper<CompositeSubscription>
  where
    F: FnMut(Self::Item),
    Self: CoreObservable<FnMutObserver<F>> + ObservableType<Err = Infallible>,
  {
    self.subscribe_with(FnMutObserver(next))
  }

  /// Build a derived observable over `NewItem` from an observer-to-observer
  /// mapping.
  ///
  /// When the result is subscribed with a downstream observer of `NewItem`,
  /// `op` maps it into an observer of this observable's item type, and this
  /// observable is subscribed with that derived observer, which shares the
  /// downstream subscription, so disposal still reaches the downstream
  /// observer. An `op` whose output is not an observer of exactly this
  /// observable's item/error types fails to compile.
  fn lift<NewItem, Op>(self, op: Op) -> Lift<Self, Op, NewItem> {
    Lift { source: self, op, _marker: PhantomData }
  }

  /// Multicast this observable through a fresh subject: production does not
  /// start until [`ConnectableObservable::connect`] is called, and all
  /// subscribers share the single connection.
  fn multicast(self) -> ConnectableObservable<Self, Self::Item, Self::Err> {
    ConnectableObservable::new(self)
  }

  /// Alias for [`multicast`](Observable::multicast), after the publish
  /// operator this corresponds to.
  fn publish(self) -> ConnectableObservable<Self, Self::Item, Self::Err> {
    self.multicast()
  }
}

impl<T: ObservableType + Sized> Observable for T {}

/// Maps a downstream observer into the observer handed to the source.
///
/// Implementors are the "operator functions" of `lift`: given the downstream
/// (wrapped) observer, produce the observer the source will emit into.
pub trait Operator<Down> {
  type Output;
  fn apply(self, downstream: Down) -> Self::Output;
}

/// Observable produced by [`Observable::lift`].
#[derive(Clone)]
pub struct Lift<S, Op, Item> {
  source: S,
  op: Op,
  _marker: PhantomData<Item>,
}

impl<S: ObservableType, Op, Item> ObservableType for Lift<S, Op, Item> {
  type Item = Item;
  type Err = S::Err;
}

impl<S, Op, Item, O> CoreObservable<O> for Lift<S, Op, Item>
where
  S: CoreObservable<Op::Output>,
  Op: Operator<Subscriber<O>>,
{
  fn actual_subscribe(self, subscriber: Subscriber<O>) {
    let subscription = subscriber.subscription();
    let derived = self.op.apply(subscriber);
    self
      .source
      .actual_subscribe(Subscriber::with_subscription(derived, subscription));
  }
}
