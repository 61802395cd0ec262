//! The observer protocol wrapper.
//!
//! [`Subscriber`] wraps a user-supplied reaction (any [`Observer`] impl) with
//! the runtime's emission protocol: disposal awareness, panic redirection,
//! one-shot terminal delivery, and upstream tracking. All observers get
//! wrapped in a `Subscriber` before an observable starts producing into them.
//!
//! The guarantees, independent of how the wrapped reaction behaves:
//!
//! - after `error` or `complete` is delivered once, every further signal is a
//!   no-op; at most one terminal signal ever reaches the reaction;
//! - a panic unwinding out of the `next` reaction is captured and redirected
//!   into exactly one `error` carrying [`FromPanic::from_panic`] of the
//!   payload, and never propagates to the producer;
//! - terminal delivery unsubscribes the subscriber even when the terminal
//!   reaction itself panics (drop-guard);
//! - once the subscriber is closed, `set_upstream` disposes the incoming
//!   subscription immediately, cueing the observable side to stop.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{
  error::FromPanic,
  observer::Observer,
  subscription::{
    CompositeSubscription, SlotSubscription, Subscription,
  },
};

/// Protocol-compliant wrapper around a reaction strategy.
///
/// Where the "closed" state lives is chosen at construction:
/// [`Subscriber::new`] keeps a private [`CompositeSubscription`] (local
/// disposal), [`Subscriber::with_subscription`] aggregates into a
/// caller-supplied one so outside code can cancel the subscriber
/// independently (external disposal).
///
/// A subscriber is expected to be subscribed to exactly one observable in
/// its lifetime; reuse across subscriptions is unsupported.
pub struct Subscriber<O> {
  observer: Option<O>,
  subscription: CompositeSubscription,
  upstream: SlotSubscription,
}

impl<O> Subscriber<O> {
  /// Wrap `observer` with its own fresh subscription.
  pub fn new(observer: O) -> Self {
    Self::with_subscription(observer, CompositeSubscription::new())
  }

  /// Wrap `observer`, aggregating disposal into `subscription`: closing it
  /// from outside closes this subscriber and its tracked upstream.
  pub fn with_subscription(observer: O, subscription: CompositeSubscription) -> Self {
    let upstream = SlotSubscription::new();
    subscription.add(upstream.clone());
    Subscriber { observer: Some(observer), subscription, upstream }
  }

  /// The subscription whose closure silences this subscriber.
  pub fn subscription(&self) -> CompositeSubscription { self.subscription.clone() }

  /// Record `upstream` as the work this subscriber depends on. A later call
  /// supersedes (and unsubscribes) the previous upstream; when the
  /// subscriber is already closed the incoming subscription is unsubscribed
  /// immediately instead of being adopted.
  pub fn set_upstream<S: Subscription + Send + 'static>(&mut self, upstream: S) {
    // The slot was registered into the subscription at construction, so it
    // already reflects external disposal and handles the closed case itself.
    self.upstream.replace(Box::new(upstream));
  }
}

/// Terminal dispatch through `&mut`, used by the `Observer` impl's panic
/// redirection and by the erased emitter the `create` source hands to its
/// production closure. The consuming `Observer` methods are the public
/// protocol.
pub(crate) trait Halt<Item, Err> {
  fn halt_error(&mut self, err: Err);
  fn halt_complete(&mut self);
}

/// Unsubscribes on drop, so terminal delivery disposes the subscriber no
/// matter how the reaction exits.
struct UnsubscribeOnDrop(CompositeSubscription);

impl Drop for UnsubscribeOnDrop {
  fn drop(&mut self) { self.0.unsubscribe() }
}

impl<O, Item, Err> Halt<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
  Err: FromPanic,
{
  fn halt_error(&mut self, err: Err) {
    if Observer::<Item, Err>::is_closed(self) {
      return;
    }
    if let Some(observer) = self.observer.take() {
      let _guard = UnsubscribeOnDrop(self.subscription.clone());
      observer.error(err);
    }
  }

  fn halt_complete(&mut self) {
    if Observer::<Item, Err>::is_closed(self) {
      return;
    }
    if let Some(observer) = self.observer.take() {
      let _guard = UnsubscribeOnDrop(self.subscription.clone());
      observer.complete();
    }
  }
}

impl<O, Item, Err> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
  Err: FromPanic,
{
  fn next(&mut self, value: Item) {
    if Observer::<Item, Err>::is_closed(self) {
      return;
    }
    let result = {
      // is_closed was false, so the observer is present.
      let Some(observer) = self.observer.as_mut() else { return };
      catch_unwind(AssertUnwindSafe(|| observer.next(value)))
    };
    if let Err(payload) = result {
      self.halt_error(Err::from_panic(payload));
    }
  }

  fn error(mut self, err: Err) { self.halt_error(err) }

  fn complete(mut self) { self.halt_complete() }

  fn is_closed(&self) -> bool {
    self.subscription.is_closed()
      || self.observer.as_ref().map_or(true, O::is_closed)
  }
}
