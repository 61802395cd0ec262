//! Subscription graph: cancellation and resource-lifetime tokens.
//!
//! A [`Subscription`] represents work that can be cancelled. Subscriptions
//! compose: a [`CompositeSubscription`] owns child subscriptions and tears
//! them down with itself, a [`SlotSubscription`] holds at most one upstream
//! subscription and disposes the superseded one on replacement, and a
//! [`RefCountSubscription`] shares one underlying subscription between many
//! holders, releasing it only when the last holder lets go.
//!
//! Unsubscribing is always idempotent: a closed subscription never becomes
//! active again, and every child is torn down exactly once no matter how many
//! handles request it.

use smallvec::SmallVec;
use std::{
  fmt::{Debug, Formatter},
  sync::{Arc, Mutex},
};

/// Handle to cancel an in-flight piece of work.
pub trait Subscription {
  /// Cancel the work this subscription stands for. Idempotent: calling it
  /// again after the first time has no further effect.
  fn unsubscribe(&mut self);

  /// Whether this subscription has already been cancelled.
  fn is_closed(&self) -> bool;
}

/// Type-erased subscription, the form stored inside composites and slots.
pub type BoxSubscription = Box<dyn Subscription + Send>;

/// The empty subscription: nothing to release, closed by convention.
impl Subscription for () {
  #[inline]
  fn unsubscribe(&mut self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<T: Subscription + ?Sized> Subscription for Box<T> {
  #[inline]
  fn unsubscribe(&mut self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

struct Inner {
  closed: bool,
  teardown: SmallVec<[BoxSubscription; 1]>,
}

impl Default for Inner {
  fn default() -> Self { Inner { closed: false, teardown: SmallVec::new() } }
}

/// A cloneable subscription owning any number of children.
///
/// Every clone is a handle to the same underlying state; whichever handle
/// unsubscribes first closes them all. Children added after the composite is
/// closed are unsubscribed immediately instead of being retained.
#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<Mutex<Inner>>);

impl CompositeSubscription {
  pub fn new() -> Self { Self::default() }

  /// An already-closed composite, used where an "empty" handle is expected.
  pub fn closed() -> Self {
    let mut subscription = Self::new();
    subscription.unsubscribe();
    subscription
  }

  /// Attach `subscription` so it is unsubscribed together with this
  /// composite. If the composite is already closed the child is unsubscribed
  /// right away. Children that have closed on their own are dropped on the
  /// next `add`.
  pub fn add<S: Subscription + Send + 'static>(&self, subscription: S) {
    let mut child: BoxSubscription = Box::new(subscription);
    {
      let mut inner = self.0.lock().unwrap();
      if !inner.closed {
        inner.teardown.retain(|c| !c.is_closed());
        inner.teardown.push(child);
        return;
      }
    }
    // Closed parent: dispose outside the lock, the child may run user code.
    child.unsubscribe();
  }

  /// Number of children currently retained.
  pub fn teardown_size(&self) -> usize { self.0.lock().unwrap().teardown.len() }
}

impl Subscription for CompositeSubscription {
  fn unsubscribe(&mut self) {
    let children = {
      let mut inner = self.0.lock().unwrap();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    // Children run outside the lock; a child that re-enters this composite
    // only observes the closed flag.
    for mut child in children {
      child.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.lock().unwrap().closed }
}

impl Debug for CompositeSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.0.lock().unwrap();
    f.debug_struct("CompositeSubscription")
      .field("closed", &inner.closed)
      .field("teardown_size", &inner.teardown.len())
      .finish()
  }
}

#[derive(Default)]
struct Slot {
  closed: bool,
  current: Option<BoxSubscription>,
}

/// Holds at most one upstream subscription.
///
/// Replacing the content unsubscribes the superseded subscription, and a
/// subscription stored into a closed slot is unsubscribed immediately. This
/// is the building block observers use to track "the upstream work I depend
/// on".
#[derive(Clone, Default)]
pub struct SlotSubscription(Arc<Mutex<Slot>>);

impl SlotSubscription {
  pub fn new() -> Self { Self::default() }

  /// Store `subscription`, unsubscribing whatever was stored before. When the
  /// slot is already closed the incoming subscription is unsubscribed instead
  /// of being adopted.
  pub fn replace(&self, subscription: BoxSubscription) {
    let mut superseded = {
      let mut slot = self.0.lock().unwrap();
      if slot.closed {
        Some(subscription)
      } else {
        slot.current.replace(subscription)
      }
    };
    if let Some(old) = superseded.as_mut() {
      old.unsubscribe();
    }
  }
}

impl Subscription for SlotSubscription {
  fn unsubscribe(&mut self) {
    let current = {
      let mut slot = self.0.lock().unwrap();
      if slot.closed {
        return;
      }
      slot.closed = true;
      slot.current.take()
    };
    if let Some(mut current) = current {
      current.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.lock().unwrap().closed }
}

struct RefCountState {
  holders: usize,
  underlying: CompositeSubscription,
}

/// Shares one underlying [`CompositeSubscription`] between many holders.
///
/// [`add_ref`](RefCountSubscription::add_ref) issues a [`RefCountHandle`] per
/// holder; the underlying subscription is unsubscribed exactly once, when the
/// last issued handle is released. Unsubscribing the `RefCountSubscription`
/// itself tears the underlying subscription down regardless of outstanding
/// holders.
#[derive(Clone)]
pub struct RefCountSubscription(Arc<Mutex<RefCountState>>);

impl RefCountSubscription {
  pub fn new(underlying: CompositeSubscription) -> Self {
    Self(Arc::new(Mutex::new(RefCountState { holders: 0, underlying })))
  }

  /// The shared underlying subscription.
  pub fn underlying(&self) -> CompositeSubscription {
    self.0.lock().unwrap().underlying.clone()
  }

  /// Register another holder and hand it its release handle.
  pub fn add_ref(&self) -> RefCountHandle {
    let mut state = self.0.lock().unwrap();
    state.holders += 1;
    RefCountHandle { state: self.0.clone(), released: false }
  }
}

impl Subscription for RefCountSubscription {
  fn unsubscribe(&mut self) {
    let mut underlying = self.underlying();
    underlying.unsubscribe();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.lock().unwrap().underlying.is_closed() }
}

/// One holder's handle to a [`RefCountSubscription`].
///
/// Releasing is idempotent per handle; the underlying subscription closes
/// when the holder count returns to zero.
pub struct RefCountHandle {
  state: Arc<Mutex<RefCountState>>,
  released: bool,
}

impl Subscription for RefCountHandle {
  fn unsubscribe(&mut self) {
    if self.released {
      return;
    }
    self.released = true;
    let last = {
      let mut state = self.state.lock().unwrap();
      state.holders -= 1;
      (state.holders == 0).then(|| state.underlying.clone())
    };
    // The underlying teardown may run user code, so it happens outside the
    // holder-accounting lock.
    if let Some(mut underlying) = last {
      underlying.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.released || self.state.lock().unwrap().underlying.is_closed()
  }
}

/// Runs a closure when unsubscribed, at most once.
pub struct ClosureSubscription<F>(Option<F>);

impl<F> ClosureSubscription<F> {
  pub fn new(teardown: F) -> Self { Self(Some(teardown)) }
}

impl<F: FnOnce()> Subscription for ClosureSubscription<F> {
  fn unsubscribe(&mut self) {
    if let Some(teardown) = self.0.take() {
      teardown()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_none() }
}

/// Wrapper around a subscription which provides the
/// `unsubscribe_when_dropped()` method.
pub struct SubscriptionWrapper<T: Subscription>(pub(crate) T);

impl<T: Subscription> SubscriptionWrapper<T> {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> {
    SubscriptionGuard(self.0)
  }

  /// Consumes this wrapper and returns the underlying subscription.
  pub fn into_inner(self) -> T { self.0 }
}

impl<T: Subscription> Subscription for SubscriptionWrapper<T> {
  #[inline]
  fn unsubscribe(&mut self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription. When
/// this structure is dropped (falls out of scope), the subscription will be
/// unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(pub(crate) T);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> {
    SubscriptionGuard(subscription)
  }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
