//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

use std::convert::Infallible;

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable. `error` and `complete` consume the observer: no more
/// signals can be delivered after a terminal one, and the type makes that
/// unrepresentable.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable
  ///
  /// This consumes the observer, as no more values can be emitted after an
  /// error
  fn error(self, err: Err);

  /// Handle completion of the observable
  ///
  /// This consumes the observer, as no more values can be emitted after
  /// completion
  fn complete(self);

  /// Checks if the observer is closed.
  ///
  /// Sources use this to determine whether they should stop emitting early:
  /// a closed observer will ignore every further signal.
  fn is_closed(&self) -> bool;
}

// ============================================================================
// Emitter Trait
// ============================================================================

/// A facade for pushing items to an observer through a `&mut` reference.
///
/// Unlike `Observer`, which consumes `self` for `error` and `complete`,
/// `Emitter` takes `&mut self` for all methods so it can be used as a trait
/// object (`&mut dyn Emitter`). That is exactly what the `create` source
/// needs: its production closure cannot be generic over the concrete
/// downstream observer type, so it is handed a `&mut dyn Emitter` erased at
/// the subscribe boundary. Terminal calls after the first are no-ops.
pub trait Emitter<Item, Err> {
  fn next(&mut self, value: Item);
  fn error(&mut self, err: Err);
  fn complete(&mut self);
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Helper trait to enable object-safe Observers (`Box<dyn DynObserver>`)
///
/// The standard Observer trait is not object-safe because the terminal
/// methods take `self` by value. DynObserver mirrors the interface but
/// adapts it for vtables.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_closed(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }

  fn box_error(self: Box<Self>, err: Err) { self.error(err); }

  fn box_complete(self: Box<Self>) { self.complete(); }

  fn box_is_closed(&self) -> bool { self.is_closed() }
}

/// Boxed observer, the erased form stored in heterogeneous containers such
/// as a subject's subscriber list. Constructed once at the erasure boundary.
pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for BoxedObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).box_is_closed() }
}

// ============================================================================
// FnMutObserver - Closure adapter
// ============================================================================

/// Adapter turning a closure into an observer.
///
/// This enables ergonomic subscription syntax: `observable.subscribe(|v|
/// println!("{}", v))`. The closure becomes the `next` handler, while
/// `error` and `complete` are ignored by default.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value); }

  #[inline]
  fn error(self, _err: Infallible) {}

  #[inline]
  fn complete(self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct TestObserver {
    values: Vec<i32>,
  }

  impl Observer<i32, ()> for TestObserver {
    fn next(&mut self, value: i32) { self.values.push(value); }

    fn error(self, _: ()) {}

    fn complete(self) {}

    fn is_closed(&self) -> bool { false }
  }

  #[test]
  fn observer_trait() {
    let mut obs = TestObserver { values: vec![] };
    obs.next(1);
    obs.next(2);
    assert_eq!(obs.values, vec![1, 2]);
    assert!(!obs.is_closed());
  }

  #[test]
  fn closure_as_observer() {
    let mut count = 0;
    let mut closure_obs = FnMutObserver(|v: i32| {
      count += v;
    });

    closure_obs.next(10);
    closure_obs.next(20);
    assert_eq!(count, 30);
  }

  #[test]
  fn boxed_observer_delegates() {
    struct Collect(std::sync::Arc<std::sync::Mutex<Vec<i32>>>);

    impl Observer<i32, ()> for Collect {
      fn next(&mut self, value: i32) { self.0.lock().unwrap().push(value); }

      fn error(self, _: ()) { self.0.lock().unwrap().push(-1); }

      fn complete(self) { self.0.lock().unwrap().push(100); }

      fn is_closed(&self) -> bool { false }
    }

    let values = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
    let mut boxed: BoxedObserver<i32, ()> = Box::new(Collect(values.clone()));
    boxed.next(1);
    boxed.next(2);
    boxed.complete();
    assert_eq!(*values.lock().unwrap(), vec![1, 2, 100]);
  }
}
