use std::marker::PhantomData;

use crate::{
  error::FromPanic,
  observable::{CoreObservable, ObservableType},
  observer::{Emitter, Observer},
  subscriber::{Halt, Subscriber},
  subscription::Subscription,
};

/// Observable whose production logic is a closure.
///
/// The closure receives a type-erased [`Emitter`] (it cannot know the
/// concrete downstream observer type) and may return a teardown
/// subscription, which becomes the subscriber's upstream. Returning `()`
/// means there is nothing to tear down.
#[derive(Clone)]
pub struct Create<F, Item, Err> {
  f: F,
  _marker: PhantomData<(Item, Err)>,
}

/// Create an observable from a production closure.
///
/// ```
/// use rxcore::prelude::*;
///
/// let mut sum = 0;
/// create(|emitter| {
///   emitter.next(1);
///   emitter.next(2);
///   emitter.complete();
/// })
/// .subscribe(|v: i32| sum += v);
/// assert_eq!(sum, 3);
/// ```
pub fn create<F, Item, Err, U>(f: F) -> Create<F, Item, Err>
where
  F: FnOnce(&mut dyn Emitter<Item, Err>) -> U,
{
  Create { f, _marker: PhantomData }
}

impl<F, Item, Err> ObservableType for Create<F, Item, Err> {
  type Item = Item;
  type Err = Err;
}

/// Adapter giving the production closure `&mut` access to the subscriber's
/// protocol methods without exposing its concrete type.
struct CreateEmitter<'a, O>(&'a mut Subscriber<O>);

impl<O, Item, Err> Emitter<Item, Err> for CreateEmitter<'_, O>
where
  O: Observer<Item, Err>,
  Err: FromPanic,
{
  #[inline]
  fn next(&mut self, value: Item) { self.0.next(value); }

  #[inline]
  fn error(&mut self, err: Err) { self.0.halt_error(err); }

  #[inline]
  fn complete(&mut self) { self.0.halt_complete(); }
}

impl<F, Item, Err, U, O> CoreObservable<O> for Create<F, Item, Err>
where
  F: FnOnce(&mut dyn Emitter<Item, Err>) -> U,
  U: Subscription + Send + 'static,
  O: Observer<Item, Err>,
  Err: FromPanic,
{
  fn actual_subscribe(self, mut subscriber: Subscriber<O>) {
    let teardown = (self.f)(&mut CreateEmitter(&mut subscriber));
    // A subscriber that terminated during production disposes the teardown
    // right here instead of adopting it.
    subscriber.set_upstream(teardown);
  }
}
