use std::marker::PhantomData;

use crate::{
  error::FromPanic,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscriber::Subscriber,
};

/// Observable converting an iterator into a push stream.
///
/// Values are pushed synchronously at subscribe time; pulling stops as soon
/// as the subscriber closes, so an early unsubscribe (or a reaction that
/// reports itself closed) works even on endless iterators.
#[derive(Clone)]
pub struct FromIter<I, Err> {
  iter: I,
  _marker: PhantomData<Err>,
}

/// Create an observable emitting every item of `iter`, then completing.
///
/// ```
/// use rxcore::prelude::*;
///
/// let mut sum = 0;
/// from_iter(0..5).subscribe(|v| sum += v);
/// assert_eq!(sum, 10);
/// ```
pub fn from_iter<I, Err>(iter: I) -> FromIter<I, Err>
where
  I: IntoIterator,
{
  FromIter { iter, _marker: PhantomData }
}

impl<I, Err> ObservableType for FromIter<I, Err>
where
  I: IntoIterator,
{
  type Item = I::Item;
  type Err = Err;
}

impl<I, Err, O> CoreObservable<O> for FromIter<I, Err>
where
  I: IntoIterator,
  O: Observer<I::Item, Err>,
  Err: FromPanic,
{
  fn actual_subscribe(self, mut subscriber: Subscriber<O>) {
    for value in self.iter {
      if subscriber.is_closed() {
        return;
      }
      subscriber.next(value);
    }
    subscriber.complete();
  }
}
