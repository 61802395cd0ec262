//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Error conversion
pub use crate::error::{FromPanic, PanicPayload};
// Observable core and sources
pub use crate::observable::{
  create, from_iter, ConnectableObservable, CoreObservable, Create, FromIter, Lift, Observable,
  ObservableType, Operator, RefCountObservable,
};
// Observer trait and adapters
pub use crate::observer::{BoxedObserver, DynObserver, Emitter, FnMutObserver, Observer};
// Scheduler core types
pub use crate::scheduler::{Duration, Instant, Scheduler, Task, TaskState, Worker};
// Default schedulers
#[cfg(feature = "pool-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
pub use crate::scheduler::TrampolineScheduler;
// Subject
pub use crate::subject::Subject;
// Subscriber
pub use crate::subscriber::Subscriber;
// Subscription
pub use crate::subscription::{
  BoxSubscription, ClosureSubscription, CompositeSubscription, RefCountHandle,
  RefCountSubscription, SlotSubscription, Subscription, SubscriptionGuard, SubscriptionWrapper,
};
