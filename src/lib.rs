//! # rxcore: a push-based event-stream runtime
//!
//! Producers ("observables") emit values, errors, or completion signals to
//! consumers ("observers"); execution of scheduled work is decoupled from
//! emission through pluggable schedulers. This crate is the runtime core of
//! that model: the emission protocol and its disposal invariants, the
//! subscription graph that tears arbitrarily deep pipelines down exactly
//! once, the connectable/ref-counted multicast observable, and a reentrant
//! time-ordered trampoline scheduler.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! let mut sum = 0;
//! from_iter(0..10).subscribe(|v| sum += v);
//! assert_eq!(sum, 45);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Description of a producible value stream; production starts at subscribe time |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscriber`] | Protocol wrapper adding disposal awareness and panic redirection |
//! | [`Subscription`] | Idempotent handle to cancel an active subscription |
//! | [`ConnectableObservable`] | Multicast observable with an explicit `connect`/`ref_count` lifecycle |
//! | [`TrampolineScheduler`] | Runs deferred work on the calling thread, time-and-insertion ordered |
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`ConnectableObservable`]: observable::ConnectableObservable
//! [`TrampolineScheduler`]: scheduler::TrampolineScheduler

pub mod error;
pub mod observable;
pub mod observer;
pub mod prelude;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;

// Re-export the prelude module
pub use prelude::*;
