//! Conversion of captured reaction panics into stream errors.
//!
//! A panic escaping a `next` reaction is caught by the surrounding
//! [`Subscriber`](crate::subscriber::Subscriber) and redirected into a single
//! `error` delivery. [`FromPanic`] decides how the captured unwind payload
//! becomes the stream's `Err` value.

use std::{any::Any, convert::Infallible, panic};

/// The payload carried by a captured unwind.
pub type PanicPayload = Box<dyn Any + Send>;

/// Builds a stream error from a captured reaction panic.
pub trait FromPanic: Sized {
  fn from_panic(payload: PanicPayload) -> Self;
}

impl FromPanic for PanicPayload {
  #[inline]
  fn from_panic(payload: PanicPayload) -> Self { payload }
}

/// Recovers the panic message for `panic!("...")` and `panic!(String)`
/// payloads; other payload types collapse to a generic message.
impl FromPanic for String {
  fn from_panic(payload: PanicPayload) -> Self {
    match payload.downcast::<String>() {
      Ok(message) => *message,
      Err(payload) => match payload.downcast::<&'static str>() {
        Ok(message) => (*message).to_owned(),
        Err(_) => "stream reaction panicked".to_owned(),
      },
    }
  }
}

/// An infallible stream has no error channel to absorb a fault, so the panic
/// keeps unwinding.
impl FromPanic for Infallible {
  fn from_panic(payload: PanicPayload) -> Self { panic::resume_unwind(payload) }
}
