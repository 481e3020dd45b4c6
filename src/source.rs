//! Producers of value sequences.
//!
//! A [`Source`] is a factory of subscriptions: every call to
//! [`Source::actual_subscribe`] starts an independent run with its own
//! state, which is what lets `retry` restart a failed upstream from scratch.
//! Operators are sources too, wrapping their upstream.

use std::sync::Arc;

use crate::sink::BoxSink;

mod create;
mod from_iter;
mod generate;
mod interval;
mod trivial;

pub use create::{create, Create, Emitter};
pub use from_iter::{empty, from_iter, just, range, FromIter, IntRange};
pub use generate::{generate_on, Generate};
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use generate::generate;
pub use interval::{interval_on, Interval};
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use interval::interval;
pub use trivial::{error, from_callable, ErrorSource, FromCallable};

pub trait Source: Send + Sync + 'static {
  type Item: Send + 'static;

  /// Attaches `sink` as the consumer of a new, independent run. The sink
  /// receives its `on_subscribe` before any other signal.
  fn actual_subscribe(&self, sink: BoxSink<Self::Item>);
}

impl<S: Source + ?Sized> Source for Arc<S> {
  type Item = S::Item;

  #[inline]
  fn actual_subscribe(&self, sink: BoxSink<Self::Item>) { (**self).actual_subscribe(sink) }
}

/// A type-erased source.
pub type BoxFlux<T> = Arc<dyn Source<Item = T>>;
