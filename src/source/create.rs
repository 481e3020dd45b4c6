//! Emitter-style source: a producer callback pushes values through an
//! [`Emitter`] capability that it may clone and move into timers or
//! threads.

use std::{marker::PhantomData, sync::Arc};

use super::Source;
use crate::{
  error::FluxError,
  outlet::Outlet,
  sink::BoxSink,
  subscription::Subscription,
};

pub struct Create<F, T> {
  producer: Arc<F>,
  _item: PhantomData<fn() -> T>,
}

/// Creates a source that runs `producer` once per subscription.
///
/// Values pushed before the consumer requested them are buffered and
/// delivered as demand arrives.
pub fn create<F, T>(producer: F) -> Create<F, T>
where
  F: Fn(Emitter<T>) + Send + Sync + 'static,
  T: Send + 'static,
{
  Create { producer: Arc::new(producer), _item: PhantomData }
}

impl<F, T> Source for Create<F, T>
where
  F: Fn(Emitter<T>) + Send + Sync + 'static,
  T: Send + 'static,
{
  type Item = T;

  fn actual_subscribe(&self, sink: BoxSink<T>) {
    let outlet = Outlet::new("create");
    outlet.start(sink);
    (self.producer)(Emitter { outlet });
  }
}

/// Push side of a [`create`] subscription.
pub struct Emitter<T> {
  outlet: Arc<Outlet<T>>,
}

impl<T> Clone for Emitter<T> {
  fn clone(&self) -> Self { Emitter { outlet: self.outlet.clone() } }
}

impl<T: Send + 'static> Emitter<T> {
  pub fn next(&self, value: T) { self.outlet.push(value); }

  pub fn error(&self, err: FluxError) { self.outlet.error(err); }

  pub fn complete(&self) { self.outlet.complete(); }

  /// `true` once the consumer cancelled or a terminal signal was emitted;
  /// producers should stop work at that point.
  pub fn is_cancelled(&self) -> bool { self.outlet.is_input_closed() }

  /// Runs `teardown` when the subscription is cancelled or terminates.
  pub fn on_dispose(&self, teardown: impl FnOnce() + Send + 'static) {
    self.outlet.add_teardown(Subscription::from_fn(teardown));
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
  };

  use super::*;
  use crate::prelude::*;

  #[rxflux_macro::test]
  fn pushes_reach_the_consumer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    create(|emitter: Emitter<&str>| {
      emitter.next("Martín");
      emitter.next("Liz");
      emitter.complete();
      emitter.next("ignored");
    })
    .subscribe(move |v| c_seen.lock().unwrap().push(v));
    assert_eq!(*seen.lock().unwrap(), vec!["Martín", "Liz"]);
  }

  #[rxflux_macro::test]
  fn dispose_runs_on_cancel() {
    let disposed = Arc::new(AtomicBool::new(false));
    let c_disposed = disposed.clone();
    let slot = Arc::new(Mutex::new(None));
    let c_slot = slot.clone();
    let subscription = create(move |emitter: Emitter<i32>| {
      let c_disposed = c_disposed.clone();
      emitter.on_dispose(move || c_disposed.store(true, Ordering::SeqCst));
      *c_slot.lock().unwrap() = Some(emitter);
    })
    .subscribe(|_| {});

    let emitter = slot.lock().unwrap().take().unwrap();
    assert!(!emitter.is_cancelled());
    subscription.cancel();
    assert!(disposed.load(Ordering::SeqCst));
    assert!(emitter.is_cancelled());
  }
}
