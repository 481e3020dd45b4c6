//! Merges the inner sources produced for each upstream value.
//!
//! At most `concurrency` inner sources run at once: the upstream is asked
//! for `concurrency` values up front and for one more each time an inner
//! source completes. Inner sources are consumed without bound; their
//! values wait in the merge buffer until the consumer requests them.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use once_cell::sync::OnceCell;

use crate::{
  error::FluxError,
  outlet::Outlet,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

#[derive(Clone)]
pub struct FlatMap<S, F> {
  source: S,
  func: Arc<F>,
  concurrency: usize,
}

impl<S, F> FlatMap<S, F> {
  pub(crate) fn new(source: S, func: F, concurrency: usize) -> Self {
    FlatMap { source, func: Arc::new(func), concurrency: concurrency.max(1) }
  }
}

impl<S, F, R> Source for FlatMap<S, F>
where
  S: Source,
  F: Fn(S::Item) -> R + Send + Sync + 'static,
  R: Source,
{
  type Item = R::Item;

  fn actual_subscribe(&self, sink: BoxSink<R::Item>) {
    let outlet = Outlet::new("flat_map");
    outlet.start(sink);
    let merge = Arc::new(Merge {
      outlet,
      upstream: OnceCell::new(),
      // The upstream counts as one active source until it completes.
      active: AtomicUsize::new(1),
    });
    self.source.actual_subscribe(Box::new(OuterSink {
      merge,
      func: self.func.clone(),
      concurrency: self.concurrency as u64,
    }));
  }
}

struct Merge<T> {
  outlet: Arc<Outlet<T>>,
  upstream: OnceCell<Subscription>,
  active: AtomicUsize,
}

impl<T: Send + 'static> Merge<T> {
  fn source_done(&self) {
    if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.outlet.complete();
    }
  }
}

struct OuterSink<T, F> {
  merge: Arc<Merge<T>>,
  func: Arc<F>,
  concurrency: u64,
}

impl<A, F, R> Sink<A> for OuterSink<R::Item, F>
where
  F: Fn(A) -> R + Send + Sync + 'static,
  R: Source,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.merge.outlet.add_teardown(subscription.clone());
    let _ = self.merge.upstream.set(subscription.clone());
    subscription.request(self.concurrency);
  }

  fn next(&mut self, value: A) {
    if self.merge.outlet.is_input_closed() {
      return;
    }
    let inner = (self.func)(value);
    self.merge.active.fetch_add(1, Ordering::AcqRel);
    inner.actual_subscribe(Box::new(InnerSink { merge: self.merge.clone() }));
  }

  fn error(&mut self, err: FluxError) { self.merge.outlet.error(err); }

  fn complete(&mut self) { self.merge.source_done(); }
}

struct InnerSink<T> {
  merge: Arc<Merge<T>>,
}

impl<T: Send + 'static> Sink<T> for InnerSink<T> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.merge.outlet.add_teardown(subscription.clone());
    subscription.request_unbounded();
  }

  fn next(&mut self, value: T) { self.merge.outlet.push(value); }

  fn error(&mut self, err: FluxError) { self.merge.outlet.error(err); }

  fn complete(&mut self) {
    if let Some(upstream) = self.merge.upstream.get() {
      upstream.request(1);
    }
    self.merge.source_done();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::prelude::*;

  #[rxflux_macro::test]
  fn empty_inner_acts_as_filter() {
    let names = vec!["Martín Flores", "Bruce Lee", "Liz Gonzales", "Bruce Willis"];
    let kept = from_iter(names)
      .flat_map(|name: &str| {
        if name.starts_with("Bruce") { just(name.to_uppercase()) } else { empty() }
      })
      .collect_list()
      .block_last();
    assert_eq!(kept.unwrap(), Some(vec!["BRUCE LEE".to_owned(), "BRUCE WILLIS".to_owned()]));
  }

  #[rxflux_macro::test]
  fn merges_every_inner_value() {
    let merged = range(1, 3)
      .flat_map(|n| range(0, n as usize))
      .collect_list()
      .block_last();
    assert_eq!(merged.unwrap(), Some(vec![0, 0, 1, 0, 1, 2]));
  }

  #[rxflux_macro::test]
  fn concurrency_bounds_upstream_requests() {
    let requested = Arc::new(Mutex::new(Vec::new()));
    let c_requested = requested.clone();
    let subscription = range(0, 5)
      .log("upstream")
      .flat_map_with_concurrency(move |v| {
        c_requested.lock().unwrap().push(v);
        error::<i64>(FluxError::msg("stop"))
      }, 2)
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(*requested.lock().unwrap(), vec![0]);
    assert!(subscription.is_closed());
  }

  #[rxflux_macro::test]
  fn inner_error_cancels_everything() {
    TestScheduler::init();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (c_next, c_err) = (log.clone(), log.clone());
    from_iter(vec![1, 2])
      .flat_map(|v| {
        if v == 1 {
          interval_on(Duration::from_millis(10), TestScheduler).map(|t| t as i64).boxed()
        } else {
          error(FluxError::msg("inner failed")).boxed()
        }
      })
      .subscribe_err(
        move |v| c_next.lock().unwrap().push(format!("next {v}")),
        move |e| c_err.lock().unwrap().push(format!("error {e}")),
      );
    TestScheduler::flush();
    assert_eq!(*log.lock().unwrap(), vec!["error inner failed"]);
    assert!(TestScheduler::is_empty());
  }
}
