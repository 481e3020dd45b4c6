//! Zip operator implementation
//!
//! Zip pairs values of two sources by arrival index. Each side is asked for
//! `prefetch` values up front and buffered separately; a pair is formed
//! only when the consumer has demand, and every pair formed asks each side
//! for one more value.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use crate::{
  error::FluxError,
  outlet::{Outlet, Pull, Pulled},
  rc::lock,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

// ==================== Zip Operator ====================

#[derive(Clone)]
pub struct Zip<A, B, F> {
  source_a: A,
  source_b: B,
  combiner: Arc<F>,
  prefetch: usize,
}

impl<A, B, F> Zip<A, B, F> {
  pub(crate) fn new(source_a: A, source_b: B, combiner: F, prefetch: usize) -> Self {
    Zip { source_a, source_b, combiner: Arc::new(combiner), prefetch: prefetch.max(1) }
  }
}

// ==================== Shared State ====================

struct ZipState<ItemA, ItemB> {
  buffer_a: VecDeque<ItemA>,
  buffer_b: VecDeque<ItemB>,
  completed_a: bool,
  completed_b: bool,
  subscription_a: Option<Subscription>,
  subscription_b: Option<Subscription>,
}

impl<ItemA, ItemB> ZipState<ItemA, ItemB> {
  fn new() -> Self {
    ZipState {
      buffer_a: VecDeque::new(),
      buffer_b: VecDeque::new(),
      completed_a: false,
      completed_b: false,
      subscription_a: None,
      subscription_b: None,
    }
  }

  /// No further pair can be formed once a completed side has nothing
  /// buffered.
  fn should_complete(&self) -> bool {
    self.completed_a && self.buffer_a.is_empty() || self.completed_b && self.buffer_b.is_empty()
  }
}

type SharedState<ItemA, ItemB> = Arc<Mutex<ZipState<ItemA, ItemB>>>;

// ==================== Pairing ====================

struct ZipPull<ItemA, ItemB, F> {
  state: SharedState<ItemA, ItemB>,
  combiner: Arc<F>,
}

impl<ItemA, ItemB, R, F> Pull<R> for ZipPull<ItemA, ItemB, F>
where
  ItemA: Send + 'static,
  ItemB: Send + 'static,
  F: Fn(ItemA, ItemB) -> R + Send + Sync + 'static,
{
  fn pull(&mut self) -> Pulled<R> {
    let (a, b, replenish) = {
      let mut state = lock(&self.state);
      if state.buffer_a.is_empty() || state.buffer_b.is_empty() {
        return if state.should_complete() { Pulled::Done } else { Pulled::Pending };
      }
      let (Some(a), Some(b)) = (state.buffer_a.pop_front(), state.buffer_b.pop_front()) else {
        return Pulled::Pending;
      };
      // No more pairs can follow this one: skip replenishing and finish.
      let replenish = (!state.should_complete())
        .then(|| [state.subscription_a.clone(), state.subscription_b.clone()]);
      (a, b, replenish)
    };
    let Some(replenish) = replenish else {
      return Pulled::Last((self.combiner)(a, b));
    };
    for subscription in replenish.iter().flatten() {
      subscription.request(1);
    }
    Pulled::Value((self.combiner)(a, b))
  }
}

// ==================== Sinks ====================

/// Sink of source A
struct ZipASink<ItemA, ItemB, R> {
  state: SharedState<ItemA, ItemB>,
  outlet: Arc<Outlet<R>>,
  prefetch: u64,
}

/// Sink of source B
struct ZipBSink<ItemA, ItemB, R> {
  state: SharedState<ItemA, ItemB>,
  outlet: Arc<Outlet<R>>,
  prefetch: u64,
}

impl<ItemA, ItemB, R> Sink<ItemA> for ZipASink<ItemA, ItemB, R>
where
  ItemA: Send + 'static,
  ItemB: Send + 'static,
  R: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    lock(&self.state).subscription_a = Some(subscription.clone());
    self.outlet.add_teardown(subscription.clone());
    subscription.request(self.prefetch);
  }

  fn next(&mut self, value: ItemA) {
    lock(&self.state).buffer_a.push_back(value);
    self.outlet.signal();
  }

  fn error(&mut self, err: FluxError) { self.outlet.error(err); }

  fn complete(&mut self) {
    let finished = {
      let mut state = lock(&self.state);
      state.completed_a = true;
      state.should_complete()
    };
    if finished { self.outlet.complete() } else { self.outlet.signal() }
  }
}

impl<ItemA, ItemB, R> Sink<ItemB> for ZipBSink<ItemA, ItemB, R>
where
  ItemA: Send + 'static,
  ItemB: Send + 'static,
  R: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    lock(&self.state).subscription_b = Some(subscription.clone());
    self.outlet.add_teardown(subscription.clone());
    subscription.request(self.prefetch);
  }

  fn next(&mut self, value: ItemB) {
    lock(&self.state).buffer_b.push_back(value);
    self.outlet.signal();
  }

  fn error(&mut self, err: FluxError) { self.outlet.error(err); }

  fn complete(&mut self) {
    let finished = {
      let mut state = lock(&self.state);
      state.completed_b = true;
      state.should_complete()
    };
    if finished { self.outlet.complete() } else { self.outlet.signal() }
  }
}

// ==================== Source Implementation ====================

impl<A, B, F, R> Source for Zip<A, B, F>
where
  A: Source,
  B: Source,
  F: Fn(A::Item, B::Item) -> R + Send + Sync + 'static,
  R: Send + 'static,
{
  type Item = R;

  fn actual_subscribe(&self, sink: BoxSink<R>) {
    let state: SharedState<A::Item, B::Item> = Arc::new(Mutex::new(ZipState::new()));
    let outlet =
      Outlet::with_pull("zip", ZipPull { state: state.clone(), combiner: self.combiner.clone() });
    outlet.start(sink);

    let prefetch = self.prefetch as u64;
    self.source_a.actual_subscribe(Box::new(ZipASink {
      state: state.clone(),
      outlet: outlet.clone(),
      prefetch,
    }));
    if !outlet.is_input_closed() {
      self
        .source_b
        .actual_subscribe(Box::new(ZipBSink { state, outlet, prefetch }));
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::prelude::*;

  #[rxflux_macro::test]
  fn pairs_by_arrival_index() {
    let pairs = from_iter(vec![1, 2, 3, 4])
      .map(|v| v * 2)
      .zip_with(range(0, 4), |a, b| format!("[1] flux: {a}, [2] flux: {b}"))
      .collect_list()
      .block_last()
      .unwrap();
    assert_eq!(
      pairs,
      Some(vec![
        "[1] flux: 2, [2] flux: 0".to_owned(),
        "[1] flux: 4, [2] flux: 1".to_owned(),
        "[1] flux: 6, [2] flux: 2".to_owned(),
        "[1] flux: 8, [2] flux: 3".to_owned(),
      ])
    );
  }

  #[rxflux_macro::test]
  fn shorter_side_ends_the_zip() {
    let pairs = from_iter(vec!["a", "b", "c"]).zip(range(0, 2)).collect_list().block_last();
    assert_eq!(pairs.unwrap(), Some(vec![("a", 0), ("b", 1)]));
  }

  #[rxflux_macro::test]
  fn paced_by_the_slower_side() {
    TestScheduler::init();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    let done = Arc::new(Mutex::new(false));
    let c_done = done.clone();
    from_iter(vec!["Martín", "Liz", "Candi"])
      .zip(interval_on(Duration::from_millis(100), TestScheduler))
      .subscribe_all(
        move |v| c_seen.lock().unwrap().push(v),
        |e| panic!("unexpected error {e}"),
        move || *c_done.lock().unwrap() = true,
      );

    TestScheduler::advance_by(Duration::from_millis(150));
    assert_eq!(*seen.lock().unwrap(), vec![("Martín", 0)]);

    TestScheduler::advance_by(Duration::from_millis(200));
    assert_eq!(*seen.lock().unwrap(), vec![("Martín", 0), ("Liz", 1), ("Candi", 2)]);
    assert!(*done.lock().unwrap());
    assert!(TestScheduler::is_empty());
  }

  #[rxflux_macro::test]
  fn respects_prefetch() {
    let pulled = Arc::new(Mutex::new(Vec::new()));
    let c_pulled = pulled.clone();
    let subscription = range(0, 100)
      .do_on_next(move |v| c_pulled.lock().unwrap().push(*v))
      .zip_with_prefetch(range(0, 100), |a, b| a + b, 4)
      .subscribe_with(Hold);
    assert_eq!(pulled.lock().unwrap().len(), 4);

    subscription.request(2);
    assert_eq!(pulled.lock().unwrap().len(), 6);
    subscription.cancel();
  }

  struct Hold;

  impl Sink<i64> for Hold {
    fn on_subscribe(&mut self, _: Subscription) {}
    fn next(&mut self, _: i64) {}
    fn error(&mut self, _: FluxError) {}
    fn complete(&mut self) {}
  }
}
