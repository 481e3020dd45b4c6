use std::sync::Arc;

use crate::{
  error::{FluxError, Result},
  hooks,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

#[derive(Clone)]
pub struct Map<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> Map<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { Map { source, func: Arc::new(func) } }
}

impl<S, F, B> Source for Map<S, F>
where
  S: Source,
  F: Fn(S::Item) -> B + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;

  fn actual_subscribe(&self, sink: BoxSink<B>) {
    self
      .source
      .actual_subscribe(Box::new(MapSink { downstream: sink, func: self.func.clone() }));
  }
}

struct MapSink<B, F> {
  downstream: BoxSink<B>,
  func: Arc<F>,
}

impl<A, B, F> Sink<A> for MapSink<B, F>
where
  F: Fn(A) -> B + Send + Sync + 'static,
  B: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.downstream.on_subscribe(subscription)
  }

  fn next(&mut self, value: A) { self.downstream.next((self.func)(value)) }

  fn error(&mut self, err: FluxError) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }
}

// ============================================================================
// TryMap
// ============================================================================

#[derive(Clone)]
pub struct TryMap<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> TryMap<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { TryMap { source, func: Arc::new(func) } }
}

impl<S, F, B> Source for TryMap<S, F>
where
  S: Source,
  F: Fn(S::Item) -> Result<B> + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;

  fn actual_subscribe(&self, sink: BoxSink<B>) {
    self.source.actual_subscribe(Box::new(TryMapSink {
      downstream: sink,
      func: self.func.clone(),
      upstream: None,
      failed: false,
    }));
  }
}

struct TryMapSink<B, F> {
  downstream: BoxSink<B>,
  func: Arc<F>,
  upstream: Option<Subscription>,
  failed: bool,
}

impl<A, B, F> Sink<A> for TryMapSink<B, F>
where
  F: Fn(A) -> Result<B> + Send + Sync + 'static,
  B: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.downstream.on_subscribe(subscription)
  }

  fn next(&mut self, value: A) {
    if self.failed {
      return;
    }
    match (self.func)(value) {
      Ok(value) => self.downstream.next(value),
      Err(err) => {
        self.failed = true;
        if let Some(upstream) = self.upstream.take() {
          upstream.cancel();
        }
        self.downstream.error(err);
      }
    }
  }

  fn error(&mut self, err: FluxError) {
    if self.failed {
      hooks::on_error_dropped(&err);
    } else {
      self.downstream.error(err)
    }
  }

  fn complete(&mut self) {
    if !self.failed {
      self.downstream.complete()
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use crate::prelude::*;

  #[rxflux_macro::test]
  fn doubles_values() {
    let doubled = from_iter(vec![1, 2, 3, 4]).map(|v| v * 2).collect_list().block_last();
    assert_eq!(doubled.unwrap(), Some(vec![2, 4, 6, 8]));
  }

  #[rxflux_macro::test]
  fn map_keeps_demand_one_to_one() {
    let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    let subscription = range(0, 10)
      .map(|v| v.to_string())
      .subscribe_with(Manual(c_seen));
    subscription.request(3);
    assert_eq!(*seen.lock().unwrap(), vec!["0", "1", "2"]);
  }

  #[rxflux_macro::test]
  fn rejected_value_terminates_with_error() {
    let log = std::sync::Arc::new(Mutex::new(Vec::new()));
    let (c_next, c_err) = (log.clone(), log.clone());
    from_iter(vec!["Liz", "", "Bruce"])
      .try_map(|name: &str| {
        if name.is_empty() { Err(FluxError::invalid("empty name")) } else { Ok(name.len()) }
      })
      .subscribe_err(
        move |v| c_next.lock().unwrap().push(format!("next {v}")),
        move |e| c_err.lock().unwrap().push(format!("error {e}")),
      );
    assert_eq!(*log.lock().unwrap(), vec!["next 3", "error invalid value: empty name"]);
  }

  struct Manual(std::sync::Arc<Mutex<Vec<String>>>);

  impl Sink<String> for Manual {
    fn on_subscribe(&mut self, _: Subscription) {}
    fn next(&mut self, value: String) { self.0.lock().unwrap().push(value); }
    fn error(&mut self, _: FluxError) {}
    fn complete(&mut self) {}
  }
}
