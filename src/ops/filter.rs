use std::sync::Arc;

use crate::{
  error::FluxError,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

#[derive(Clone)]
pub struct Filter<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> Filter<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self {
    Filter { source, predicate: Arc::new(predicate) }
  }
}

impl<S, F> Source for Filter<S, F>
where
  S: Source,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;

  fn actual_subscribe(&self, sink: BoxSink<S::Item>) {
    self.source.actual_subscribe(Box::new(FilterSink {
      downstream: sink,
      predicate: self.predicate.clone(),
      upstream: None,
    }));
  }
}

struct FilterSink<T, F> {
  downstream: BoxSink<T>,
  predicate: Arc<F>,
  upstream: Option<Subscription>,
}

impl<T, F> Sink<T> for FilterSink<T, F>
where
  T: Send + 'static,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.downstream.on_subscribe(subscription)
  }

  fn next(&mut self, value: T) {
    if (self.predicate)(&value) {
      self.downstream.next(value)
    } else if let Some(upstream) = self.upstream.as_ref() {
      upstream.request(1);
    }
  }

  fn error(&mut self, err: FluxError) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  const NAMES: [&str; 6] = [
    "Martín Flores",
    "Liz Gonzales",
    "Candi Abanto",
    "Isela Pimentel",
    "Bruce Lee",
    "Bruce Willis",
  ];

  fn first_name_is_bruce(name: &&str) -> bool {
    name
      .split_whitespace()
      .next()
      .is_some_and(|first| first.eq_ignore_ascii_case("bruce"))
  }

  #[rxflux_macro::test]
  fn keeps_matching_values_in_order() {
    let kept = from_iter(NAMES).filter(first_name_is_bruce).collect_list().block_last();
    assert_eq!(kept.unwrap(), Some(vec!["Bruce Lee", "Bruce Willis"]));
  }

  #[rxflux_macro::test]
  fn dropped_values_do_not_consume_demand() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Once { seen: seen.clone() };
    from_iter(NAMES).filter(first_name_is_bruce).subscribe_with(sink);
    assert_eq!(*seen.lock().unwrap(), vec!["Bruce Lee"]);
  }

  /// Requests exactly one value.
  struct Once {
    seen: Arc<Mutex<Vec<&'static str>>>,
  }

  impl Sink<&'static str> for Once {
    fn on_subscribe(&mut self, subscription: Subscription) { subscription.request(1); }
    fn next(&mut self, value: &'static str) { self.seen.lock().unwrap().push(value); }
    fn error(&mut self, _: FluxError) {}
    fn complete(&mut self) {}
  }
}
