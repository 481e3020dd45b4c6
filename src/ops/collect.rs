use std::sync::Arc;

use crate::{
  error::FluxError,
  outlet::Outlet,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

/// Buffers every value and emits them as one `Vec` when the source
/// completes. An error discards the buffer.
#[derive(Clone)]
pub struct CollectList<S> {
  source: S,
}

impl<S> CollectList<S> {
  pub(crate) fn new(source: S) -> Self { CollectList { source } }
}

impl<S: Source> Source for CollectList<S> {
  type Item = Vec<S::Item>;

  fn actual_subscribe(&self, sink: BoxSink<Vec<S::Item>>) {
    let outlet = Outlet::new("collect_list");
    outlet.start(sink);
    self
      .source
      .actual_subscribe(Box::new(CollectSink { outlet, values: Vec::new() }));
  }
}

struct CollectSink<T> {
  outlet: Arc<Outlet<Vec<T>>>,
  values: Vec<T>,
}

impl<T: Send + 'static> Sink<T> for CollectSink<T> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.outlet.add_teardown(subscription.clone());
    subscription.request_unbounded();
  }

  fn next(&mut self, value: T) { self.values.push(value); }

  fn error(&mut self, err: FluxError) {
    self.values.clear();
    self.outlet.error(err);
  }

  fn complete(&mut self) {
    self.outlet.push(std::mem::take(&mut self.values));
    self.outlet.complete();
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxflux_macro::test]
  fn gathers_all_values() {
    let list = from_iter(vec!["Martín", "Liz"]).collect_list().block_last();
    assert_eq!(list.unwrap(), Some(vec!["Martín", "Liz"]));
  }

  #[rxflux_macro::test]
  fn empty_source_gives_empty_list() {
    let list = empty::<i32>().collect_list().block_last();
    assert_eq!(list.unwrap(), Some(vec![]));
  }

  #[rxflux_macro::test]
  fn error_replaces_the_list() {
    let err = error::<i32>(FluxError::msg("nope")).collect_list().block_last().unwrap_err();
    assert_eq!(err.to_string(), "nope");
  }
}
