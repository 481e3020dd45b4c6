use std::sync::Arc;

use crate::{
  error::FluxError,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

type OnNext<T> = Box<dyn Fn(&T) + Send + Sync>;
type OnError = Box<dyn Fn(&FluxError) + Send + Sync>;
type OnSignal = Box<dyn Fn() + Send + Sync>;

/// Callbacks run as signals pass by. Signals are forwarded unchanged.
struct Hooks<T> {
  on_next: Option<OnNext<T>>,
  on_error: Option<OnError>,
  on_complete: Option<OnSignal>,
  on_terminate: Option<OnSignal>,
}

impl<T> Default for Hooks<T> {
  fn default() -> Self { Hooks { on_next: None, on_error: None, on_complete: None, on_terminate: None } }
}

/// Side-effect operator behind the `do_on_*` family.
pub struct Peek<S: Source> {
  source: S,
  hooks: Arc<Hooks<S::Item>>,
}

impl<S: Source> Peek<S> {
  fn with(source: S, hooks: Hooks<S::Item>) -> Self { Peek { source, hooks: Arc::new(hooks) } }

  pub(crate) fn on_next(source: S, f: impl Fn(&S::Item) + Send + Sync + 'static) -> Self {
    Self::with(source, Hooks { on_next: Some(Box::new(f)), ..Hooks::default() })
  }

  pub(crate) fn on_error(source: S, f: impl Fn(&FluxError) + Send + Sync + 'static) -> Self {
    Self::with(source, Hooks { on_error: Some(Box::new(f)), ..Hooks::default() })
  }

  pub(crate) fn on_complete(source: S, f: impl Fn() + Send + Sync + 'static) -> Self {
    Self::with(source, Hooks { on_complete: Some(Box::new(f)), ..Hooks::default() })
  }

  pub(crate) fn on_terminate(source: S, f: impl Fn() + Send + Sync + 'static) -> Self {
    Self::with(source, Hooks { on_terminate: Some(Box::new(f)), ..Hooks::default() })
  }
}

impl<S: Source> Source for Peek<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, sink: BoxSink<S::Item>) {
    self
      .source
      .actual_subscribe(Box::new(PeekSink { downstream: sink, hooks: self.hooks.clone() }));
  }
}

struct PeekSink<T> {
  downstream: BoxSink<T>,
  hooks: Arc<Hooks<T>>,
}

impl<T: Send + 'static> Sink<T> for PeekSink<T> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.downstream.on_subscribe(subscription)
  }

  fn next(&mut self, value: T) {
    if let Some(on_next) = &self.hooks.on_next {
      on_next(&value);
    }
    self.downstream.next(value)
  }

  fn error(&mut self, err: FluxError) {
    if let Some(on_error) = &self.hooks.on_error {
      on_error(&err);
    }
    if let Some(on_terminate) = &self.hooks.on_terminate {
      on_terminate();
    }
    self.downstream.error(err)
  }

  fn complete(&mut self) {
    if let Some(on_complete) = &self.hooks.on_complete {
      on_complete();
    }
    if let Some(on_terminate) = &self.hooks.on_terminate {
      on_terminate();
    }
    self.downstream.complete()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::prelude::*;

  #[rxflux_macro::test]
  fn hooks_run_before_downstream() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
    from_iter(vec![1, 2])
      .do_on_next(move |v| l1.lock().unwrap().push(format!("peek {v}")))
      .do_on_complete(move || l2.lock().unwrap().push("peek complete".to_owned()))
      .do_on_terminate(move || l3.lock().unwrap().push("terminate".to_owned()))
      .subscribe(move |v| l4.lock().unwrap().push(format!("next {v}")));

    assert_eq!(
      *log.lock().unwrap(),
      vec!["peek 1", "next 1", "peek 2", "next 2", "peek complete", "terminate"]
    );
  }

  #[rxflux_macro::test]
  fn error_hooks_see_the_error() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    error::<i32>(FluxError::msg("boom"))
      .do_on_error(move |e| l1.lock().unwrap().push(format!("peek {e}")))
      .do_on_terminate(move || l2.lock().unwrap().push("terminate".to_owned()))
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(*log.lock().unwrap(), vec!["peek boom", "terminate"]);
  }
}
