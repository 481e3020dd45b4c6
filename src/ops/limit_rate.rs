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

/// Rewrites the consumer's demand into upstream requests of `n` values.
///
/// A chunk is requested only when the previous one was fully delivered and
/// the consumer still has demand, so the upstream never runs more than `n`
/// values ahead of the consumer.
#[derive(Clone)]
pub struct LimitRate<S> {
  source: S,
  chunk: u64,
}

impl<S> LimitRate<S> {
  pub(crate) fn new(source: S, chunk: usize) -> Self {
    LimitRate { source, chunk: chunk.max(1) as u64 }
  }
}

struct LimitState<T> {
  upstream: Option<Subscription>,
  buffer: VecDeque<T>,
  outstanding: u64,
  done: bool,
}

impl<T> LimitState<T> {
  /// Takes the next buffered value, marking it as the last one once the
  /// upstream has completed and nothing else is buffered.
  fn pop(&mut self) -> Option<Pulled<T>> {
    let value = self.buffer.pop_front()?;
    let last = self.done && self.buffer.is_empty();
    Some(if last { Pulled::Last(value) } else { Pulled::Value(value) })
  }
}

type SharedState<T> = Arc<Mutex<LimitState<T>>>;

struct LimitPull<T> {
  state: SharedState<T>,
  chunk: u64,
}

impl<T: Send + 'static> Pull<T> for LimitPull<T> {
  fn pull(&mut self) -> Pulled<T> {
    let upstream = {
      let mut state = lock(&self.state);
      if let Some(value) = state.pop() {
        return value;
      }
      if state.done {
        return Pulled::Done;
      }
      if state.outstanding > 0 {
        return Pulled::Pending;
      }
      let Some(upstream) = state.upstream.clone() else {
        return Pulled::Pending;
      };
      state.outstanding = self.chunk;
      upstream
    };
    tracing::trace!(chunk = self.chunk, "limit_rate: requesting next chunk");
    upstream.request(self.chunk);

    // A synchronous upstream has already delivered into the buffer.
    let mut state = lock(&self.state);
    match state.pop() {
      Some(value) => value,
      None if state.done => Pulled::Done,
      None => Pulled::Pending,
    }
  }
}

struct LimitSink<T> {
  state: SharedState<T>,
  outlet: Arc<Outlet<T>>,
}

impl<T: Send + 'static> Sink<T> for LimitSink<T> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.outlet.add_teardown(subscription.clone());
    lock(&self.state).upstream = Some(subscription);
    self.outlet.signal();
  }

  fn next(&mut self, value: T) {
    {
      let mut state = lock(&self.state);
      state.outstanding = state.outstanding.saturating_sub(1);
      state.buffer.push_back(value);
    }
    self.outlet.signal();
  }

  fn error(&mut self, err: FluxError) { self.outlet.error(err); }

  fn complete(&mut self) {
    let drained = {
      let mut state = lock(&self.state);
      state.done = true;
      state.buffer.is_empty()
    };
    if drained { self.outlet.complete() } else { self.outlet.signal() }
  }
}

impl<S: Source> Source for LimitRate<S> {
  type Item = S::Item;

  fn actual_subscribe(&self, sink: BoxSink<S::Item>) {
    let state = Arc::new(Mutex::new(LimitState {
      upstream: None,
      buffer: VecDeque::new(),
      outstanding: 0,
      done: false,
    }));
    let outlet = Outlet::with_pull("limit_rate", LimitPull { state: state.clone(), chunk: self.chunk });
    outlet.start(sink);
    self.source.actual_subscribe(Box::new(LimitSink { state, outlet }));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prelude::*;

  #[rxflux_macro::test]
  fn chunks_cover_every_value() {
    let values = range(1, 10).limit_rate(4).collect_list().block_last();
    assert_eq!(values.unwrap(), Some((1..=10).collect::<Vec<i64>>()));
  }

  #[rxflux_macro::test]
  fn upstream_never_runs_ahead_of_a_chunk() {
    let pulled = Arc::new(Mutex::new(0usize));
    let c_pulled = pulled.clone();
    let subscription = range(0, 100)
      .do_on_next(move |_| *c_pulled.lock().unwrap() += 1)
      .limit_rate(3)
      .subscribe_with(Hold);

    subscription.request(1);
    assert_eq!(*pulled.lock().unwrap(), 3);
    subscription.request(2);
    assert_eq!(*pulled.lock().unwrap(), 3);
    subscription.request(1);
    assert_eq!(*pulled.lock().unwrap(), 6);
    subscription.cancel();
  }

  /// Requests nothing by itself.
  struct Hold;

  impl Sink<i64> for Hold {
    fn on_subscribe(&mut self, _: Subscription) {}
    fn next(&mut self, _: i64) {}
    fn error(&mut self, _: FluxError) {}
    fn complete(&mut self) {}
  }
}
