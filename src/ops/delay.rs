use std::sync::{Arc, Mutex};

use crate::{
  error::FluxError,
  outlet::{Outlet, Pull, Pulled},
  rc::lock,
  scheduler::{Duration, Scheduler, Task},
  sink::{BoxSink, Sink},
  source::Source,
  subscription::Subscription,
};

/// Re-emits each value a fixed delay after it was received.
///
/// Values are handled one at a time: the next upstream value is requested
/// only once the delayed one was emitted, which keeps the order even on a
/// multi-threaded scheduler. Errors are forwarded immediately; completion
/// waits for the last delayed value.
#[derive(Clone)]
pub struct DelayElements<S, Sch> {
  source: S,
  delay: Duration,
  scheduler: Sch,
}

impl<S, Sch> DelayElements<S, Sch> {
  pub(crate) fn new(source: S, delay: Duration, scheduler: Sch) -> Self {
    DelayElements { source, delay, scheduler }
  }
}

struct DelayState<T> {
  upstream: Option<Subscription>,
  ready: Option<T>,
  requested: bool,
  in_timer: bool,
  upstream_done: bool,
}

type SharedState<T> = Arc<Mutex<DelayState<T>>>;

struct DelayPull<T>(SharedState<T>);

impl<T: Send + 'static> Pull<T> for DelayPull<T> {
  fn pull(&mut self) -> Pulled<T> {
    let upstream = {
      let mut state = lock(&self.0);
      if let Some(value) = state.ready.take() {
        return if state.upstream_done { Pulled::Last(value) } else { Pulled::Value(value) };
      }
      if state.requested || state.in_timer {
        return Pulled::Pending;
      }
      if state.upstream_done {
        return Pulled::Done;
      }
      let Some(upstream) = state.upstream.clone() else {
        return Pulled::Pending;
      };
      state.requested = true;
      upstream
    };
    upstream.request(1);
    Pulled::Pending
  }
}

struct DelaySink<T, Sch> {
  state: SharedState<T>,
  outlet: Arc<Outlet<T>>,
  delay: Duration,
  scheduler: Sch,
}

impl<T, Sch> Sink<T> for DelaySink<T, Sch>
where
  T: Send + 'static,
  Sch: Scheduler,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.outlet.add_teardown(subscription.clone());
    lock(&self.state).upstream = Some(subscription);
    self.outlet.signal();
  }

  fn next(&mut self, value: T) {
    {
      let mut state = lock(&self.state);
      state.requested = false;
      state.in_timer = true;
    }
    let state = self.state.clone();
    let outlet = self.outlet.clone();
    let handle = self.scheduler.schedule(
      Task::once(move || {
        {
          let mut state = lock(&state);
          state.in_timer = false;
          state.ready = Some(value);
        }
        outlet.signal();
      }),
      Some(self.delay),
    );
    self.outlet.add_teardown(handle);
  }

  fn error(&mut self, err: FluxError) { self.outlet.error(err); }

  fn complete(&mut self) {
    let drained = {
      let mut state = lock(&self.state);
      state.requested = false;
      state.upstream_done = true;
      !state.in_timer && state.ready.is_none()
    };
    if drained { self.outlet.complete() } else { self.outlet.signal() }
  }
}

impl<S, Sch> Source for DelayElements<S, Sch>
where
  S: Source,
  Sch: Scheduler,
{
  type Item = S::Item;

  fn actual_subscribe(&self, sink: BoxSink<S::Item>) {
    let state = Arc::new(Mutex::new(DelayState {
      upstream: None,
      ready: None,
      requested: false,
      in_timer: false,
      upstream_done: false,
    }));
    let outlet = Outlet::with_pull("delay_elements", DelayPull(state.clone()));
    outlet.start(sink);
    self.source.actual_subscribe(Box::new(DelaySink {
      state,
      outlet,
      delay: self.delay,
      scheduler: self.scheduler.clone(),
    }));
  }
}
