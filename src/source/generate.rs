//! A timer-driven source whose values come from a callback.
//!
//! Each tick invokes the generator once. A value equal to the configured
//! error trigger ends the stream with [`FluxError::ErrorTrigger`]; a value
//! equal to the completion trigger completes it. Trigger values themselves
//! are not emitted. When a trigger is hit the periodic task is cancelled
//! before the terminal signal is delivered, so no later tick can race it.

use std::{fmt::Debug, sync::Arc};

use super::Source;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
use crate::scheduler::{default_scheduler, ThreadPoolScheduler};
use crate::{
  error::FluxError,
  outlet::Outlet,
  scheduler::{Duration, Scheduler, Task, TaskState},
  sink::BoxSink,
};

pub struct Generate<F, T, S> {
  period: Duration,
  generator: Arc<F>,
  error_on: Option<T>,
  complete_on: Option<T>,
  scheduler: S,
}

pub fn generate_on<F, T, S>(period: Duration, generator: F, scheduler: S) -> Generate<F, T, S>
where
  F: Fn() -> T + Send + Sync + 'static,
  S: Scheduler,
{
  Generate { period, generator: Arc::new(generator), error_on: None, complete_on: None, scheduler }
}

#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub fn generate<F, T>(period: Duration, generator: F) -> Generate<F, T, ThreadPoolScheduler>
where
  F: Fn() -> T + Send + Sync + 'static,
{
  generate_on(period, generator, default_scheduler())
}

impl<F, T, S> Generate<F, T, S> {
  /// Terminates with an error when the generator yields `value`.
  pub fn error_on(mut self, value: T) -> Self {
    self.error_on = Some(value);
    self
  }

  /// Completes when the generator yields `value`.
  pub fn complete_on(mut self, value: T) -> Self {
    self.complete_on = Some(value);
    self
  }
}

struct Tick<F, T> {
  generator: Arc<F>,
  error_on: Option<T>,
  complete_on: Option<T>,
  outlet: Arc<Outlet<T>>,
  period: Duration,
}

impl<F, T> Tick<F, T>
where
  F: Fn() -> T + Send + Sync + 'static,
  T: PartialEq + Debug + Send + 'static,
{
  fn step(&mut self) -> TaskState {
    if self.outlet.is_input_closed() {
      return TaskState::Finished;
    }
    if !self.outlet.has_capacity() {
      return TaskState::Sleeping(self.period);
    }
    let value = (self.generator)();
    if self.error_on.as_ref() == Some(&value) {
      self.outlet.error(FluxError::ErrorTrigger(format!("{value:?}")));
      TaskState::Finished
    } else if self.complete_on.as_ref() == Some(&value) {
      self.outlet.complete();
      TaskState::Finished
    } else {
      self.outlet.offer(value);
      TaskState::Sleeping(self.period)
    }
  }
}

impl<F, T, S> Source for Generate<F, T, S>
where
  F: Fn() -> T + Send + Sync + 'static,
  T: PartialEq + Debug + Clone + Send + Sync + 'static,
  S: Scheduler,
{
  type Item = T;

  fn actual_subscribe(&self, sink: BoxSink<T>) {
    let outlet = Outlet::new("generate");
    outlet.start(sink);

    let tick = Tick {
      generator: self.generator.clone(),
      error_on: self.error_on.clone(),
      complete_on: self.complete_on.clone(),
      outlet: outlet.clone(),
      period: self.period,
    };
    let handle = self
      .scheduler
      .schedule(Task::new(tick, Tick::step), Some(self.period));
    outlet.add_teardown(handle);
  }
}
