use super::Source;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
use crate::scheduler::{default_scheduler, ThreadPoolScheduler};
use crate::{
  outlet::Outlet,
  scheduler::{Duration, Scheduler, Task, TaskState},
  sink::BoxSink,
};

/// Emits `0, 1, 2, …` once per period until cancelled.
#[derive(Clone)]
pub struct Interval<S> {
  period: Duration,
  scheduler: S,
}

/// An interval ticking on `scheduler`. The first value arrives one period
/// after subscribing.
///
/// A tick that finds no outstanding demand is skipped without consuming a
/// number, so delivered values stay contiguous.
pub fn interval_on<S: Scheduler>(period: Duration, scheduler: S) -> Interval<S> {
  Interval { period, scheduler }
}

/// An interval ticking on the shared thread pool.
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub fn interval(period: Duration) -> Interval<ThreadPoolScheduler> {
  interval_on(period, default_scheduler())
}

impl<S: Scheduler> Source for Interval<S> {
  type Item = u64;

  fn actual_subscribe(&self, sink: BoxSink<u64>) {
    let outlet = Outlet::new("interval");
    outlet.start(sink);

    let period = self.period;
    let c_outlet = outlet.clone();
    let handle = self.scheduler.schedule(
      Task::new(0u64, move |seq| {
        if c_outlet.is_input_closed() {
          return TaskState::Finished;
        }
        if c_outlet.offer(*seq) {
          *seq += 1;
        }
        TaskState::Sleeping(period)
      }),
      Some(period),
    );
    outlet.add_teardown(handle);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[rxflux_macro::test]
  fn ticks_once_per_period() {
    TestScheduler::init();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    let subscription = interval_on(Duration::from_millis(100), TestScheduler)
      .subscribe(move |v| c_seen.lock().unwrap().push(v));

    TestScheduler::advance_by(Duration::from_millis(99));
    assert!(seen.lock().unwrap().is_empty());
    TestScheduler::advance_by(Duration::from_millis(301));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);

    subscription.cancel();
    TestScheduler::flush();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    assert!(TestScheduler::is_empty());
  }

  #[rxflux_macro::test]
  fn skipped_ticks_keep_numbers_contiguous() {
    TestScheduler::init();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Collect { seen: seen.clone(), subscription: None };
    let subscription = interval_on(Duration::from_millis(10), TestScheduler).subscribe_with(sink);

    TestScheduler::advance_by(Duration::from_millis(50));
    assert!(seen.lock().unwrap().is_empty());

    subscription.request(2);
    TestScheduler::advance_by(Duration::from_millis(50));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);

    subscription.request(1);
    TestScheduler::advance_by(Duration::from_millis(10));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    subscription.cancel();
  }

  struct Collect {
    seen: Arc<Mutex<Vec<u64>>>,
    subscription: Option<Subscription>,
  }

  impl Sink<u64> for Collect {
    fn on_subscribe(&mut self, subscription: Subscription) { self.subscription = Some(subscription); }
    fn next(&mut self, value: u64) { self.seen.lock().unwrap().push(value); }
    fn error(&mut self, _: FluxError) {}
    fn complete(&mut self) {}
  }
}
