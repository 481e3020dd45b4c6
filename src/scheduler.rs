//! Delayed and periodic execution for timer-driven sources and operators.
//!
//! A [`Scheduler`] runs [`Task`]s. A task is a step function returning a
//! [`TaskState`]: `Finished` ends it, `Yield` runs it again as soon as
//! possible and `Sleeping(d)` runs it again after `d`. Every scheduled task
//! is represented by a [`TaskHandle`], which doubles as a [`Subscription`]:
//! cancelling it guarantees the task is not stepped again. A step already
//! running when the cancel is observed finishes, but is never rescheduled.
//!
//! Available schedulers:
//! - [`ThreadPoolScheduler`]: a `futures` thread pool with real-time sleeps
//!   (features `futures-scheduler` + `timer`).
//! - [`TokioScheduler`]: tasks spawned on a tokio runtime (feature
//!   `tokio-scheduler`).
//! - [`TestScheduler`]: virtual time for deterministic tests.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

pub use std::time::Duration;

use crate::subscription::{Subscription, SubscriptionLike};

#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
mod thread_pool_scheduler;
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use thread_pool_scheduler::{SchedulerConfig, ThreadPoolScheduler};

#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

mod test_scheduler;
pub use test_scheduler::TestScheduler;

/// An object that orders tasks and schedules their execution.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// Runs `task` after `delay` (immediately if `None`) and keeps stepping it
  /// as its [`TaskState`] asks.
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle;
}

/// The process-wide scheduler used by the scheduler-less constructors.
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub fn default_scheduler() -> ThreadPoolScheduler { ThreadPoolScheduler::shared() }

// ============================================================================
// Task
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  Finished,
  Yield,
  Sleeping(Duration),
}

type Step = Box<dyn FnMut() -> TaskState + Send>;

/// A unit of work stepped by a [`Scheduler`].
pub struct Task(Step);

impl Task {
  /// A task owning `state`, stepped by `step` until it returns
  /// [`TaskState::Finished`].
  pub fn new<S, F>(mut state: S, mut step: F) -> Self
  where
    S: Send + 'static,
    F: FnMut(&mut S) -> TaskState + Send + 'static,
  {
    Task(Box::new(move || step(&mut state)))
  }

  /// A task that runs `f` once.
  pub fn once(f: impl FnOnce() + Send + 'static) -> Self {
    let mut f = Some(f);
    Task(Box::new(move || {
      if let Some(f) = f.take() {
        f();
      }
      TaskState::Finished
    }))
  }

  #[inline]
  pub fn step(&mut self) -> TaskState { (self.0)() }
}

// ============================================================================
// TaskHandle
// ============================================================================

#[derive(Default)]
struct HandleState {
  cancelled: AtomicBool,
  finished: AtomicBool,
}

/// Handle of a scheduled [`Task`].
#[derive(Clone, Default)]
pub struct TaskHandle(Arc<HandleState>);

impl TaskHandle {
  pub fn new() -> Self { Self::default() }

  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  pub fn mark_finished(&self) { self.0.finished.store(true, Ordering::Release); }

  /// Steps `task` once unless the handle was cancelled; a cancel observed
  /// during the step turns the result into `Finished`.
  pub(crate) fn step(&self, task: &mut Task) -> TaskState {
    if self.is_cancelled() {
      return TaskState::Finished;
    }
    let state = task.step();
    if self.is_cancelled() { TaskState::Finished } else { state }
  }
}

impl SubscriptionLike for TaskHandle {
  fn request(&self, _: u64) {}

  fn cancel(&self) { self.0.cancelled.store(true, Ordering::Release); }

  fn is_closed(&self) -> bool { self.is_cancelled() || self.is_finished() }
}

impl From<TaskHandle> for Subscription {
  fn from(handle: TaskHandle) -> Self { Subscription::new(handle) }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;

  #[rxflux_macro::test]
  fn task_owns_its_state() {
    let mut task = Task::new(0, |n| {
      *n += 1;
      if *n < 2 { TaskState::Yield } else { TaskState::Finished }
    });
    assert_eq!(task.step(), TaskState::Yield);
    assert_eq!(task.step(), TaskState::Finished);
  }

  #[rxflux_macro::test]
  fn cancelled_handle_skips_the_step() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let mut task = Task::once(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    let handle = TaskHandle::new();
    Subscription::from(handle.clone()).cancel();
    assert_eq!(handle.step(&mut task), TaskState::Finished);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(handle.is_closed());
  }

  #[rxflux_macro::test]
  fn cancel_during_step_stops_rescheduling() {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    let mut task = Task::new((), move |_| {
      c_handle.cancel();
      TaskState::Sleeping(Duration::from_millis(10))
    });
    assert_eq!(handle.step(&mut task), TaskState::Finished);
  }
}
