//! Virtual-time scheduler for deterministic tests of timer-driven code.
//!
//! Time only moves when a test says so, and due tasks run synchronously on
//! the calling thread inside [`TestScheduler::advance_by`] or
//! [`TestScheduler::flush`].
//!
//! ```rust
//! use rxflux::prelude::*;
//!
//! TestScheduler::init();
//! let seen = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! let ticks = interval_on(Duration::from_millis(100), TestScheduler)
//!   .subscribe(move |v| c_seen.lock().unwrap().push(v));
//!
//! TestScheduler::advance_by(Duration::from_millis(250));
//! assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
//! ticks.cancel();
//! ```
//!
//! The state is thread-local: every test thread has its own clock and task
//! queue, so tests running in parallel stay isolated.

use std::{cell::RefCell, collections::BTreeMap};

use super::{Duration, Scheduler, Task, TaskHandle, TaskState};

// ==================== Timeline ====================

/// Due time first, then registration order, so tasks due at the same
/// instant run first-in first-out.
type Slot = (Duration, u64);

#[derive(Default)]
struct Timeline {
  now: Duration,
  seq: u64,
  queue: BTreeMap<Slot, (Task, TaskHandle)>,
  ready: bool,
}

impl Timeline {
  fn insert(&mut self, delay: Duration, task: Task, handle: TaskHandle) {
    let slot = (self.now + delay, self.seq);
    self.seq += 1;
    self.queue.insert(slot, (task, handle));
  }

  /// Removes the earliest task due no later than `limit` and moves the
  /// clock to its due time.
  fn pop_due(&mut self, limit: Option<Duration>) -> Option<(Task, TaskHandle)> {
    let (&(due, _), _) = self.queue.first_key_value()?;
    if limit.is_some_and(|limit| due > limit) {
      return None;
    }
    let ((due, _), entry) = self.queue.pop_first()?;
    self.now = due;
    Some(entry)
  }
}

thread_local! {
  static TIMELINE: RefCell<Timeline> = RefCell::new(Timeline::default());
}

fn with_timeline<R>(f: impl FnOnce(&mut Timeline) -> R) -> R {
  TIMELINE.with(|timeline| {
    let mut timeline = timeline.borrow_mut();
    assert!(timeline.ready, "TestScheduler::init() must be called before using the scheduler");
    f(&mut timeline)
  })
}

// ==================== TestScheduler ====================

/// A virtual time scheduler for deterministic testing.
///
/// Zero-sized: every instance on a thread shares that thread's clock and
/// queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestScheduler;

impl TestScheduler {
  /// Resets the virtual clock to zero and drops every pending task. Call it
  /// at the start of each test.
  pub fn init() {
    TIMELINE.with(|timeline| {
      *timeline.borrow_mut() = Timeline { ready: true, ..Timeline::default() };
    });
  }

  /// # Panics
  ///
  /// Panics if `init()` has not been called first.
  pub fn now() -> Duration { with_timeline(|t| t.now) }

  pub fn pending_count() -> usize { with_timeline(|t| t.queue.len()) }

  pub fn is_empty() -> bool { with_timeline(|t| t.queue.is_empty()) }

  /// Advances virtual time by `duration`, running every task that becomes
  /// due in time order (FIFO for tasks due at the same instant).
  pub fn advance_by(duration: Duration) {
    let target = with_timeline(|t| t.now + duration);
    Self::run_until(Some(target));
    with_timeline(|t| t.now = target);
  }

  /// Runs every pending task, jumping the clock to each task's due time.
  /// A task that keeps rescheduling itself runs until it finishes or is
  /// cancelled.
  pub fn flush() { Self::run_until(None); }

  fn run_until(limit: Option<Duration>) {
    // The timeline is not borrowed while a task steps: it may schedule more.
    while let Some((mut task, handle)) = with_timeline(|t| t.pop_due(limit)) {
      match handle.step(&mut task) {
        TaskState::Finished => handle.mark_finished(),
        TaskState::Yield => with_timeline(|t| t.insert(Duration::ZERO, task, handle)),
        TaskState::Sleeping(period) => with_timeline(|t| t.insert(period, task, handle)),
      }
    }
  }
}

impl Scheduler for TestScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    with_timeline(|t| t.insert(delay.unwrap_or_default(), task, handle.clone()));
    handle
  }
}
