use tokio::runtime::Handle;

use super::{Duration, Scheduler, Task, TaskHandle, TaskState};
use crate::error::{FluxError, Result};

/// Spawns tasks on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
  runtime: Handle,
}

impl TokioScheduler {
  pub fn new(runtime: Handle) -> Self { TokioScheduler { runtime } }

  /// Uses the runtime the caller is running on.
  pub fn current() -> Result<Self> {
    Handle::try_current()
      .map(Self::new)
      .map_err(|e| FluxError::Scheduler(e.to_string()))
  }
}

impl Scheduler for TokioScheduler {
  fn schedule(&self, mut task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    tracing::debug!(?delay, "tokio task scheduled");
    self.runtime.spawn(async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      loop {
        match c_handle.step(&mut task) {
          TaskState::Finished => break,
          TaskState::Yield => tokio::task::yield_now().await,
          TaskState::Sleeping(duration) => tokio::time::sleep(duration).await,
        }
      }
      c_handle.mark_finished();
    });
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;
  use crate::subscription::SubscriptionLike;

  #[rxflux_macro::test(shared)]
  async fn steps_until_finished() {
    let scheduler = TokioScheduler::current().unwrap();
    let ticks = Arc::new(AtomicUsize::new(0));
    let handle = scheduler.schedule(
      Task::new(ticks.clone(), |ticks| {
        if ticks.fetch_add(1, Ordering::SeqCst) < 2 {
          TaskState::Sleeping(Duration::from_millis(1))
        } else {
          TaskState::Finished
        }
      }),
      Some(Duration::from_millis(1)),
    );
    while !handle.is_closed() {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
  }
}
