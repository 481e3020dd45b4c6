use std::task::Poll;

use futures::{executor::ThreadPool, future::BoxFuture, FutureExt};
use once_cell::sync::Lazy;

use super::{Duration, Scheduler, Task, TaskHandle, TaskState};
use crate::error::{FluxError, Result};

/// Runtime configuration of a [`ThreadPoolScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  pub pool_size: usize,
  pub name_prefix: String,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    SchedulerConfig {
      pool_size: std::thread::available_parallelism().map_or(4, |n| n.get()),
      name_prefix: "rxflux-".to_owned(),
    }
  }
}

static SHARED: Lazy<ThreadPoolScheduler> = Lazy::new(|| {
  ThreadPoolScheduler::new(SchedulerConfig::default())
    .expect("the shared rxflux thread pool could not be started")
});

/// Runs tasks on a `futures` thread pool; sleeps use `futures-time`.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  pub fn new(config: SchedulerConfig) -> Result<Self> {
    let pool = ThreadPool::builder()
      .pool_size(config.pool_size.max(1))
      .name_prefix(config.name_prefix)
      .create()
      .map_err(|e| FluxError::Scheduler(e.to_string()))?;
    Ok(ThreadPoolScheduler { pool })
  }

  /// The lazily built process-wide pool.
  pub fn shared() -> Self { SHARED.clone() }
}

async fn sleep(duration: Duration) {
  futures_time::task::sleep(futures_time::time::Duration::from(duration)).await;
}

/// Gives the worker back to the pool once and asks to be polled again.
async fn yield_now() {
  let mut yielded = false;
  futures::future::poll_fn(|cx| {
    if yielded {
      Poll::Ready(())
    } else {
      yielded = true;
      cx.waker().wake_by_ref();
      Poll::Pending
    }
  })
  .await
}

fn run(mut task: Task, handle: TaskHandle, delay: Option<Duration>) -> BoxFuture<'static, ()> {
  async move {
    if let Some(delay) = delay {
      sleep(delay).await;
    }
    loop {
      match handle.step(&mut task) {
        TaskState::Finished => break,
        TaskState::Yield => yield_now().await,
        TaskState::Sleeping(duration) => sleep(duration).await,
      }
    }
    handle.mark_finished();
  }
  .boxed()
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    tracing::debug!(?delay, "thread pool task scheduled");
    self.pool.spawn_ok(run(task, handle.clone(), delay));
    handle
  }
}
