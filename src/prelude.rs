//! Prelude module for convenient imports

pub use crate::{
  error::{FluxError, Result},
  ops::{
    retry::{RetryConfig, RetryPolicy},
    SourceExt,
  },
  scheduler::{Duration, Scheduler, Task, TaskHandle, TaskState, TestScheduler},
  sink::{BoxSink, FnSink, Sink},
  source::{
    create, empty, error, from_callable, from_iter, generate_on, interval_on, just, range, BoxFlux,
    Emitter, Source,
  },
  subscription::{
    CompositeSubscription, Subscription, SubscriptionGuard, SubscriptionLike, UNBOUNDED,
  },
};
#[cfg(all(feature = "futures-scheduler", feature = "timer"))]
pub use crate::{
  scheduler::{default_scheduler, SchedulerConfig, ThreadPoolScheduler},
  source::{generate, interval},
};
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
