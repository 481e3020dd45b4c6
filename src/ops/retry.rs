//! Retry operator implementation
//!
//! `retry` resubscribes to its source when it errors, as long as the
//! [`RetryPolicy`] allows. Each attempt starts the source from scratch;
//! values delivered before an error stay delivered.
//!
//! ```rust
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! use rxflux::prelude::*;
//!
//! let attempts = Arc::new(AtomicUsize::new(0));
//! let c_attempts = attempts.clone();
//! let source = create(move |emitter| {
//!   if c_attempts.fetch_add(1, Ordering::SeqCst) < 2 {
//!     emitter.error(FluxError::msg("flaky"));
//!   } else {
//!     emitter.next(1);
//!     emitter.complete();
//!   }
//! });
//!
//! assert_eq!(source.retry(3).block_last().unwrap(), Some(1));
//! assert_eq!(attempts.load(Ordering::SeqCst), 3);
//! ```
//!
//! Advanced retry with `RetryConfig`:
//!
//! ```rust
//! use rxflux::ops::retry::RetryConfig;
//!
//! let config = RetryConfig::new().count(5).reset_on_success();
//! ```

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  error::FluxError,
  outlet::Outlet,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::{ArbiterSubscription, Subscription},
};

/// Policy for determining whether to retry an error.
///
/// Plain counts (`usize`) and [`RetryConfig`] are provided; implement the
/// trait for policies that look at the error itself.
///
/// ```rust
/// use rxflux::{ops::retry::RetryPolicy, FluxError};
///
/// #[derive(Clone)]
/// struct OnlyTransient;
///
/// impl RetryPolicy for OnlyTransient {
///   fn should_retry(&self, err: &FluxError, attempt: usize) -> bool {
///     attempt < 3 && !matches!(err, FluxError::InvalidValue(_))
///   }
/// }
/// ```
pub trait RetryPolicy: Clone + Send + Sync + 'static {
  /// Whether to resubscribe after `err`.
  ///
  /// `attempt` is the number of retries already made: 0 for the first
  /// error, 1 for the second, and so on.
  fn should_retry(&self, err: &FluxError, attempt: usize) -> bool;

  /// Whether a delivered value resets the attempt counter to 0.
  fn reset_on_success(&self) -> bool { false }
}

impl RetryPolicy for usize {
  fn should_retry(&self, _err: &FluxError, attempt: usize) -> bool { attempt < *self }
}

/// A configuration struct for Retry.
#[derive(Debug, Clone, Default)]
pub struct RetryConfig {
  count: Option<usize>,
  reset_on_success: bool,
}

impl RetryConfig {
  /// Retries forever, without resetting.
  pub fn new() -> Self { Self::default() }

  /// Sets the maximum number of retries: `count(3)` allows up to 4
  /// subscriptions in total.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  /// Resets the retry count whenever a value is delivered, so a source
  /// that keeps making progress between failures is retried indefinitely.
  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }
}

impl RetryPolicy for RetryConfig {
  fn should_retry(&self, _err: &FluxError, attempt: usize) -> bool {
    self.count.map_or(true, |count| attempt < count)
  }

  fn reset_on_success(&self) -> bool { self.reset_on_success }
}

/// The Retry operator struct.
pub struct Retry<S, P> {
  source: Arc<S>,
  policy: P,
}

impl<S, P: Clone> Clone for Retry<S, P> {
  fn clone(&self) -> Self { Retry { source: self.source.clone(), policy: self.policy.clone() } }
}

impl<S, P> Retry<S, P> {
  pub(crate) fn new(source: S, policy: P) -> Self { Retry { source: Arc::new(source), policy } }
}

/// Per-subscription state shared by every attempt.
struct RetryRun<S: Source, P> {
  source: Arc<S>,
  policy: P,
  outlet: Arc<Outlet<S::Item>>,
  arbiter: ArbiterSubscription,
  attempts: AtomicUsize,
  wip: AtomicUsize,
}

impl<S: Source, P: RetryPolicy> RetryRun<S, P> {
  /// Subscribes to the next attempt. Attempts that fail synchronously are
  /// run in a loop instead of recursively.
  fn subscribe_next(self: &Arc<Self>) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    loop {
      if self.outlet.is_input_closed() {
        break;
      }
      self
        .source
        .actual_subscribe(Box::new(RetrySink { run: self.clone() }));
      if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
        break;
      }
    }
  }
}

struct RetrySink<S: Source, P> {
  run: Arc<RetryRun<S, P>>,
}

impl<S: Source, P: RetryPolicy> Sink<S::Item> for RetrySink<S, P> {
  fn on_subscribe(&mut self, subscription: Subscription) { self.run.arbiter.set(subscription); }

  fn next(&mut self, value: S::Item) {
    self.run.arbiter.produced(1);
    if self.run.policy.reset_on_success() {
      self.run.attempts.store(0, Ordering::Release);
    }
    self.run.outlet.push(value);
  }

  fn error(&mut self, err: FluxError) {
    let attempt = self.run.attempts.fetch_add(1, Ordering::AcqRel);
    if self.run.policy.should_retry(&err, attempt) {
      tracing::debug!(attempt = attempt + 1, error = %err, "retry: resubscribing");
      self.run.subscribe_next();
    } else {
      tracing::warn!(retries = attempt, error = %err, "retry: giving up");
      self.run.outlet.error(err);
    }
  }

  fn complete(&mut self) { self.run.outlet.complete(); }
}

impl<S: Source, P: RetryPolicy> Source for Retry<S, P> {
  type Item = S::Item;

  fn actual_subscribe(&self, sink: BoxSink<S::Item>) {
    let outlet = Outlet::new("retry");
    let arbiter = ArbiterSubscription::default();
    outlet.forward_demand(arbiter.clone().into());
    outlet.add_teardown(arbiter.clone());
    outlet.start(sink);

    let run = Arc::new(RetryRun {
      source: self.source.clone(),
      policy: self.policy.clone(),
      outlet,
      arbiter,
      attempts: AtomicUsize::new(0),
      wip: AtomicUsize::new(0),
    });
    run.subscribe_next();
  }
}
