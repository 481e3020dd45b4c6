//! The demand channel between one producer and one consumer.
//!
//! A [`Subscription`] is handed to a sink in `on_subscribe`. The sink uses it
//! to request more values (`request(n)`) or to stop the stream (`cancel()`).
//! Demand is an unsigned counter where [`UNBOUNDED`] means "no limit";
//! additions saturate at that sentinel.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
  },
};

use crate::rc::lock;

mod arbiter;
mod composite;
pub use arbiter::ArbiterSubscription;
pub use composite::CompositeSubscription;

/// Demand value meaning "deliver everything".
pub const UNBOUNDED: u64 = u64::MAX;

/// Adds two demands, saturating at [`UNBOUNDED`].
#[inline]
pub fn add_cap(a: u64, b: u64) -> u64 { a.saturating_add(b) }

/// Behaviour behind a [`Subscription`] handle.
pub trait SubscriptionLike: Send + Sync {
  /// Adds `n` to the outstanding demand. A no-op once the subscription is
  /// closed.
  fn request(&self, n: u64);

  /// Stops the stream and releases its resources. Idempotent.
  fn cancel(&self);

  /// `true` once cancelled or terminated.
  fn is_closed(&self) -> bool;
}

/// Cloneable handle onto a live subscription.
#[derive(Clone)]
pub struct Subscription(Arc<dyn SubscriptionLike>);

impl Subscription {
  pub fn new<S: SubscriptionLike + 'static>(inner: S) -> Self { Subscription(Arc::new(inner)) }

  /// A subscription that is already closed.
  pub fn empty() -> Self { Subscription(Arc::new(Closed)) }

  /// A subscription whose cancellation runs `teardown` once.
  pub fn from_fn(teardown: impl FnOnce() + Send + 'static) -> Self {
    Subscription::new(ClosureSubscription(Mutex::new(Some(Box::new(teardown)))))
  }

  /// Requests `n` more values. Zero is not a valid demand and is ignored.
  pub fn request(&self, n: u64) {
    if n == 0 {
      tracing::warn!("request(0) ignored: demand must be positive");
      return;
    }
    self.0.request(n);
  }

  pub fn request_unbounded(&self) { self.0.request(UNBOUNDED); }

  pub fn cancel(&self) { self.0.cancel(); }

  pub fn is_closed(&self) -> bool { self.0.is_closed() }

  /// Activates "RAII" behaviour: the returned guard cancels the subscription
  /// when dropped.
  ///
  /// **Attention:** if the guard is not bound to a variable it is dropped,
  /// and the subscription cancelled, immediately.
  pub fn cancel_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(self) }

  pub(crate) fn ptr_eq(&self, other: &Subscription) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<S: SubscriptionLike + 'static> From<Arc<S>> for Subscription {
  fn from(inner: Arc<S>) -> Self { Subscription(inner) }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

struct Closed;

impl SubscriptionLike for Closed {
  fn request(&self, _: u64) {}
  fn cancel(&self) {}
  fn is_closed(&self) -> bool { true }
}

type Teardown = Box<dyn FnOnce() + Send>;

struct ClosureSubscription(Mutex<Option<Teardown>>);

impl SubscriptionLike for ClosureSubscription {
  fn request(&self, _: u64) {}

  fn cancel(&self) {
    let teardown = lock(&self.0).take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  fn is_closed(&self) -> bool { lock(&self.0).is_none() }
}

/// An RAII implementation of a "scoped subscription". When this structure is
/// dropped (falls out of scope), the subscription is cancelled.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
  pub fn new(subscription: Subscription) -> Self { SubscriptionGuard(subscription) }

  pub fn subscription(&self) -> &Subscription { &self.0 }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) { self.0.cancel() }
}

// ============================================================================
// Demand bookkeeping
// ============================================================================

/// Outstanding demand of one subscription.
#[derive(Debug, Default)]
pub(crate) struct DemandCounter(AtomicU64);

impl DemandCounter {
  /// Adds `n`, returning the previous demand.
  pub(crate) fn add(&self, n: u64) -> u64 {
    match self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
      (cur != UNBOUNDED).then(|| add_cap(cur, n))
    }) {
      Ok(prev) | Err(prev) => prev,
    }
  }

  /// Accounts for `n` delivered values. Unbounded demand is never consumed.
  pub(crate) fn produced(&self, n: u64) {
    let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
      (cur != UNBOUNDED).then(|| cur.saturating_sub(n))
    });
  }

  #[inline]
  pub(crate) fn get(&self) -> u64 { self.0.load(Ordering::Acquire) }
}
