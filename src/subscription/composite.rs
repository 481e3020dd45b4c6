//! A group of subscriptions cancelled together.
//!
//! Producers register every resource tied to one subscription here (timer
//! handles, upstream subscriptions, inner subscriptions of `flat_map`).
//! Cancelling the group cancels every member; members added after the group
//! was cancelled are cancelled on the spot.

use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use super::{Subscription, SubscriptionLike};
use crate::rc::lock;

#[derive(Clone, Default)]
pub struct CompositeSubscription(Arc<Mutex<Inner>>);

#[derive(Default)]
struct Inner {
  closed: bool,
  teardown: SmallVec<[Subscription; 2]>,
}

impl CompositeSubscription {
  pub fn add(&self, subscription: impl Into<Subscription>) {
    let subscription = subscription.into();
    let mut inner = lock(&self.0);
    if inner.closed {
      drop(inner);
      subscription.cancel();
    } else {
      inner.teardown.retain(|v| !v.is_closed());
      inner.teardown.push(subscription);
    }
  }

  /// Forgets `subscription` without cancelling it.
  pub fn remove(&self, subscription: &Subscription) {
    lock(&self.0)
      .teardown
      .retain(|v| !v.ptr_eq(subscription));
  }

  pub fn teardown_size(&self) -> usize { lock(&self.0).teardown.len() }
}

impl SubscriptionLike for CompositeSubscription {
  fn request(&self, _: u64) {}

  fn cancel(&self) {
    let teardown = {
      let mut inner = lock(&self.0);
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for subscription in teardown {
      subscription.cancel();
    }
  }

  fn is_closed(&self) -> bool { lock(&self.0).closed }
}

impl From<CompositeSubscription> for Subscription {
  fn from(composite: CompositeSubscription) -> Self { Subscription::new(composite) }
}
