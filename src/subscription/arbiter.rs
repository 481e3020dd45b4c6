//! A subscription whose upstream can be swapped while demand is preserved.
//!
//! `retry` hands one arbiter to its downstream and re-points it at every new
//! upstream attempt; the outstanding demand (requested minus produced) is
//! replayed onto the new upstream. Requests or a cancel that arrive before
//! the first upstream is set are remembered and applied when it arrives.

use std::sync::{Arc, Mutex};

use super::{add_cap, Subscription, SubscriptionLike, UNBOUNDED};
use crate::rc::lock;

#[derive(Clone, Default)]
pub struct ArbiterSubscription(Arc<Mutex<ArbiterState>>);

#[derive(Default)]
struct ArbiterState {
  current: Option<Subscription>,
  requested: u64,
  cancelled: bool,
}

impl ArbiterSubscription {
  /// Switches to `upstream` and requests the outstanding demand from it.
  pub fn set(&self, upstream: Subscription) {
    let outstanding = {
      let mut state = lock(&self.0);
      if state.cancelled {
        None
      } else {
        state.current = Some(upstream.clone());
        Some(state.requested)
      }
    };
    match outstanding {
      None => upstream.cancel(),
      Some(0) => {}
      Some(n) => upstream.request(n),
    }
  }

  /// Accounts for `n` values received from the current upstream.
  pub fn produced(&self, n: u64) {
    let mut state = lock(&self.0);
    if state.requested != UNBOUNDED {
      state.requested = state.requested.saturating_sub(n);
    }
  }

  pub fn outstanding(&self) -> u64 { lock(&self.0).requested }
}

impl SubscriptionLike for ArbiterSubscription {
  fn request(&self, n: u64) {
    let current = {
      let mut state = lock(&self.0);
      if state.cancelled {
        return;
      }
      state.requested = add_cap(state.requested, n);
      state.current.clone()
    };
    if let Some(current) = current {
      current.request(n);
    }
  }

  fn cancel(&self) {
    let current = {
      let mut state = lock(&self.0);
      if state.cancelled {
        return;
      }
      state.cancelled = true;
      state.current.take()
    };
    if let Some(current) = current {
      current.cancel();
    }
  }

  fn is_closed(&self) -> bool {
    let state = lock(&self.0);
    state.cancelled || state.current.as_ref().is_some_and(Subscription::is_closed)
  }
}

impl From<ArbiterSubscription> for Subscription {
  fn from(arbiter: ArbiterSubscription) -> Self { Subscription::new(arbiter) }
}
