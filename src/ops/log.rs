use std::{fmt::Debug, sync::Arc};

use crate::{
  error::FluxError,
  sink::{BoxSink, Sink},
  source::Source,
  subscription::{Subscription, SubscriptionLike},
};

#[derive(Clone)]
pub struct Log<S> {
  source: S,
  category: Arc<str>,
}

impl<S> Log<S> {
  pub(crate) fn new(source: S, category: String) -> Self {
    Log { source, category: category.into() }
  }
}

impl<S> Source for Log<S>
where
  S: Source,
  S::Item: Debug,
{
  type Item = S::Item;

  fn actual_subscribe(&self, sink: BoxSink<S::Item>) {
    self
      .source
      .actual_subscribe(Box::new(LogSink { downstream: sink, category: self.category.clone() }));
  }
}

struct LogSink<T> {
  downstream: BoxSink<T>,
  category: Arc<str>,
}

impl<T: Debug + Send + 'static> Sink<T> for LogSink<T> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    tracing::info!(target: "rxflux::log", category = %self.category, "on_subscribe");
    self.downstream.on_subscribe(Subscription::new(LoggedSubscription {
      inner: subscription,
      category: self.category.clone(),
    }))
  }

  fn next(&mut self, value: T) {
    tracing::info!(target: "rxflux::log", category = %self.category, value = ?value, "on_next");
    self.downstream.next(value)
  }

  fn error(&mut self, err: FluxError) {
    tracing::info!(target: "rxflux::log", category = %self.category, error = %err, "on_error");
    self.downstream.error(err)
  }

  fn complete(&mut self) {
    tracing::info!(target: "rxflux::log", category = %self.category, "on_complete");
    self.downstream.complete()
  }
}

struct LoggedSubscription {
  inner: Subscription,
  category: Arc<str>,
}

impl SubscriptionLike for LoggedSubscription {
  fn request(&self, n: u64) {
    if n == crate::subscription::UNBOUNDED {
      tracing::info!(target: "rxflux::log", category = %self.category, "request(unbounded)");
    } else {
      tracing::info!(target: "rxflux::log", category = %self.category, n, "request");
    }
    self.inner.request(n)
  }

  fn cancel(&self) {
    tracing::info!(target: "rxflux::log", category = %self.category, "cancel");
    self.inner.cancel()
  }

  fn is_closed(&self) -> bool { self.inner.is_closed() }
}
