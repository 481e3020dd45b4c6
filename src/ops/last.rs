use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use futures::channel::oneshot;

use crate::{
  error::{FluxError, Result},
  sink::{HandleSink, Sink},
  source::Source,
  subscription::{Subscription, SubscriptionGuard},
};

/// Future of the final value of a stream.
///
/// Resolves to `Ok(None)` for a stream that completes without values.
/// Dropping the future cancels the subscription.
pub struct LastFuture<T> {
  receiver: oneshot::Receiver<Result<Option<T>>>,
  _guard: SubscriptionGuard,
}

impl<T: Send + 'static> LastFuture<T> {
  pub(crate) fn new<S: Source<Item = T>>(source: &S) -> Self {
    let (sender, receiver) = oneshot::channel();
    let (sink, handle) = HandleSink::new(LastSink { last: None, sender: Some(sender) });
    source.actual_subscribe(Box::new(sink));
    LastFuture { receiver, _guard: handle.cancel_when_dropped() }
  }
}

impl<T> Future for LastFuture<T> {
  type Output = Result<Option<T>>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.receiver)
      .poll(cx)
      .map(|received| received.unwrap_or(Err(FluxError::Cancelled)))
  }
}

struct LastSink<T> {
  last: Option<T>,
  sender: Option<oneshot::Sender<Result<Option<T>>>>,
}

impl<T: Send + 'static> Sink<T> for LastSink<T> {
  fn on_subscribe(&mut self, subscription: Subscription) { subscription.request_unbounded(); }

  fn next(&mut self, value: T) { self.last = Some(value); }

  fn error(&mut self, err: FluxError) {
    if let Some(sender) = self.sender.take() {
      let _ = sender.send(Err(err));
    }
  }

  fn complete(&mut self) {
    if let Some(sender) = self.sender.take() {
      let _ = sender.send(Ok(self.last.take()));
    }
  }
}
