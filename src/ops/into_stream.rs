use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
  Stream,
};

use crate::{
  error::{FluxError, Result},
  sink::{HandleSink, Sink},
  source::Source,
  subscription::{Subscription, SubscriptionGuard},
};

/// A `Stream` over a source's values, requesting one value per poll.
///
/// An error is yielded as the final item. Dropping the stream cancels the
/// subscription.
pub struct FluxStream<T> {
  receiver: UnboundedReceiver<Result<T>>,
  guard: SubscriptionGuard,
  requested: bool,
  finished: bool,
}

impl<T: Send + 'static> FluxStream<T> {
  pub(crate) fn new<S: Source<Item = T>>(source: &S) -> Self {
    let (sender, receiver) = unbounded();
    let (sink, handle) = HandleSink::new(StreamSink { sender: Some(sender) });
    source.actual_subscribe(Box::new(sink));
    FluxStream { receiver, guard: handle.cancel_when_dropped(), requested: false, finished: false }
  }
}

impl<T> Stream for FluxStream<T> {
  type Item = Result<T>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    if self.finished {
      return Poll::Ready(None);
    }
    if !self.requested {
      self.requested = true;
      self.guard.subscription().request(1);
    }
    match Pin::new(&mut self.receiver).poll_next(cx) {
      Poll::Ready(Some(item)) => {
        self.requested = false;
        self.finished = item.is_err();
        Poll::Ready(Some(item))
      }
      Poll::Ready(None) => {
        self.finished = true;
        Poll::Ready(None)
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

struct StreamSink<T> {
  sender: Option<UnboundedSender<Result<T>>>,
}

impl<T: Send + 'static> Sink<T> for StreamSink<T> {
  fn on_subscribe(&mut self, _: Subscription) {}

  fn next(&mut self, value: T) {
    if let Some(sender) = &self.sender {
      let _ = sender.unbounded_send(Ok(value));
    }
  }

  fn error(&mut self, err: FluxError) {
    if let Some(sender) = self.sender.take() {
      let _ = sender.unbounded_send(Err(err));
    }
  }

  fn complete(&mut self) { self.sender = None; }
}
