//! The consumer side of a stream.
//!
//! A [`Sink`] receives, in order: exactly one `on_subscribe`, then any number
//! of `next` calls bounded by the demand it requested, then at most one of
//! `error` or `complete`. Producers guarantee these calls never overlap for
//! one subscription.

use crate::{
  error::FluxError,
  hooks,
  subscription::{ArbiterSubscription, Subscription},
};

/// Sink trait: the consumer of a stream.
pub trait Sink<Item>: Send + 'static {
  /// Receives the demand channel before any other signal. Nothing is
  /// delivered until the sink requests it, unless it already did.
  fn on_subscribe(&mut self, subscription: Subscription);

  /// Receive the next value.
  fn next(&mut self, value: Item);

  /// Receive the terminal error. No further signal follows.
  fn error(&mut self, err: FluxError);

  /// Receive the completion signal. No further signal follows.
  fn complete(&mut self);
}

pub type BoxSink<Item> = Box<dyn Sink<Item>>;

impl<Item, S> Sink<Item> for Box<S>
where
  S: Sink<Item> + ?Sized,
{
  #[inline]
  fn on_subscribe(&mut self, subscription: Subscription) { (**self).on_subscribe(subscription) }

  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: FluxError) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }
}

// ============================================================================
// FnSink - Closure adapter
// ============================================================================

type NextFn<Item> = Box<dyn FnMut(Item) + Send>;
type ErrorFn = Box<dyn FnMut(FluxError) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;

/// Closure-backed sink that requests unbounded demand on subscribe.
///
/// Without an error closure, a stream error is surfaced through the
/// unhandled-error hook as [`FluxError::ErrorCallbackNotImplemented`].
pub struct FnSink<Item> {
  next: NextFn<Item>,
  error: Option<ErrorFn>,
  complete: Option<CompleteFn>,
}

impl<Item> FnSink<Item> {
  pub fn new(next: impl FnMut(Item) + Send + 'static) -> Self {
    FnSink { next: Box::new(next), error: None, complete: None }
  }

  pub fn on_error(mut self, error: impl FnMut(FluxError) + Send + 'static) -> Self {
    self.error = Some(Box::new(error));
    self
  }

  pub fn on_complete(mut self, complete: impl FnMut() + Send + 'static) -> Self {
    self.complete = Some(Box::new(complete));
    self
  }
}

impl<Item: 'static> Sink<Item> for FnSink<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) { subscription.request_unbounded(); }

  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: FluxError) {
    match self.error.as_mut() {
      Some(error) => error(err),
      None => hooks::on_error_unhandled(FluxError::ErrorCallbackNotImplemented(Box::new(err))),
    }
  }

  fn complete(&mut self) {
    if let Some(complete) = self.complete.as_mut() {
      complete();
    }
  }
}

// ============================================================================
// HandleSink - exposes the subscription to the caller of `subscribe`
// ============================================================================

/// Wraps a sink so the subscription it receives is also reachable through
/// `handle`, which is returned to whoever called `subscribe`.
pub(crate) struct HandleSink<S> {
  inner: S,
  handle: ArbiterSubscription,
}

impl<S> HandleSink<S> {
  pub(crate) fn new(inner: S) -> (Self, Subscription) {
    let handle = ArbiterSubscription::default();
    (HandleSink { inner, handle: handle.clone() }, handle.into())
  }
}

impl<Item, S: Sink<Item>> Sink<Item> for HandleSink<S> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.handle.set(subscription.clone());
    self.inner.on_subscribe(subscription);
  }

  #[inline]
  fn next(&mut self, value: Item) { self.inner.next(value) }

  #[inline]
  fn error(&mut self, err: FluxError) { self.inner.error(err) }

  #[inline]
  fn complete(&mut self) { self.inner.complete() }
}
