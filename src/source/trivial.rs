use std::{marker::PhantomData, sync::Arc};

use super::Source;
use crate::{
  error::{FluxError, Result},
  outlet::{Outlet, Pull, Pulled},
  sink::BoxSink,
};

/// Signals the same error to every subscriber.
pub struct ErrorSource<T> {
  err: FluxError,
  _item: PhantomData<fn() -> T>,
}

/// Creates a source that terminates every subscription with `err`.
pub fn error<T: Send + 'static>(err: FluxError) -> ErrorSource<T> {
  ErrorSource { err, _item: PhantomData }
}

impl<T: Send + 'static> Source for ErrorSource<T> {
  type Item = T;

  fn actual_subscribe(&self, sink: BoxSink<T>) {
    let outlet = Outlet::new("error");
    outlet.error(self.err.clone());
    outlet.start(sink);
  }
}

/// Runs a fallible factory on the first request of each subscription.
pub struct FromCallable<F> {
  factory: Arc<F>,
}

/// Creates a source that invokes `factory` lazily, once per subscription,
/// and emits its value or signals its error.
pub fn from_callable<F, T>(factory: F) -> FromCallable<F>
where
  F: Fn() -> Result<T> + Send + Sync + 'static,
  T: Send + 'static,
{
  FromCallable { factory: Arc::new(factory) }
}

struct CallablePull<F>(Option<Arc<F>>);

impl<F, T> Pull<T> for CallablePull<F>
where
  F: Fn() -> Result<T> + Send + Sync + 'static,
  T: Send + 'static,
{
  fn pull(&mut self) -> Pulled<T> {
    match self.0.take() {
      Some(factory) => match factory() {
        Ok(value) => Pulled::Last(value),
        Err(err) => Pulled::Failed(err),
      },
      None => Pulled::Done,
    }
  }
}

impl<F, T> Source for FromCallable<F>
where
  F: Fn() -> Result<T> + Send + Sync + 'static,
  T: Send + 'static,
{
  type Item = T;

  fn actual_subscribe(&self, sink: BoxSink<T>) {
    Outlet::with_pull("from_callable", CallablePull(Some(self.factory.clone()))).start(sink);
  }
}
