use std::{iter::Peekable, ops::RangeInclusive};

use super::Source;
use crate::{
  error::{FluxError, Result},
  outlet::{Outlet, Pull, Pulled},
  sink::BoxSink,
};

/// Replays the values of an iterable, in order, on every subscription.
#[derive(Clone)]
pub struct FromIter<I>(I);

/// Creates a source that replays `iter`; the iterable is cloned for each
/// subscription so every subscriber starts from the first element.
pub fn from_iter<I>(iter: I) -> FromIter<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
{
  FromIter(iter)
}

/// A source of exactly one value.
pub fn just<T>(value: T) -> FromIter<Option<T>>
where
  T: Clone + Send + Sync + 'static,
{
  FromIter(Some(value))
}

/// A source that completes without emitting.
pub fn empty<T>() -> FromIter<Option<T>>
where
  T: Clone + Send + Sync + 'static,
{
  FromIter(None)
}

/// `count` consecutive integers starting at `start`.
///
/// A range whose last value would not fit in an `i64` fails every
/// subscription with [`FluxError::InvalidValue`] instead of emitting a
/// shorter sequence.
pub fn range(start: i64, count: usize) -> IntRange {
  let bounds = match count {
    0 => Ok(RangeInclusive::new(1, 0)),
    _ => i64::try_from(count - 1)
      .ok()
      .and_then(|offset| start.checked_add(offset))
      .map(|end| start..=end)
      .ok_or_else(|| FluxError::invalid(format!("range({start}, {count}) overflows i64"))),
  };
  IntRange(bounds)
}

/// Source returned by [`range`].
#[derive(Clone)]
pub struct IntRange(Result<RangeInclusive<i64>>);

impl Source for IntRange {
  type Item = i64;

  fn actual_subscribe(&self, sink: BoxSink<i64>) {
    match &self.0 {
      Ok(bounds) => FromIter(bounds.clone()).actual_subscribe(sink),
      Err(err) => {
        let outlet = Outlet::new("range");
        outlet.error(err.clone());
        outlet.start(sink);
      }
    }
  }
}

struct IterPull<It: Iterator>(Peekable<It>);

impl<It> Pull<It::Item> for IterPull<It>
where
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
{
  fn pull(&mut self) -> Pulled<It::Item> {
    match self.0.next() {
      Some(value) if self.0.peek().is_none() => Pulled::Last(value),
      Some(value) => Pulled::Value(value),
      None => Pulled::Done,
    }
  }
}

impl<I> Source for FromIter<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
{
  type Item = I::Item;

  fn actual_subscribe(&self, sink: BoxSink<Self::Item>) {
    let mut iter = self.0.clone().into_iter().peekable();
    if iter.peek().is_none() {
      let outlet = Outlet::new("from_iter");
      outlet.complete();
      outlet.start(sink);
    } else {
      Outlet::with_pull("from_iter", IterPull(iter)).start(sink);
    }
  }
}
