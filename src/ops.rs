//! Operators and consumption modes, available on every [`Source`] through
//! [`SourceExt`].

use std::{fmt::Debug, sync::Arc};

use crate::{
  error::{FluxError, Result},
  scheduler::{Duration, Scheduler},
  sink::{FnSink, HandleSink, Sink},
  source::{BoxFlux, Source},
  subscription::Subscription,
};

pub mod collect;
pub mod delay;
pub mod filter;
pub mod flat_map;
pub mod into_stream;
pub mod last;
pub mod limit_rate;
pub mod log;
pub mod map;
pub mod peek;
pub mod retry;
pub mod zip;

use collect::CollectList;
use delay::DelayElements;
use filter::Filter;
use flat_map::FlatMap;
use into_stream::FluxStream;
use last::LastFuture;
use limit_rate::LimitRate;
use log::Log;
use map::{Map, TryMap};
use peek::Peek;
use retry::{Retry, RetryPolicy};
use zip::Zip;

/// Default number of inner sources `flat_map` runs at once.
pub const DEFAULT_FLAT_MAP_CONCURRENCY: usize = 256;

/// Default number of values `zip` requests ahead from each side.
pub const DEFAULT_ZIP_PREFETCH: usize = 32;

pub trait SourceExt: Source + Sized {
  // ==================== Transformations ====================

  /// Creates a new stream which calls a closure on each element and uses
  /// its return as the value.
  fn map<B, F>(self, f: F) -> Map<Self, F>
  where
    F: Fn(Self::Item) -> B + Send + Sync + 'static,
    B: Send + 'static,
  {
    Map::new(self, f)
  }

  /// Like [`map`](Self::map), but an `Err` cancels the upstream and ends the
  /// stream with that error.
  fn try_map<B, F>(self, f: F) -> TryMap<Self, F>
  where
    F: Fn(Self::Item) -> Result<B> + Send + Sync + 'static,
    B: Send + 'static,
  {
    TryMap::new(self, f)
  }

  /// Emits only the values for which `predicate` returns `true`. Every
  /// dropped value is replaced by a request for one more upstream value, so
  /// the consumer still receives as many values as it asked for.
  fn filter<F>(self, predicate: F) -> Filter<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    Filter::new(self, predicate)
  }

  /// Maps each value to a source and merges the inner sources. Values of
  /// one inner source keep their order; values of different inner sources
  /// may interleave.
  fn flat_map<R, F>(self, f: F) -> FlatMap<Self, F>
  where
    F: Fn(Self::Item) -> R + Send + Sync + 'static,
    R: Source,
  {
    FlatMap::new(self, f, DEFAULT_FLAT_MAP_CONCURRENCY)
  }

  /// [`flat_map`](Self::flat_map) with at most `concurrency` inner sources
  /// subscribed at once.
  fn flat_map_with_concurrency<R, F>(self, f: F, concurrency: usize) -> FlatMap<Self, F>
  where
    F: Fn(Self::Item) -> R + Send + Sync + 'static,
    R: Source,
  {
    FlatMap::new(self, f, concurrency)
  }

  /// Pairs the n-th value of `self` with the n-th value of `other` and
  /// combines them. Completes once either side has completed and has no
  /// buffered value left; the other side is then cancelled.
  fn zip_with<B, R, F>(self, other: B, combiner: F) -> Zip<Self, B, F>
  where
    B: Source,
    F: Fn(Self::Item, B::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
  {
    Zip::new(self, other, combiner, DEFAULT_ZIP_PREFETCH)
  }

  /// [`zip_with`](Self::zip_with) requesting `prefetch` values ahead from
  /// each side.
  fn zip_with_prefetch<B, R, F>(self, other: B, combiner: F, prefetch: usize) -> Zip<Self, B, F>
  where
    B: Source,
    F: Fn(Self::Item, B::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
  {
    Zip::new(self, other, combiner, prefetch)
  }

  /// [`zip_with`](Self::zip_with) emitting tuples.
  #[allow(clippy::type_complexity)]
  fn zip<B>(self, other: B) -> Zip<Self, B, fn(Self::Item, B::Item) -> (Self::Item, B::Item)>
  where
    B: Source,
  {
    Zip::new(self, other, |a, b| (a, b), DEFAULT_ZIP_PREFETCH)
  }

  /// Re-emits every value `delay` after it was received, one at a time.
  #[cfg(all(feature = "futures-scheduler", feature = "timer"))]
  fn delay_elements(
    self, delay: Duration,
  ) -> DelayElements<Self, crate::scheduler::ThreadPoolScheduler> {
    DelayElements::new(self, delay, crate::scheduler::default_scheduler())
  }

  /// [`delay_elements`](Self::delay_elements) with timers on `scheduler`.
  fn delay_elements_on<S: Scheduler>(self, delay: Duration, scheduler: S) -> DelayElements<Self, S> {
    DelayElements::new(self, delay, scheduler)
  }

  /// Splits the consumer's demand into upstream requests of at most `n`.
  fn limit_rate(self, n: usize) -> LimitRate<Self> { LimitRate::new(self, n) }

  /// Resubscribes to the source after an error, as long as `policy` allows.
  /// Values delivered before an error are not replayed.
  fn retry<P: RetryPolicy>(self, policy: P) -> Retry<Self, P> { Retry::new(self, policy) }

  // ==================== Side effects ====================

  fn do_on_next<F>(self, f: F) -> Peek<Self>
  where
    F: Fn(&Self::Item) + Send + Sync + 'static,
  {
    Peek::on_next(self, f)
  }

  fn do_on_error<F>(self, f: F) -> Peek<Self>
  where
    F: Fn(&FluxError) + Send + Sync + 'static,
  {
    Peek::on_error(self, f)
  }

  fn do_on_complete<F>(self, f: F) -> Peek<Self>
  where
    F: Fn() + Send + Sync + 'static,
  {
    Peek::on_complete(self, f)
  }

  /// Runs `f` when the stream completes or fails.
  fn do_on_terminate<F>(self, f: F) -> Peek<Self>
  where
    F: Fn() + Send + Sync + 'static,
  {
    Peek::on_terminate(self, f)
  }

  /// Records every signal and every request or cancel as `info` events
  /// under the `rxflux::log` target.
  fn log(self, category: impl Into<String>) -> Log<Self>
  where
    Self::Item: Debug,
  {
    Log::new(self, category.into())
  }

  // ==================== Aggregation ====================

  /// Emits every value as one `Vec` when the source completes.
  fn collect_list(self) -> CollectList<Self> { CollectList::new(self) }

  fn boxed(self) -> BoxFlux<Self::Item> { Arc::new(self) }

  // ==================== Consumption ====================

  /// Consumes every value with `next`. An error goes to the unhandled-error
  /// hook.
  fn subscribe<N>(&self, next: N) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_with(FnSink::new(next))
  }

  fn subscribe_err<N, E>(&self, next: N, error: E) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(FluxError) + Send + 'static,
  {
    self.subscribe_with(FnSink::new(next).on_error(error))
  }

  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(FluxError) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_with(FnSink::new(next).on_error(error).on_complete(complete))
  }

  /// Subscribes `sink`, which drives demand itself from `on_subscribe`.
  /// The returned handle controls the same subscription.
  fn subscribe_with<K: Sink<Self::Item>>(&self, sink: K) -> Subscription {
    let (sink, handle) = HandleSink::new(sink);
    self.actual_subscribe(Box::new(sink));
    handle
  }

  /// Resolves to the final value (`None` for an empty stream). Dropping the
  /// future cancels the subscription.
  fn last(&self) -> LastFuture<Self::Item> { LastFuture::new(self) }

  /// Blocks the calling thread until the stream terminates.
  fn block_last(&self) -> Result<Option<Self::Item>> { futures::executor::block_on(self.last()) }

  /// Adapts the source into a `Stream` requesting one value per poll.
  fn into_stream(self) -> FluxStream<Self::Item> { FluxStream::new(&self) }
}

impl<S: Source> SourceExt for S {}
