//! The emission engine shared by every producer.
//!
//! An [`Outlet`] owns the downstream sink of one subscription together with
//! its demand counter, a buffer of values not yet requested, and the
//! resources (timers, upstream subscriptions) to release when the
//! subscription ends. Values reach it in one of two ways:
//!
//! - **push**: producers call [`Outlet::push`] / [`Outlet::offer`] from any
//!   thread; values wait in the buffer until demand arrives.
//! - **pull**: the outlet asks its [`Pull`] for the next value whenever the
//!   buffer is empty and demand is outstanding.
//!
//! Delivery to the sink happens in a single emission loop guarded by a
//! work-in-progress counter: whichever thread increments it from zero
//! drains, every other caller only records that more work is pending. This
//! serializes `on_subscribe`, `next`, `error` and `complete` for the
//! subscription and makes re-entrant calls (a sink requesting more from
//! inside `next`) safe without recursion.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
  },
};

use once_cell::sync::OnceCell;

use crate::{
  error::FluxError,
  hooks,
  rc::lock,
  sink::BoxSink,
  subscription::{CompositeSubscription, DemandCounter, Subscription, SubscriptionLike},
};

/// Result of asking a [`Pull`] for its next value.
pub(crate) enum Pulled<T> {
  Value(T),
  /// The final value; completion follows it without further demand.
  Last(T),
  /// Nothing available yet; the producer calls [`Outlet::signal`] later.
  Pending,
  Done,
  Failed(FluxError),
}

pub(crate) trait Pull<T>: Send + 'static {
  /// Called only from the emission loop and only while demand is
  /// outstanding. Implementations must not hold their own locks while
  /// calling into an upstream subscription.
  fn pull(&mut self) -> Pulled<T>;
}

enum Terminal {
  Complete,
  Error(FluxError),
}

enum Step<T> {
  Next(T),
  Pull,
  Terminal(Terminal),
  Idle,
}

struct Input<T> {
  queue: VecDeque<T>,
  terminal: Option<Terminal>,
  closed: bool,
}

struct Emission<T> {
  sink: Option<BoxSink<T>>,
  pull: Option<Box<dyn Pull<T>>>,
}

pub(crate) struct Outlet<T> {
  name: &'static str,
  demand: DemandCounter,
  wip: AtomicUsize,
  cancelled: AtomicBool,
  input_closed: AtomicBool,
  done: AtomicBool,
  input: Mutex<Input<T>>,
  emission: Mutex<Emission<T>>,
  pending: Mutex<Option<(BoxSink<T>, Subscription)>>,
  teardown: CompositeSubscription,
  forward: OnceCell<Subscription>,
}

impl<T: Send + 'static> Outlet<T> {
  pub(crate) fn new(name: &'static str) -> Arc<Self> { Self::build(name, None) }

  pub(crate) fn with_pull(name: &'static str, pull: impl Pull<T>) -> Arc<Self> {
    Self::build(name, Some(Box::new(pull)))
  }

  fn build(name: &'static str, pull: Option<Box<dyn Pull<T>>>) -> Arc<Self> {
    Arc::new(Outlet {
      name,
      demand: DemandCounter::default(),
      wip: AtomicUsize::new(0),
      cancelled: AtomicBool::new(false),
      input_closed: AtomicBool::new(false),
      done: AtomicBool::new(false),
      input: Mutex::new(Input { queue: VecDeque::new(), terminal: None, closed: false }),
      emission: Mutex::new(Emission { sink: None, pull }),
      pending: Mutex::new(None),
      teardown: CompositeSubscription::default(),
      forward: OnceCell::new(),
    })
  }

  /// Attaches the downstream sink. `on_subscribe` is delivered from the
  /// emission loop, before any value or terminal signal.
  pub(crate) fn start(self: &Arc<Self>, sink: BoxSink<T>) {
    *lock(&self.pending) = Some((sink, self.subscription()));
    self.drain();
  }

  pub(crate) fn subscription(self: &Arc<Self>) -> Subscription { Subscription::from(self.clone()) }

  /// Buffers `value` for delivery. Ignored once a terminal signal was
  /// accepted or the subscription was cancelled.
  pub(crate) fn push(&self, value: T) {
    {
      let mut input = lock(&self.input);
      if input.closed || self.cancelled.load(Ordering::Acquire) {
        return;
      }
      input.queue.push_back(value);
    }
    self.drain();
  }

  /// Buffers `value` only if it can be delivered right away, that is if
  /// demand exceeds the values already buffered. Returns whether it was
  /// accepted.
  pub(crate) fn offer(&self, value: T) -> bool {
    {
      let mut input = lock(&self.input);
      if input.closed
        || self.cancelled.load(Ordering::Acquire)
        || self.demand.get() <= input.queue.len() as u64
      {
        return false;
      }
      input.queue.push_back(value);
    }
    self.drain();
    true
  }

  /// Whether an [`offer`](Self::offer) made now would be accepted.
  pub(crate) fn has_capacity(&self) -> bool {
    let input = lock(&self.input);
    !input.closed
      && !self.cancelled.load(Ordering::Acquire)
      && self.demand.get() > input.queue.len() as u64
  }

  pub(crate) fn error(&self, err: FluxError) { self.finish(Terminal::Error(err)); }

  pub(crate) fn complete(&self) { self.finish(Terminal::Complete); }

  /// Re-runs the emission loop, for pull producers whose data changed.
  pub(crate) fn signal(&self) { self.drain(); }

  /// Registers a resource released when the subscription terminates or is
  /// cancelled.
  pub(crate) fn add_teardown(&self, subscription: impl Into<Subscription>) {
    self.teardown.add(subscription);
  }

  /// Forwards every downstream request to `upstream` as well. Must be set
  /// before [`start`](Self::start).
  pub(crate) fn forward_demand(&self, upstream: Subscription) {
    if self.forward.set(upstream).is_err() {
      tracing::warn!(outlet = self.name, "demand forwarding already configured");
    }
  }

  /// `true` once the outlet stopped accepting values.
  pub(crate) fn is_input_closed(&self) -> bool {
    self.input_closed.load(Ordering::Acquire) || self.cancelled.load(Ordering::Acquire)
  }

  /// Accepts the first terminal signal: releases the teardowns before the
  /// signal is delivered, so no timer can fire into a finished stream.
  fn finish(&self, terminal: Terminal) {
    if !self.close_input(terminal) {
      return;
    }
    self.teardown.cancel();
    self.drain();
  }

  fn close_input(&self, terminal: Terminal) -> bool {
    let mut input = lock(&self.input);
    if input.closed || self.cancelled.load(Ordering::Acquire) {
      if let Terminal::Error(err) = &terminal {
        hooks::on_error_dropped(err);
      }
      return false;
    }
    input.closed = true;
    input.terminal = Some(terminal);
    self.input_closed.store(true, Ordering::Release);
    true
  }

  fn drain(&self) {
    if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
      return;
    }
    let mut missed = 1;
    loop {
      self.emit();
      missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
      if missed == 0 {
        break;
      }
    }
  }

  fn emit(&self) {
    let mut emission = lock(&self.emission);
    if emission.sink.is_none() {
      if self.done.load(Ordering::Acquire) {
        return;
      }
      let Some((mut sink, subscription)) = lock(&self.pending).take() else {
        return;
      };
      sink.on_subscribe(subscription);
      emission.sink = Some(sink);
    }

    loop {
      if self.cancelled.load(Ordering::Acquire) {
        emission.sink = None;
        emission.pull = None;
        lock(&self.input).queue.clear();
        return;
      }

      let step = {
        let mut input = lock(&self.input);
        let has_demand = self.demand.get() > 0;
        if !input.queue.is_empty() {
          if has_demand {
            self.demand.produced(1);
            input.queue.pop_front().map_or(Step::Idle, Step::Next)
          } else {
            Step::Idle
          }
        } else if let Some(terminal) = input.terminal.take() {
          Step::Terminal(terminal)
        } else if has_demand && !input.closed && emission.pull.is_some() {
          Step::Pull
        } else {
          Step::Idle
        }
      };

      match step {
        Step::Idle => return,
        Step::Next(value) => {
          if let Some(sink) = emission.sink.as_mut() {
            sink.next(value);
          }
        }
        Step::Pull => {
          let pulled = emission
            .pull
            .as_mut()
            .map_or(Pulled::Pending, |pull| pull.pull());
          match pulled {
            Pulled::Value(value) => {
              self.demand.produced(1);
              if let Some(sink) = emission.sink.as_mut() {
                sink.next(value);
              }
            }
            Pulled::Last(value) => {
              self.demand.produced(1);
              self.close_input(Terminal::Complete);
              if let Some(sink) = emission.sink.as_mut() {
                sink.next(value);
              }
            }
            Pulled::Pending => return,
            Pulled::Done => {
              self.close_input(Terminal::Complete);
            }
            Pulled::Failed(err) => {
              self.close_input(Terminal::Error(err));
            }
          }
        }
        Step::Terminal(terminal) => {
          self.done.store(true, Ordering::Release);
          emission.pull = None;
          let sink = emission.sink.take();
          drop(emission);
          self.teardown.cancel();
          if let Some(mut sink) = sink {
            match terminal {
              Terminal::Complete => {
                tracing::trace!(outlet = self.name, "complete");
                sink.complete();
              }
              Terminal::Error(err) => {
                tracing::trace!(outlet = self.name, error = %err, "error");
                sink.error(err);
              }
            }
          }
          return;
        }
      }
    }
  }
}

impl<T: Send + 'static> SubscriptionLike for Outlet<T> {
  fn request(&self, n: u64) {
    if self.is_closed() {
      return;
    }
    tracing::trace!(outlet = self.name, n, "request");
    self.demand.add(n);
    if let Some(upstream) = self.forward.get() {
      upstream.request(n);
    }
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    tracing::trace!(outlet = self.name, "cancel");
    self.teardown.cancel();
    self.drain();
  }

  fn is_closed(&self) -> bool {
    self.cancelled.load(Ordering::Acquire) || self.done.load(Ordering::Acquire)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sink::Sink;

  #[derive(Default)]
  struct Events(Vec<String>);

  /// Records every signal and requests `initial` on subscribe.
  struct Recorder {
    events: crate::rc::MutArc<Events>,
    initial: u64,
    subscription: Option<Subscription>,
  }

  impl Sink<i32> for Recorder {
    fn on_subscribe(&mut self, subscription: Subscription) {
      self.events.rc_deref_mut().0.push("subscribe".into());
      if self.initial > 0 {
        subscription.request(self.initial);
      }
      self.subscription = Some(subscription);
    }
    fn next(&mut self, value: i32) { self.events.rc_deref_mut().0.push(format!("next {value}")); }
    fn error(&mut self, err: FluxError) {
      self.events.rc_deref_mut().0.push(format!("error {err}"));
    }
    fn complete(&mut self) { self.events.rc_deref_mut().0.push("complete".into()); }
  }

  fn recorder(initial: u64) -> (Box<Recorder>, crate::rc::MutArc<Events>) {
    let events = crate::rc::MutArc::own(Events::default());
    (Box::new(Recorder { events: events.clone(), initial, subscription: None }), events)
  }

  #[rxflux_macro::test]
  fn buffers_until_demand() {
    let outlet = Outlet::new("test");
    let (sink, events) = recorder(0);
    outlet.start(sink);
    outlet.push(1);
    outlet.push(2);
    outlet.complete();
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe"]);

    outlet.subscription().request(1);
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe", "next 1"]);

    outlet.subscription().request(5);
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe", "next 1", "next 2", "complete"]);
    assert!(outlet.is_closed());
  }

  #[rxflux_macro::test]
  fn first_terminal_wins() {
    let outlet = Outlet::new("test");
    let (sink, events) = recorder(10);
    outlet.start(sink);
    outlet.error(FluxError::msg("first"));
    outlet.complete();
    outlet.error(FluxError::msg("second"));
    outlet.push(3);
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe", "error first"]);
  }

  #[rxflux_macro::test]
  fn offer_respects_capacity() {
    let outlet = Outlet::new("test");
    let (sink, events) = recorder(1);
    outlet.start(sink);
    assert!(outlet.offer(1));
    assert!(!outlet.has_capacity());
    assert!(!outlet.offer(2));
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe", "next 1"]);
  }

  #[rxflux_macro::test]
  fn cancel_releases_teardown_and_drops_buffer() {
    let outlet = Outlet::new("test");
    let timer = Subscription::from_fn(|| {});
    outlet.add_teardown(timer.clone());
    let (sink, events) = recorder(0);
    outlet.start(sink);
    outlet.push(1);

    let subscription = outlet.subscription();
    subscription.cancel();
    subscription.cancel();
    subscription.request(1);
    outlet.complete();
    assert!(timer.is_closed());
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe"]);
  }

  struct Countdown(i32);

  impl Pull<i32> for Countdown {
    fn pull(&mut self) -> Pulled<i32> {
      if self.0 == 0 {
        Pulled::Done
      } else {
        self.0 -= 1;
        Pulled::Value(self.0)
      }
    }
  }

  #[rxflux_macro::test]
  fn pull_is_driven_by_demand() {
    let outlet = Outlet::with_pull("test", Countdown(3));
    let (sink, events) = recorder(2);
    outlet.start(sink);
    assert_eq!(events.rc_deref_mut().0, vec!["subscribe", "next 2", "next 1"]);
    outlet.subscription().request(2);
    assert_eq!(
      events.rc_deref_mut().0,
      vec!["subscribe", "next 2", "next 1", "next 0", "complete"]
    );
  }
}
