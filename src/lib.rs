//! # rxflux: backpressured reactive streams
//!
//! A pull-based publish/subscribe engine for asynchronous sequences. A
//! consumer subscribes a [`Sink`] to a [`Source`], receives a
//! [`Subscription`] and requests values from it; producers never deliver
//! more values than were requested, and every subscription ends with at
//! most one terminal signal.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxflux::prelude::*;
//!
//! let names = vec!["Martín Flores", "Bruce Lee", "Liz Gonzales", "Bruce Willis"];
//! let bruces = from_iter(names)
//!   .filter(|name| name.starts_with("Bruce"))
//!   .map(|name| name.to_uppercase())
//!   .collect_list()
//!   .block_last()
//!   .unwrap();
//! assert_eq!(bruces, Some(vec!["BRUCE LEE".to_owned(), "BRUCE WILLIS".to_owned()]));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Source`] | A restartable producer; every subscription is an independent run |
//! | [`Sink`] | Consumes `on_subscribe`, `next`, `error` and `complete` |
//! | [`Subscription`] | Demand channel: `request(n)` and `cancel()` |
//! | [`Scheduler`] | Delayed and periodic tasks for timer-driven sources |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): thread-pool scheduler on `futures`.
//! - **`timer`** (default): real-time sleeps through `futures-time`.
//! - **`tokio-scheduler`**: tasks spawned on a tokio runtime.
//!
//! [`Source`]: source::Source
//! [`Sink`]: sink::Sink
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler

pub mod error;
pub mod hooks;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod subscription;

mod outlet;

pub use error::{FluxError, Result};
pub use prelude::*;
