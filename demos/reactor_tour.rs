//! Example: a tour of rxflux sources and operators on the thread pool.
//!
//! Run with `RUST_LOG=rxflux=debug` to see retries and scheduler activity,
//! or `RUST_LOG=rxflux::log=info` for the `log` operator only.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use rand::Rng;
use rxflux::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rxflux=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  // ==================================================================================
  // 1. Filter and map a finite sequence
  // ==================================================================================
  let names = vec!["Martín Flores", "Bruce Lee", "Liz Gonzales", "Bruce Willis"];
  let bruces = from_iter(names)
    .filter(|name| name.starts_with("Bruce"))
    .map(|name| name.to_uppercase())
    .collect_list()
    .block_last()?;
  println!("bruces: {bruces:?}");

  // ==================================================================================
  // 2. Zip a list with a ticking interval
  // ==================================================================================
  let paced = from_iter(vec!["uno", "dos", "tres"])
    .zip_with(interval(Duration::from_millis(50)), |word, tick| format!("{tick}: {word}"))
    .log("paced")
    .collect_list()
    .block_last()?;
  println!("paced: {paced:?}");

  // ==================================================================================
  // 3. A random generator that ends on a trigger value
  // ==================================================================================
  let generated = generate(Duration::from_millis(20), || rand::thread_rng().gen_range(0..15u32))
    .error_on(5)
    .complete_on(10)
    .collect_list()
    .block_last();
  match generated {
    Ok(values) => println!("generator completed: {values:?}"),
    Err(err) => println!("generator failed: {err}"),
  }

  // ==================================================================================
  // 4. Retry a flaky producer, then slow it down
  // ==================================================================================
  let attempts = Arc::new(AtomicUsize::new(0));
  let c_attempts = attempts.clone();
  let recovered = create(move |emitter| {
    if c_attempts.fetch_add(1, Ordering::SeqCst) < 2 {
      emitter.error(FluxError::msg("connection reset"));
    } else {
      (1..=3).for_each(|v| emitter.next(v));
      emitter.complete();
    }
  })
  .retry(RetryConfig::new().count(3))
  .delay_elements(Duration::from_millis(10))
  .limit_rate(1)
  .collect_list()
  .block_last()?;
  println!("recovered after {} attempts: {recovered:?}", attempts.load(Ordering::SeqCst));

  Ok(())
}
