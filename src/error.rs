//! Error type carried by every rxflux stream.
//!
//! Streams share one error type so that operators can forward errors
//! unchanged and so that `retry`, `zip` and `flat_map` can combine sources
//! raised by different producers.

use std::{error::Error as StdError, sync::Arc};

/// The terminal error signal of a stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FluxError {
  /// A value transform rejected its input.
  #[error("invalid value: {0}")]
  InvalidValue(String),

  /// A generator produced its configured error trigger.
  #[error("generator produced its error trigger value {0}")]
  ErrorTrigger(String),

  /// An error raised with a plain message.
  #[error("{0}")]
  Message(String),

  /// A foreign error wrapped for transport through the stream.
  #[error(transparent)]
  Other(Arc<dyn StdError + Send + Sync>),

  /// The stream failed and the consumer supplied no error handler.
  #[error("error callback not implemented for: {0}")]
  ErrorCallbackNotImplemented(Box<FluxError>),

  /// The subscription ended without delivering a terminal signal.
  #[error("subscription was cancelled before it terminated")]
  Cancelled,

  /// A scheduler could not be built.
  #[error("failed to build scheduler: {0}")]
  Scheduler(String),
}

impl FluxError {
  pub fn msg(message: impl Into<String>) -> Self { FluxError::Message(message.into()) }

  pub fn invalid(reason: impl Into<String>) -> Self { FluxError::InvalidValue(reason.into()) }

  pub fn other<E>(err: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    FluxError::Other(Arc::new(err))
  }
}

pub type Result<T, E = FluxError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[rxflux_macro::test]
  fn display_messages() {
    assert_eq!(FluxError::msg("Solo hasta 5").to_string(), "Solo hasta 5");
    assert_eq!(
      FluxError::ErrorTrigger("5".into()).to_string(),
      "generator produced its error trigger value 5"
    );
    let wrapped = FluxError::ErrorCallbackNotImplemented(Box::new(FluxError::invalid("empty")));
    assert_eq!(wrapped.to_string(), "error callback not implemented for: invalid value: empty");
  }

  #[rxflux_macro::test]
  fn wraps_foreign_errors() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
    let err = FluxError::other(io);
    assert_eq!(err.to_string(), "disk gone");
    assert!(matches!(err.clone(), FluxError::Other(_)));
  }
}
