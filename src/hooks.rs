//! Process-wide hooks for errors no consumer handled.
//!
//! A stream error that reaches a consumer without an error callback, or an
//! error raised after the subscription already terminated, must not vanish.
//! The first kind goes to the unhandled-error hook, which logs at `error`
//! level unless an application installs its own; the second kind is logged
//! at `debug` level.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::FluxError;

type Hook = Arc<dyn Fn(&FluxError) + Send + Sync>;

static UNHANDLED_ERROR_HOOK: Lazy<RwLock<Option<Hook>>> = Lazy::new(|| RwLock::new(None));

/// Installs `hook` as the receiver of unhandled stream errors.
pub fn set_unhandled_error_hook(hook: impl Fn(&FluxError) + Send + Sync + 'static) {
  let mut slot = UNHANDLED_ERROR_HOOK
    .write()
    .unwrap_or_else(|e| e.into_inner());
  *slot = Some(Arc::new(hook));
}

/// Restores the default hook, which logs the error.
pub fn reset_unhandled_error_hook() {
  let mut slot = UNHANDLED_ERROR_HOOK
    .write()
    .unwrap_or_else(|e| e.into_inner());
  *slot = None;
}

pub(crate) fn on_error_unhandled(err: FluxError) {
  let hook = UNHANDLED_ERROR_HOOK
    .read()
    .unwrap_or_else(|e| e.into_inner())
    .clone();
  match hook {
    Some(hook) => hook(&err),
    None => tracing::error!(error = %err, "unhandled stream error"),
  }
}

pub(crate) fn on_error_dropped(err: &FluxError) {
  tracing::debug!(error = %err, "error dropped: subscription already terminated");
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  #[rxflux_macro::test]
  fn installed_hook_receives_errors() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    set_unhandled_error_hook(move |e| c_seen.lock().unwrap().push(e.to_string()));

    on_error_unhandled(FluxError::msg("hook-test-marker"));
    reset_unhandled_error_hook();
    on_error_unhandled(FluxError::msg("after reset"));

    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|m| m == "hook-test-marker"));
    assert!(!seen.iter().any(|m| m == "after reset"));
  }
}
