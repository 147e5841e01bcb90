use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};

/// Install the process-wide JSON tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_directives`
/// (e.g. `"yppf_notifier=info"`). Fails if a global subscriber is already set.
pub fn init_tracing(default_directives: &str) -> AppResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .try_init()
        .map_err(|e| AppError::Internal(format!("failed to install tracing subscriber: {e}")))
}
