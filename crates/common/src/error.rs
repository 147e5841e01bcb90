use thiserror::Error;

/// Result alias for fallible setup operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised while wiring up the notifier (URLs, clients, scheduling).
///
/// Configuration loading reports through `anyhow`. Failures of an individual
/// send never surface here; they are logged and reported through the delivery
/// outcome instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
