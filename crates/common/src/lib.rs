pub mod config;
pub mod error;
pub mod hasher;
pub mod telemetry;
pub mod urls;

pub use error::{AppError, AppResult};
