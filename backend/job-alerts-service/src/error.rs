//! Error types for the job alerts service.

use thiserror::Error;

use crate::services::push_sender::PushError;
use crate::store::StoreError;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised inside handlers, the registry and startup.
///
/// None of these reach the trigger infrastructure: handler boundaries turn
/// them into a logged [`crate::services::HandlerOutcome::Failed`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Document store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Push dispatch failed
    #[error("Push error: {0}")]
    Push(#[from] PushError),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Trigger envelope could not be interpreted
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
