//! Error types for the stride_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for stride_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid static input (negative duration, malformed activity)
    #[error("Input error: {0}")]
    Input(String),

    /// Validation error (unknown workout type, malformed plan request)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested plan length cannot satisfy minimum phase durations
    #[error("Insufficient time: {goal} requires at least {required} weeks, {available} available")]
    InsufficientTime {
        goal: String,
        required: usize,
        available: usize,
    },

    /// State management error
    #[error("State error: {0}")]
    State(String),

    /// Plan construction/apply error
    #[error("Plan error: {0}")]
    Plan(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
