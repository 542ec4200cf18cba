//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Viewer buffer must be between 1 and {max}")]
    InvalidViewerBuffer { max: usize },

    #[error("Upstream command is required when source is 'command'")]
    MissingUpstreamCommand,

    #[error("Read chunk size must be greater than zero")]
    InvalidReadChunk,

    #[error("Max buffer size must be at least the read chunk size")]
    BufferSmallerThanChunk,

    #[error("Idle poll interval must be greater than zero")]
    InvalidIdlePoll,

    #[error("Simulated feed interval must be greater than zero")]
    InvalidSimulateInterval,

    #[error("Participant name must not be empty")]
    EmptyParticipantName,
}
