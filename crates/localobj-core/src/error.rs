use std::time::Duration;
use thiserror::Error;

/// Error types for local object store lifecycle operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to create store data directory: {0}")]
    DataDir(#[source] std::io::Error),

    #[error("Failed to start store process `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store did not become ready within {0:?}")]
    PollTimeout(Duration),

    #[error("store already started")]
    AlreadyStarted,

    #[error("store not started")]
    NotStarted,

    #[error("Failed to send SIGTERM to store process: {0}")]
    Signal(String),

    #[error("Error waiting for store process to exit: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to allocate a free port: {0}")]
    PortAllocation(#[source] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<derive_builder::UninitializedFieldError> for StoreError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        StoreError::Configuration(format!("`{}` cannot be empty", e.field_name()))
    }
}
