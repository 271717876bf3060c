//! Unified error types for prerun

use thiserror::Error;

/// Unified error type for all prerun operations
#[derive(Error, Debug)]
pub enum PrerunError {
    // Provider set errors
    #[error("No cvs provider found")]
    NoProviders,

    #[error("Provider discovery has not completed yet")]
    NotReady,

    #[error("Providers were already discovered for this session")]
    AlreadyDiscovered,

    // Branch errors
    #[error("No branch name was collected")]
    NoBranch,

    #[error(
        "There is more than one git branch ({}), this case is currently unsupported",
        .0.join(", ")
    )]
    AmbiguousBranch(Vec<String>),

    // Command errors
    #[error("Failed to execute {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed (`{command}`): {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Parse error: {0}")]
    Parse(String),

    // Model errors
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Commit failed for: {}", .0.join(", "))]
    CommitFailed(Vec<String>),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using PrerunError
pub type Result<T> = std::result::Result<T, PrerunError>;
