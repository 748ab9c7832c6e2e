//! rawvmdk error types

use thiserror::Error;

/// The main error type for rawvmdk operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading the source device or writing outputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device does not carry a recognizable partition table
    #[error("Invalid partition table: {0}")]
    Format(String),

    /// A GPT signature is present but the table is internally inconsistent
    #[error("Malformed GPT: {0}")]
    MalformedGpt(String),

    /// A requested partition identifier cannot be resolved
    #[error("Cannot resolve partition: {0}")]
    PartSpec(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type alias for rawvmdk operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid partition table error
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a malformed GPT error
    pub fn malformed_gpt(msg: impl Into<String>) -> Self {
        Error::MalformedGpt(msg.into())
    }

    /// Create a partition specification error
    pub fn part_spec(msg: impl Into<String>) -> Self {
        Error::PartSpec(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }
}
