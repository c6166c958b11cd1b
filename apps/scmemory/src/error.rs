//! Errors surfaced by the command-line client.

use scmemory_core::ScMemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration file could not be read.
    #[error("Cannot read config {path}: {message}")]
    ConfigIo { path: String, message: String },

    /// The configuration file is not valid TOML for `ClientConfig`.
    #[error("Invalid config: {0}")]
    ConfigParse(String),

    /// A configuration value is out of range.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    /// A command argument could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Memory(#[from] ScMemoryError),
}
