//! Error types for the regression orchestrator.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nvme_regress.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Test catalog errors (bad bits, duplicate names)
    #[error("Registry error: {0}")]
    Registry(String),

    /// A child process could not be started
    #[error("Failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    /// The device tool rejected a command
    #[error("Device error: {opcode}: {message}")]
    Device { opcode: String, message: String },

    /// Bandwidth encoding/decoding errors
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] Box<std::io::Error>),

    /// A settings file that is not valid JSON for [`crate::config::Config`]
    #[error("Failed to parse settings file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: Box<serde_json::Error>,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry(message.into())
    }

    /// Create a spawn error.
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a device error.
    pub fn device(opcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            opcode: opcode.into(),
            message: message.into(),
        }
    }

    /// Create a settings parse error for `path`.
    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Box::new(value))
    }
}
