//! Error type shared by every stage of the balance simulation.

use thiserror::Error;

/// Errors raised while building a scenario or operating on time series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid or incomplete scenario configuration.
    #[error("config error: {field}: {message}")]
    Config {
        /// Dotted field path (e.g., `"consumers.power"`).
        field: String,
        /// Human-readable constraint description.
        message: String,
    },

    /// Arithmetic attempted between series with different timestamps.
    #[error("alignment error: {0}")]
    Alignment(String),

    /// Ill-defined numeric operation (e.g., scaling a zero-average curve).
    #[error("domain error: {0}")]
    Domain(String),

    /// A series was constructed from malformed input.
    #[error("invalid series: {0}")]
    InvalidSeries(String),
}

impl Error {
    /// Creates a [`Error::Config`] for the given field path.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the field path when this is a configuration error.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
