//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `EtlError`.
pub type EtlResult<T> = Result<T, EtlError>;

/// Application error taxonomy for a pipeline run.
///
/// Only `Connectivity` errors are retried; everything else either fails the
/// run (`Database`, `Config`) or is accumulated as a per-record rejection by
/// the caller (`Referential`, `Shape`).
#[derive(Debug, Error)]
pub enum EtlError {
    /// Transient failure reaching a source or the warehouse.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Non-transient database error (failed statement or commit).
    #[error("Database error: {0}")]
    Database(String),

    /// A fact references a dimension that could not be resolved.
    #[error("Referential error for document '{source_doc_id}': {message}")]
    Referential {
        /// Originating source document identifier.
        source_doc_id: String,
        /// What could not be resolved.
        message: String,
    },

    /// A raw record is missing a mandatory field.
    #[error("Malformed record: {0}")]
    Shape(String),

    /// A source file could not be read or parsed.
    #[error("Source error: {0}")]
    Source(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Returns true if the operation may succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Returns true if the error fails the whole run (as opposed to a
    /// single-record rejection).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connectivity(_) | Self::Database(_) | Self::Config(_)
        )
    }
}

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Source(err.to_string())
    }
}
