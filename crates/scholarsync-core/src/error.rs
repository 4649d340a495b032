use thiserror::Error;

/// Top-level error type for the ScholarSync system.
///
/// Subsystem crates define their own error types where they need richer
/// detail and convert into `ScholarError` at crate boundaries so that the
/// `?` operator works across them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScholarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Model service error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ScholarError {
    fn from(err: toml::de::Error) -> Self {
        ScholarError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ScholarError {
    fn from(err: toml::ser::Error) -> Self {
        ScholarError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ScholarError {
    fn from(err: serde_json::Error) -> Self {
        ScholarError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ScholarSync operations.
pub type Result<T> = std::result::Result<T, ScholarError>;
