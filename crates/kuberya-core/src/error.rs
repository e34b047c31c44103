use thiserror::Error;

/// Top-level error type for Kuberya.
///
/// Subsystem crates define their own error types and convert from this one
/// so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KuberyaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not logged in")]
    NotLoggedIn,
}

impl From<toml::de::Error> for KuberyaError {
    fn from(err: toml::de::Error) -> Self {
        KuberyaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for KuberyaError {
    fn from(err: toml::ser::Error) -> Self {
        KuberyaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for KuberyaError {
    fn from(err: serde_json::Error) -> Self {
        KuberyaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Kuberya operations.
pub type Result<T> = std::result::Result<T, KuberyaError>;
