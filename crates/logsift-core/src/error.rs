//! Error types for LogSift

/// Result type alias using LogSift's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for LogSift operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing required fields in a request or batch
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The LLM completion service failed (network, quota, malformed response)
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Classifier execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,
}

impl Error {
    /// Create a new invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new service-unavailable error
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
