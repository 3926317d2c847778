use thiserror::Error;

/// Common error type for registrar components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Metadata error for container {container_id}: {message}")]
    Metadata {
        container_id: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a registry error.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Create a metadata error for a specific container.
    pub fn metadata(container_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Metadata {
            container_id: container_id.into(),
            message: msg.into(),
        }
    }
}

/// Result type alias using registrar's Error.
pub type Result<T> = std::result::Result<T, Error>;
