//! Error types for sync operations

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Node answered with an error status or an unexpected body
    #[error("Node error: {0}")]
    Node(String),

    /// Block or one of its transactions could not be fetched
    #[error("Retrieval error at height {height}: {reason}")]
    Retrieval {
        /// Height being fetched
        height: i64,
        /// Last underlying failure
        reason: String,
    },

    /// Sync error
    #[error("Sync error: {0}")]
    Sync(String),

    /// Payload could not be decoded or transformed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation cancelled
    #[error("Cancelled")]
    Cancelled,

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<exporter_core::Error> for Error {
    fn from(e: exporter_core::Error) -> Self {
        match e {
            exporter_core::Error::Store(msg) => Error::Storage(msg),
            other => Error::Decode(format!("{}", other)),
        }
    }
}

impl From<exporter_storage_sqlite::Error> for Error {
    fn from(e: exporter_storage_sqlite::Error) -> Self {
        Error::Storage(format!("{}", e))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Sync(format!("task failed: {}", e))
    }
}
