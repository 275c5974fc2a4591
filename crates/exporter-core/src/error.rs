//! Error types for the exporter domain

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Domain errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid bech32 address or prefix
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid integer or decimal amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Payload could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Account type the transformer does not know how to value
    #[error("Unrecognized account type: {0}")]
    UnknownAccountKind(String),

    /// Store failure surfaced through a store trait
    #[error("Store error: {0}")]
    Store(String),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
