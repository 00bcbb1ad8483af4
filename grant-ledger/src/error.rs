//! Error types for the grant ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Monetary argument is not a valid non-negative decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Non-monetary argument is empty or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Create called with an identifier that already exists
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// Referenced actor, expenditure or reimbursement is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Settlement would break `Spent <= Awarded` or `Reimbursed <= Committed`
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Index list failed to deserialize (strict mode only)
    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    /// Expenditure was already approved when a release was requested
    #[error("Expenditure already released: {0}")]
    AlreadyReleased(String),

    /// Settlement kind other than `spend` or `fund`
    #[error("Unknown transaction kind: {0}")]
    UnknownTransactionKind(String),

    /// Storage error (RocksDB or adapter)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writer task unavailable (mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
