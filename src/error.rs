use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Crate-wide error type.
///
/// Lifecycle and funds errors are recoverable by the caller; storage and
/// deserialization errors are fatal for the in-flight operation, since
/// ledger consistency cannot be assumed after a partial failure.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("No ledger found at {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Corrupted block record: {0}")]
    Deserialization(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Double spend detected for transaction: {0}")]
    DoubleSpend(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
