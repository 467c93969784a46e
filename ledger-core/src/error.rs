//! Error types for the ledger

use crate::types::{TxnId, UserId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed id, non-positive amount, self-transfer
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TxnId),

    /// Duplicate creation of a record that is written once
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Password did not match the stored credential
    #[error("Unauthorized")]
    Unauthorized,

    /// Admin secret did not match
    #[error("Forbidden")]
    Forbidden,

    /// Transfer would drive the source balance negative
    #[error("Insufficient funds for user {0}")]
    InsufficientFunds(UserId),

    /// Lock wait exceeded the configured bound
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transient store contention (busy, deadlock, try again)
    #[error("Store contention: {0}")]
    Contention(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored bytes could not be decoded
    #[error("Corrupted record: {0}")]
    Corruption(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    Hashing,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error taxonomy shared with the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad request input
    InvalidArgument,
    /// Unknown user or transaction
    NotFound,
    /// Duplicate creation
    AlreadyExists,
    /// Credential mismatch
    Unauthorized,
    /// Admin secret mismatch
    Forbidden,
    /// Balance would go negative
    InsufficientFunds,
    /// Writer lock not acquired in time
    Timeout,
    /// Store contention or I/O failure
    Unavailable,
    /// Corruption, configuration, or other internal failure
    Internal,
}

impl ErrorKind {
    /// Stable label, used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::UserNotFound(_) | Error::TransactionNotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::Unauthorized => ErrorKind::Unauthorized,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Contention(_) | Error::Storage(_) | Error::Io(_) => ErrorKind::Unavailable,
            Error::Corruption(_) | Error::Serialization(_) | Error::Hashing | Error::Config(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether re-running the whole operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Contention(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        use rocksdb::ErrorKind as Status;

        match err.kind() {
            Status::TimedOut => Error::Timeout(err.into_string()),
            Status::Busy | Status::TryAgain => Error::Contention(err.into_string()),
            _ => Error::Storage(err.into_string()),
        }
    }
}
