//! Storage error types

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB error
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Database not open
    #[error("database not open")]
    NotOpen,

    /// Database already open
    #[error("database already open")]
    AlreadyOpen,

    /// Unknown namespace
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Conditional insert hit an existing key
    #[error("key already exists")]
    AlreadyExists,

    /// Key absent where the caller requires presence
    #[error("not found: {0}")]
    NotFound(String),

    /// Value present but not the expected length
    #[error("corrupt value for {what}: expected {expected} bytes, got {got}")]
    Corrupt {
        /// What the value was supposed to be
        what: String,
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        got: usize,
    },

    /// Stored bytes failed to deserialize
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Atomic commit rejected
    #[error("batch commit rejected: {0}")]
    BatchCommit(String),

    /// Address derivation failed
    #[error("address derivation error: {0}")]
    Derivation(#[from] ravel_crypto::CryptoError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
