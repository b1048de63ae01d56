//! Cryptographic errors

use thiserror::Error;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Public key has the wrong length
    #[error("invalid public key length: expected {expected} bytes, got {got}")]
    InvalidPublicKey {
        /// Required number of bytes
        expected: usize,
        /// Number of bytes actually supplied
        got: usize,
    },
}
