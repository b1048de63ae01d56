//! # ravel-crypto
//!
//! Cryptographic primitives for RavelLedger.
//!
//! - Keccak-256 hashing
//! - Address derivation from public keys

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{derive_address, PUBLIC_KEY_LEN};
pub use error::CryptoError;
pub use hash::keccak256;
