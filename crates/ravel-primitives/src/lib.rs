//! # ravel-primitives
//!
//! Primitive types for the RavelLedger blockchain.
//!
//! This crate provides the fundamental data types shared by the type,
//! crypto, and storage layers.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{HashError, H256};

/// Block height type
pub type BlockHeight = u64;

/// Transfer/vote nonce type
pub type Nonce = u64;
