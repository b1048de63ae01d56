//! # ravel-storage
//!
//! Indexed block storage for RavelLedger.
//!
//! This crate provides:
//! - [`Database`] - namespaced RocksDB wrapper with atomic batch commit
//!   and conditional inserts
//! - [`KvStore`] - the trait seam the DAO is generic over
//! - [`BlockDao`] - the block data-access layer: blocks by hash, hashes by
//!   height, transfer/vote lookups, and per-address enumeration
//! - [`schema`] - the on-disk key layout

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod db;
pub mod error;
pub mod schema;
pub mod traits;

pub use block::{BlockDao, ChainConfig};
pub use db::{Batch, Database, DbConfig};
pub use error::{StorageError, StorageResult};
pub use traits::KvStore;
