//! # ravel-types
//!
//! Core blockchain types for RavelLedger.
//!
//! This crate provides:
//! - [`Block`](block::Block) - Block with header and ordered transfer/vote lists
//! - [`Transfer`](block::Transfer) - Value movement between two addresses
//! - [`Vote`](block::Vote) - Delegation from a voter key to a votee key
//! - [`codec`] - Deterministic binary serialization for all of the above

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod codec;

pub use block::{Block, BlockHeader, Transfer, Vote};
