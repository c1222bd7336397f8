//! # keel-primitives
//!
//! Fixed-width types shared by the keel VM crates:
//! - [`U256`]: the 256-bit execution word
//! - [`Address`]: 160-bit account address
//! - [`H256`]: 256-bit hash / storage key

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{HashError, H256};

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Gas type
pub type Gas = u64;
