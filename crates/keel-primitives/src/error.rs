//! Common error types for primitives

use crate::address::AddressError;
use crate::hash::HashError;
use thiserror::Error;

/// Primitive operation error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Hash error
    #[error("hash error: {0}")]
    Hash(#[from] HashError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_address_error() {
        let err: PrimitiveError = AddressError::InvalidLength(3).into();
        assert_eq!(
            err.to_string(),
            "address error: invalid address length: expected 20 bytes, got 3"
        );
    }

    #[test]
    fn test_wraps_hash_error() {
        let err: PrimitiveError = HashError::InvalidLength { expected: 32, got: 1 }.into();
        assert!(err.to_string().starts_with("hash error:"));
    }
}
