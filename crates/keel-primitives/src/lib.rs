//! # keel-primitives
//!
//! Primitive types shared by the Keel execution engine: 20-byte addresses,
//! 32-byte hashes, the 256-bit machine word and Keccak-256.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{keccak256, HashError, H256, KECCAK_EMPTY};

// 256-bit machine word and its double-width companion
pub use primitive_types::{U256, U512};

/// Gas amount
pub type Gas = u64;

/// Account nonce
pub type Nonce = u64;

/// Convert a word into its 32-byte big-endian form.
pub fn word_to_bytes(word: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    word.to_big_endian(&mut out);
    out
}

/// Read a word from up to 32 big-endian bytes.
pub fn word_from_bytes(bytes: &[u8]) -> U256 {
    U256::from_big_endian(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_bytes_layout() {
        let bytes = word_to_bytes(U256::from(0x0102u64));
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_word_from_short_slice() {
        assert_eq!(word_from_bytes(&[0xff]), U256::from(255u64));
        assert_eq!(word_from_bytes(&[]), U256::zero());
    }
}
