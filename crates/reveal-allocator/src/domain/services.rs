//! # Domain Services
//!
//! Stateless helpers: hashing and the owner fallback seed.

use crate::domain::value_objects::{Address, Hash, ItemId, U256};
use sha3::{Digest, Keccak256};

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::from(<[u8; 32]>::from(hash))
}

/// Derives the seed used when the owner reveals an item without the oracle.
///
/// `keccak256(owner ++ item_be ++ pool_size_be ++ nonce_be)`. The nonce is
/// bumped after every fallback reveal so two fallbacks never reuse a seed.
#[must_use]
pub fn derive_fallback_seed(owner: Address, item: ItemId, pool_size: u64, nonce: u64) -> U256 {
    let mut preimage = Vec::with_capacity(20 + 8 * 3);
    preimage.extend_from_slice(owner.as_bytes());
    preimage.extend_from_slice(&item.get().to_be_bytes());
    preimage.extend_from_slice(&pool_size.to_be_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    keccak256(&preimage).to_u256()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256() {
        // Test vector: keccak256("") = c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
        let hash = keccak256(&[]);
        assert_eq!(hash.0[0], 0xc5);
        assert_eq!(hash.0[1], 0xd2);
        assert_eq!(hash.0[31], 0x70);
    }

    #[test]
    fn test_fallback_seed_deterministic() {
        let owner = Address::new([1u8; 20]);
        let a = derive_fallback_seed(owner, ItemId(1), 10, 0);
        let b = derive_fallback_seed(owner, ItemId(1), 10, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fallback_seed_varies_with_inputs() {
        let owner = Address::new([1u8; 20]);
        let base = derive_fallback_seed(owner, ItemId(1), 10, 0);
        assert_ne!(base, derive_fallback_seed(owner, ItemId(2), 10, 0));
        assert_ne!(base, derive_fallback_seed(owner, ItemId(1), 9, 0));
        assert_ne!(base, derive_fallback_seed(owner, ItemId(1), 10, 1));
        assert_ne!(
            base,
            derive_fallback_seed(Address::new([2u8; 20]), ItemId(1), 10, 0)
        );
    }
}
