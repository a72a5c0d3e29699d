//! # Value Objects
//!
//! Immutable domain primitives for reveal allocation.
//! These types represent concepts that are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for 256-bit random words
pub use primitive_types::U256;

/// One pseudo-random value delivered by the oracle for one item.
pub type RandomWord = U256;

/// Raw value exposed at the read boundary while an item's roll is in progress.
///
/// Distinguishable from every legal asset index, which is bounded by `u64`.
pub const ROLL_IN_PROGRESS: U256 = U256::MAX;

fn decode_hex<const N: usize>(s: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()?;
    <[u8; N]>::try_from(bytes.as_slice()).ok()
}

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account address identifying a caller or collaborator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 20 {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Parses a `0x`-prefixed (or bare) 40 character hex string.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        decode_hex::<20>(s).map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{}...{}",
            hex::encode(&self.0[..4]),
            hex::encode(&self.0[18..])
        )
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte hash (oracle key hashes, fallback seeds).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses a `0x`-prefixed (or bare) 64 character hex string.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        decode_hex::<32>(s).map(Self)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interprets the hash as a big-endian 256-bit integer.
    #[must_use]
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// =============================================================================
// ITEM ID
// =============================================================================

/// Identifier of an issued item awaiting (or holding) a reveal.
///
/// Item ids are positive; zero is never a valid item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns true if this id can name an item.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// ASSET INDEX
// =============================================================================

/// A content variant index drawn from the index pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct AssetIndex(pub u64);

impl AssetIndex {
    /// Returns the raw index.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Raw 256-bit representation used at the external read boundary.
    #[must_use]
    pub fn to_raw(self) -> U256 {
        U256::from(self.0)
    }
}

impl fmt::Display for AssetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// REQUEST ID
// =============================================================================

/// Identifier the oracle hands out for one randomness request.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RequestId(pub U256);

impl RequestId {
    /// Creates a request id from a small integer.
    #[must_use]
    pub fn from_u64(raw: u64) -> Self {
        Self(U256::from(raw))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// =============================================================================
// REVEAL ENTRY
// =============================================================================

/// One entry of a reveal batch: the item and the receiver it must be owned by.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RevealEntry {
    /// Receiver (owner) of the item.
    pub receiver: Address,
    /// The item to reveal.
    pub item_id: ItemId,
}

impl RevealEntry {
    /// Creates a new batch entry.
    #[must_use]
    pub const fn new(receiver: Address, item_id: ItemId) -> Self {
        Self { receiver, item_id }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_slice() {
        let bytes = [0xABu8; 20];
        let addr = Address::from_slice(&bytes).unwrap();
        assert_eq!(addr.as_bytes(), &bytes);
        assert!(Address::from_slice(&[0u8; 19]).is_none());
    }

    #[test]
    fn test_address_from_hex() {
        let addr = Address::from_hex("0x00000000000000000000000000000000000000ff").unwrap();
        assert_eq!(addr.0[19], 0xff);
        assert!(!addr.is_zero());
        assert!(Address::from_hex("0x1234").is_none());
        assert!(Address::from_hex("0xzz000000000000000000000000000000000000ff").is_none());
    }

    #[test]
    fn test_address_display_is_abbreviated() {
        let addr = Address::new([0x11; 20]);
        assert_eq!(addr.to_string(), "0x11111111...1111");
    }

    #[test]
    fn test_item_id_zero_is_invalid() {
        assert!(!ItemId(0).is_valid());
        assert!(ItemId(1).is_valid());
    }

    #[test]
    fn test_sentinel_exceeds_every_index() {
        assert!(AssetIndex(u64::MAX).to_raw() < ROLL_IN_PROGRESS);
    }

    #[test]
    fn test_request_ids_order_numerically() {
        let ids: std::collections::BTreeSet<RequestId> = [300u64, 2, 41]
            .into_iter()
            .map(RequestId::from_u64)
            .collect();
        let ordered: Vec<RequestId> = ids.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                RequestId::from_u64(2),
                RequestId::from_u64(41),
                RequestId::from_u64(300)
            ]
        );
    }

    #[test]
    fn test_hash_from_hex() {
        let encoded = format!("0x{}", "ab".repeat(32));
        assert_eq!(Hash::from_hex(&encoded), Some(Hash::new([0xab; 32])));
        assert!(Hash::from_hex("0xab").is_none());
        assert!(Hash::from_hex(&"ab".repeat(32)).is_some());
        assert!(Hash::from_hex(&format!("0x{}", "ab".repeat(33))).is_none());
    }

    #[test]
    fn test_hash_to_u256_big_endian() {
        let mut bytes = [0u8; 32];
        bytes[31] = 7;
        assert_eq!(Hash::new(bytes).to_u256(), U256::from(7));
    }
}
