use ethereum_types::{H256, U256};
use sha3::{Digest, Keccak256};

pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data.as_ref()).into())
}

/// Converts a big-endian 32-byte array into a [`U256`].
pub fn u256_from_big_endian_const<const N: usize>(slice: [u8; N]) -> U256 {
    const { assert!(N <= 32, "N must be less or equal to 32") };
    let mut padded = [0u8; 32];
    // N <= 32, checked at compile time above
    if let Some(tail) = padded.get_mut(32usize.saturating_sub(N)..) {
        tail.copy_from_slice(&slice);
    }
    U256::from_big_endian(&padded)
}

/// Converts a big-endian slice of at most 32 bytes into a [`U256`].
/// Longer slices keep only their last 32 bytes.
pub fn u256_from_big_endian(slice: &[u8]) -> U256 {
    let start = slice.len().saturating_sub(32);
    U256::from_big_endian(slice.get(start..).unwrap_or_default())
}

#[inline]
pub fn u256_to_big_endian(value: U256) -> [u8; 32] {
    value.to_big_endian()
}

#[inline]
pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

#[inline]
pub fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EMPTY_KECCACK_HASH;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(keccak(b""), EMPTY_KECCACK_HASH);
    }

    #[test]
    fn test_u256_conversions() {
        assert_eq!(u256_from_big_endian_const([0x01, 0x00]), U256::from(256));
        assert_eq!(u256_from_big_endian(&[0xff; 40]), U256::MAX);
        let word = U256::from(0xdead_beefu64);
        assert_eq!(h256_to_u256(u256_to_h256(word)), word);
    }
}
