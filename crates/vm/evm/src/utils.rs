use crate::errors::{ExceptionalHalt, InternalError, VMError};
use ferrum_common::{Address, H256, U256, utils::u256_from_big_endian_const};

/// Takes the low 20 bytes of a stack word.
#[inline]
pub fn word_to_address(word: U256) -> Address {
    let bytes = word.to_big_endian();
    Address::from_slice(bytes.get(12..).unwrap_or_default())
}

#[inline]
pub fn address_to_word(address: Address) -> U256 {
    let mut word = [0u8; 32];
    for (word_byte, address_byte) in word.iter_mut().skip(12).zip(address.as_bytes()) {
        *word_byte = *address_byte;
    }
    u256_from_big_endian_const(word)
}

#[inline]
pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

/// Converts a stack value used as a size or offset.
///
/// Values that do not fit are too large to ever be paid for.
#[inline]
pub fn u256_to_usize(value: U256) -> Result<usize, VMError> {
    value
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber.into())
}

/// Converts a memory `(size, offset)` pair.
///
/// A zero size never touches memory, so its offset may be anything and is
/// normalized to zero.
#[inline]
pub fn size_offset_to_usize(size: U256, offset: U256) -> Result<(usize, usize), VMError> {
    if size.is_zero() {
        return Ok((0, 0));
    }
    Ok((u256_to_usize(size)?, u256_to_usize(offset)?))
}

/// Number of 32 byte words needed to hold `size` bytes.
#[inline]
pub fn words_for(size: usize) -> Result<u64, VMError> {
    u64::try_from(size.div_ceil(32)).map_err(|_| InternalError::TypeConversion.into())
}
