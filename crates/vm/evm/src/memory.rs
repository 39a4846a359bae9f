use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE_IN_BYTES_USIZE},
    errors::{ExceptionalHalt, InternalError, VMError},
};
use ExceptionalHalt::OutOfBounds;
use bytes::Bytes;
use ferrum_common::{
    U256,
    utils::{u256_from_big_endian_const, u256_to_big_endian},
};

/// Byte-addressed memory of a single call frame.
///
/// The active size only grows, always to a multiple of 32 bytes. Reads never
/// grow it: handlers charge the expansion and call [`Memory::resize`] first,
/// and anything read past the active size comes back as zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    buffer: Vec<u8>,
}

impl Memory {
    #[inline]
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Active size in bytes, what MSIZE reports.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Grows the memory to fit `new_memory_size` bytes.
    ///
    /// Note: new_memory_size is increased to the next 32 byte multiple.
    #[inline]
    pub fn resize(&mut self, new_memory_size: usize) -> Result<(), VMError> {
        if new_memory_size == 0 {
            return Ok(());
        }

        let new_memory_size = new_memory_size
            .checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfBounds)?;

        if new_memory_size > self.buffer.len() {
            self.buffer.resize(new_memory_size, 0);
        }

        Ok(())
    }

    /// Reads `size` bytes from `offset`, zero-padded past the active size.
    #[inline]
    pub fn load_range(&self, offset: usize, size: usize) -> Result<Bytes, VMError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        let end = offset.checked_add(size).ok_or(OutOfBounds)?;

        let mut data = vec![0u8; size];
        if let Some(available) = self.buffer.get(offset..end.min(self.buffer.len())) {
            data.get_mut(..available.len())
                .ok_or(InternalError::Slicing)?
                .copy_from_slice(available);
        }
        Ok(Bytes::from(data))
    }

    /// Reads the word at `offset`.
    #[inline]
    pub fn load_word(&self, offset: usize) -> Result<U256, VMError> {
        let end = offset
            .checked_add(WORD_SIZE_IN_BYTES_USIZE)
            .ok_or(OutOfBounds)?;
        let mut word = [0u8; 32];
        match self.buffer.get(offset..end) {
            Some(bytes) => word.copy_from_slice(bytes),
            None => {
                let loaded = self.load_range(offset, WORD_SIZE_IN_BYTES_USIZE)?;
                word.copy_from_slice(&loaded);
            }
        }
        Ok(u256_from_big_endian_const(word))
    }

    /// Stores `data` at `offset`, growing memory if needed.
    #[inline]
    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset.checked_add(data.len()).ok_or(OutOfBounds)?;
        self.resize(end)?;
        self.buffer
            .get_mut(offset..end)
            .ok_or(InternalError::Slicing)?
            .copy_from_slice(data);
        Ok(())
    }

    /// Stores data and zero-pads up to total_size at the given offset.
    #[inline]
    pub fn store_data_zero_padded(
        &mut self,
        offset: usize,
        data: &[u8],
        total_size: usize,
    ) -> Result<(), VMError> {
        if total_size == 0 {
            return Ok(());
        }
        let end = offset.checked_add(total_size).ok_or(OutOfBounds)?;
        self.resize(end)?;

        let copy_size = data.len().min(total_size);
        let target = self
            .buffer
            .get_mut(offset..end)
            .ok_or(InternalError::Slicing)?;
        let (copied, padding) = target.split_at_mut(copy_size);
        copied.copy_from_slice(data.get(..copy_size).ok_or(InternalError::Slicing)?);
        padding.fill(0);
        Ok(())
    }

    /// Stores a word at the given offset, resizing memory if needed.
    #[inline]
    pub fn store_word(&mut self, offset: usize, word: U256) -> Result<(), VMError> {
        self.store_data(offset, &u256_to_big_endian(word))
    }
}

/// Cost(words) = 3 * words + floor(words^2 / 512).
///
/// Sizes whose cost does not fit in a u64 can never be paid for.
#[inline]
pub fn words_cost(words: u64) -> Result<u64, VMError> {
    let quadratic = words
        .checked_mul(words)
        .ok_or(ExceptionalHalt::OutOfGas)?
        / MEMORY_EXPANSION_QUOTIENT;
    let linear = words.checked_mul(3).ok_or(ExceptionalHalt::OutOfGas)?;
    Ok(quadratic
        .checked_add(linear)
        .ok_or(ExceptionalHalt::OutOfGas)?)
}

/// Memory size needed to touch `size` bytes from `offset`. Zero-sized accesses need none.
#[inline]
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }

    offset
        .checked_add(size)
        .and_then(|sum| sum.checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE))
        .ok_or(OutOfBounds.into())
}
