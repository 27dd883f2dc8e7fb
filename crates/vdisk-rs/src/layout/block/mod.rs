//! Fixed-capacity byte buffers holding the contents of one disk block.

#[cfg(test)]
mod block_tests;

use crate::constants::MIN_BUFFER_SIZE;
use crate::error::{FsError, FsResult};

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
/// Block stores exactly one block's worth of bytes.
///
/// The capacity is fixed at construction and is always a power of two.
pub struct Block(Box<[u8]>);

impl Block {
    /// `new` returns a zero-filled buffer of `capacity` bytes.
    ///
    /// # Errors
    /// Returns `InvalidParameters` if `capacity` is below 8 or not a power of two.
    pub fn new(capacity: usize) -> FsResult<Self> {
        if capacity < MIN_BUFFER_SIZE || !capacity.is_power_of_two() {
            return Err(FsError::InvalidParameters {
                capacity: capacity as u64,
                block_size: capacity as u64,
            });
        }
        Ok(Self::zeroed(capacity))
    }

    /// `zeroed` skips validation; callers pass a block size taken from a formatted disk.
    pub(crate) fn zeroed(capacity: usize) -> Self {
        Self(vec![0u8; capacity].into_boxed_slice())
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// `get` returns the byte at `index`.
    ///
    /// # Errors
    /// Returns `OutOfRange` if `index` is not below the capacity.
    pub fn get(&self, index: usize) -> FsResult<u8> {
        self.0
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_range(index))
    }

    /// `set` stores `value` at `index`.
    ///
    /// # Errors
    /// Returns `OutOfRange` if `index` is not below the capacity.
    pub fn set(&mut self, index: usize, value: u8) -> FsResult<()> {
        let err = self.out_of_range(index);
        let slot = self.0.get_mut(index).ok_or(err)?;
        *slot = value;
        Ok(())
    }

    /// `clear` zero-fills the whole buffer.
    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    fn out_of_range(&self, index: usize) -> FsError {
        FsError::range(index as u64, self.0.len() as u64)
    }
}

impl AsRef<[u8]> for Block {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
