//! Geometry helpers mapping disk parameters to layout regions and content tiers.


use crate::constants::{
    DIR_ENTRY_SIZE, DIRECT_POINTERS, INODE_RATIO_PERCENT, INODE_SIZE, INT_SIZE, MIN_BLOCK_SIZE,
    POINTER_REGION,
};
use crate::error::{FsError, FsResult};

/// Geometry describes the block layout of one virtual disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    capacity: u32,
    block_size: u32,
}

/// Tier names the addressing tier that serves one logical content block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    /// The content root block itself.
    Root,
    /// One of the direct pointers, by slot.
    Direct(usize),
    /// Position inside the single-indirect array.
    Single(usize),
    /// Position inside the double-indirect structure.
    Double(usize),
}

impl Geometry {
    /// `new` validates a capacity/block-size pair for formatting.
    ///
    /// # Errors
    /// Returns `InvalidParameters` unless both values are powers of two, the
    /// block size is at least 32 and the inode table leaves room for the
    /// root directory block.
    pub fn new(capacity: u32, block_size: u32) -> FsResult<Self> {
        let invalid = FsError::InvalidParameters {
            capacity: u64::from(capacity),
            block_size: u64::from(block_size),
        };
        if !capacity.is_power_of_two()
            || !block_size.is_power_of_two()
            || block_size < MIN_BLOCK_SIZE
        {
            return Err(invalid);
        }
        if usize::try_from(u64::from(capacity) * u64::from(block_size)).is_err() {
            return Err(invalid);
        }
        let geom = Self {
            capacity,
            block_size,
        };
        if geom.first_data_block() >= capacity {
            return Err(invalid);
        }
        Ok(geom)
    }

    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size as usize
    }

    /// `byte_len` is the size of the backing store in bytes.
    #[must_use]
    pub const fn byte_len(&self) -> u64 {
        self.capacity as u64 * self.block_size as u64
    }

    /// `block_offset` is the byte offset of block `n` in the backing store.
    #[must_use]
    pub const fn block_offset(&self, n: u32) -> usize {
        n as usize * self.block_size as usize
    }

    /// `pointers_per_block` is how many block numbers fit in one block.
    #[must_use]
    pub const fn pointers_per_block(&self) -> usize {
        self.block_size as usize / INT_SIZE
    }

    #[must_use]
    pub const fn inodes_per_block(&self) -> usize {
        self.block_size as usize / INODE_SIZE
    }

    /// `inode_count` is one percent of the disk's bytes, never less than one.
    #[must_use]
    pub fn inode_count(&self) -> u32 {
        let count = self.byte_len() * INODE_RATIO_PERCENT / 100;
        u32::try_from(count).unwrap_or(u32::MAX).max(1)
    }

    /// `inode_table_blocks` is the number of blocks after block 0 holding inodes.
    #[must_use]
    pub fn inode_table_blocks(&self) -> u32 {
        let per_block = self.inodes_per_block() as u64;
        u32::try_from(u64::from(self.inode_count()).div_ceil(per_block)).unwrap_or(u32::MAX)
    }

    /// `first_data_block` is the lowest block number the allocator may hand out.
    #[must_use]
    pub fn first_data_block(&self) -> u32 {
        self.inode_table_blocks().saturating_add(1)
    }

    /// `inode_position` maps an inode index to its absolute byte offset.
    #[must_use]
    pub fn inode_position(&self, index: u32) -> usize {
        let per_block = self.inodes_per_block();
        let index = index as usize;
        let block = index / per_block + 1;
        block * self.block_size() + (index % per_block) * INODE_SIZE
    }

    /// `inline_len` is the payload region at the start of a content root block.
    #[must_use]
    pub const fn inline_len(&self) -> usize {
        self.block_size as usize - POINTER_REGION
    }

    /// `direct_offset` is where direct pointer `slot` lives inside a root block.
    #[must_use]
    pub const fn direct_offset(&self, slot: usize) -> usize {
        self.inline_len() + slot * INT_SIZE
    }

    #[must_use]
    pub const fn single_offset(&self) -> usize {
        self.block_size as usize - 2 * INT_SIZE
    }

    #[must_use]
    pub const fn double_offset(&self) -> usize {
        self.block_size as usize - INT_SIZE
    }

    /// `single_capacity` is the number of data blocks one single-indirect block addresses.
    #[must_use]
    pub const fn single_capacity(&self) -> usize {
        self.pointers_per_block()
    }

    /// `double_capacity` is the number of data blocks one double-indirect block addresses.
    #[must_use]
    pub const fn double_capacity(&self) -> usize {
        self.pointers_per_block() * self.pointers_per_block()
    }

    /// `max_payload` is the largest byte payload a file can hold.
    #[must_use]
    pub const fn max_payload(&self) -> u64 {
        max_payload(self.block_size)
    }

    /// `root_dir_slots` is the number of directory entries in a root block.
    #[must_use]
    pub const fn root_dir_slots(&self) -> usize {
        self.inline_len() / DIR_ENTRY_SIZE
    }

    /// `dir_slots` is the number of directory entries in any other block.
    #[must_use]
    pub const fn dir_slots(&self) -> usize {
        self.block_size as usize / DIR_ENTRY_SIZE
    }

    /// `max_logical_blocks` is the number of blocks a content root can address.
    #[must_use]
    pub const fn max_logical_blocks(&self) -> usize {
        1 + DIRECT_POINTERS + self.single_capacity() + self.double_capacity()
    }

    /// `first_single_block` is the logical index served first by the single-indirect tier.
    #[must_use]
    pub const fn first_single_block(&self) -> usize {
        1 + DIRECT_POINTERS
    }

    /// `first_double_block` is the logical index served first by the double-indirect tier.
    #[must_use]
    pub const fn first_double_block(&self) -> usize {
        self.first_single_block() + self.single_capacity()
    }

    /// `locate_block` maps a logical content block to its addressing tier.
    ///
    /// # Errors
    /// Returns `OutOfRange` past the addressing limit.
    pub fn locate_block(&self, index: usize) -> FsResult<Tier> {
        if index >= self.max_logical_blocks() {
            return Err(FsError::range(
                index as u64,
                self.max_logical_blocks() as u64,
            ));
        }
        Ok(if index == 0 {
            Tier::Root
        } else if index < self.first_single_block() {
            Tier::Direct(index - 1)
        } else if index < self.first_double_block() {
            Tier::Single(index - self.first_single_block())
        } else {
            Tier::Double(index - self.first_double_block())
        })
    }
}

/// `max_payload` computes the inline + direct + single + double byte capacity.
#[must_use]
pub const fn max_payload(block_size: u32) -> u64 {
    let bs = block_size as u64;
    let fanout = bs / INT_SIZE as u64;
    (bs - POINTER_REGION as u64)
        + DIRECT_POINTERS as u64 * bs
        + fanout * bs
        + fanout * fanout * bs
}
