//! Block 0 of the backing store.

use crate::constants::{
    SB_BLOCK_SIZE, SB_CAPACITY, SB_FREE_INODE_HEAD, SB_FREE_LIST_CURSOR, SB_FREE_LIST_HEAD,
    SB_INODE_COUNT,
};
use crate::error::FsResult;
use crate::layout::codec::{get_u32, put_u32};

/// On-disk format of block 0 (all fields 4-byte big-endian):
///
/// - 0..4: capacity in blocks
/// - 4..8: block size in bytes
/// - 8..12: free-block-list head (0 = empty)
/// - 12..16: cursor inside the head free-list block
/// - 16..20: free-inode-list head (0 = none)
/// - 20..24: inode count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub capacity: u32,
    pub block_size: u32,
    pub free_list_head: u32,
    pub free_list_cursor: u32,
    pub free_inode_head: u32,
    pub inode_count: u32,
}

impl Superblock {
    pub fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        Ok(Self {
            capacity: get_u32(buf, SB_CAPACITY)?,
            block_size: get_u32(buf, SB_BLOCK_SIZE)?,
            free_list_head: get_u32(buf, SB_FREE_LIST_HEAD)?,
            free_list_cursor: get_u32(buf, SB_FREE_LIST_CURSOR)?,
            free_inode_head: get_u32(buf, SB_FREE_INODE_HEAD)?,
            inode_count: get_u32(buf, SB_INODE_COUNT)?,
        })
    }

    pub fn write_bytes(&self, buf: &mut [u8]) -> FsResult<()> {
        put_u32(buf, SB_CAPACITY, self.capacity)?;
        put_u32(buf, SB_BLOCK_SIZE, self.block_size)?;
        put_u32(buf, SB_FREE_LIST_HEAD, self.free_list_head)?;
        put_u32(buf, SB_FREE_LIST_CURSOR, self.free_list_cursor)?;
        put_u32(buf, SB_FREE_INODE_HEAD, self.free_inode_head)?;
        put_u32(buf, SB_INODE_COUNT, self.inode_count)
    }
}
