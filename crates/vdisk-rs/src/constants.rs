//! On-disk layout constants shared by every engine component.

/// DEFAULT_CAPACITY is the block count used when none is requested.
pub const DEFAULT_CAPACITY: u32 = 1024;
/// DEFAULT_BLOCK_SIZE is the block size used when none is requested.
pub const DEFAULT_BLOCK_SIZE: u32 = 256;
/// MIN_BLOCK_SIZE is the smallest block size `format` accepts.
pub const MIN_BLOCK_SIZE: u32 = 32;
/// MIN_BUFFER_SIZE is the smallest capacity a standalone block buffer may have.
pub const MIN_BUFFER_SIZE: usize = 8;

/// INT_SIZE is the width of every on-disk integer.
pub const INT_SIZE: usize = 4;

/// Superblock field offsets within block 0.
pub const SB_CAPACITY: usize = 0;
pub const SB_BLOCK_SIZE: usize = 4;
pub const SB_FREE_LIST_HEAD: usize = 8;
pub const SB_FREE_LIST_CURSOR: usize = 12;
pub const SB_FREE_INODE_HEAD: usize = 16;
pub const SB_INODE_COUNT: usize = 20;
/// SUPERBLOCK_LEN is the number of meaningful bytes at the start of block 0.
pub const SUPERBLOCK_LEN: usize = 24;

/// INODE_SIZE is the width of one inode-table slot.
pub const INODE_SIZE: usize = 9;
/// INODE_RATIO_PERCENT is the share of the disk's bytes that sets the inode count.
pub const INODE_RATIO_PERCENT: u64 = 1;
/// ROOT_INODE is the permanently reserved root directory inode.
pub const ROOT_INODE: u32 = 0;
/// NULL_BLOCK terminates pointer arrays and free lists.
pub const NULL_BLOCK: u32 = 0;

/// POINTER_REGION is the tail of a content root block holding its five tier pointers.
pub const POINTER_REGION: usize = 20;
/// DIRECT_POINTERS is the number of direct block pointers in a root block.
pub const DIRECT_POINTERS: usize = 3;

/// DIR_ENTRY_SIZE is the width of one directory slot.
pub const DIR_ENTRY_SIZE: usize = 24;
/// DIR_NAME_LEN is the width of the name field of a directory slot.
pub const DIR_NAME_LEN: usize = 20;
