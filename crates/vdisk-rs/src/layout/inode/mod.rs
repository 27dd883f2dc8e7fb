//! The fixed-size inode record stored in the inode table.

use crate::constants::{INODE_SIZE, INT_SIZE};
use crate::error::{FsError, FsResult};
use crate::layout::codec::{get_u32, put_u32};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InodeKind {
    /// Regular file; also the kind recorded for free inodes.
    File,
    Directory,
}

/// Inode describes one file or directory.
///
/// While the inode sits on the free list, `first_block` holds the index of
/// the next free inode instead of a block number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inode {
    pub index: u32,
    pub first_block: u32,
    pub size: u32,
    pub kind: InodeKind,
}

impl InodeKind {
    /// `from_byte` decodes the on-disk type byte.
    ///
    /// # Errors
    /// Returns `Corrupt` for anything other than 0 or 1.
    pub fn from_byte(byte: u8) -> FsResult<Self> {
        match byte {
            0 => Ok(Self::File),
            1 => Ok(Self::Directory),
            other => Err(FsError::Corrupt(format!("unknown inode type byte {other}"))),
        }
    }

    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::File => 0,
            Self::Directory => 1,
        }
    }
}

impl Inode {
    #[must_use]
    pub const fn new(index: u32, first_block: u32, size: u32, kind: InodeKind) -> Self {
        Self {
            index,
            first_block,
            size,
            kind,
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == InodeKind::Directory
    }

    /// `from_bytes` decodes the 9-byte slot of inode `index`.
    ///
    /// # Errors
    /// Returns `Corrupt` on an unknown type byte.
    pub fn from_bytes(index: u32, buf: &[u8; INODE_SIZE]) -> FsResult<Self> {
        Ok(Self {
            index,
            first_block: get_u32(buf, 0)?,
            size: get_u32(buf, INT_SIZE)?,
            kind: InodeKind::from_byte(buf[2 * INT_SIZE])?,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; INODE_SIZE] {
        let mut buf = [0u8; INODE_SIZE];
        buf[..INT_SIZE].copy_from_slice(&self.first_block.to_be_bytes());
        buf[INT_SIZE..2 * INT_SIZE].copy_from_slice(&self.size.to_be_bytes());
        buf[2 * INT_SIZE] = self.kind.to_byte();
        buf
    }
}
