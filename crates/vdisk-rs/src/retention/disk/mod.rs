#[cfg(test)]
mod disk_tests;
pub mod superblock;

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tracing::{info, trace, warn};

use crate::constants::{INODE_SIZE, INT_SIZE, NULL_BLOCK, ROOT_INODE, SUPERBLOCK_LEN};
use crate::error::{FsError, FsResult};
use crate::layout::block::Block;
use crate::layout::codec::{get_u32, put_u32};
use crate::layout::geometry::Geometry;
use crate::layout::inode::{Inode, InodeKind};
use crate::metrics::{self, AllocEvent, AllocOp, AllocTarget, BlockIo, IoOpType};
use superblock::Superblock;

/// VirtualDisk owns one memory-mapped backing file and its superblock.
///
/// Block 0 holds the superblock, blocks `1..first_data_block` hold the inode
/// table and every other block is either on the free-block list or owned by
/// exactly one file or directory.
pub struct VirtualDisk {
    path: PathBuf,
    file: File,
    map: MmapMut,
    geom: Geometry,
    superblock: Superblock,
}

impl VirtualDisk {
    /// Creates and formats a new backing store at `path`. The disk is left closed.
    ///
    /// # Errors
    /// Returns `AlreadyExists` if `path` exists, `InvalidParameters` for an
    /// unusable geometry and `Io` if the backing file cannot be created.
    pub fn format(path: impl AsRef<Path>, capacity: u32, block_size: u32) -> FsResult<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(FsError::AlreadyExists(path.display().to_string()));
        }
        let geom = Geometry::new(capacity, block_size)?;

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(geom.byte_len())?;
        let map = map_file(&file, geom.byte_len())?;

        let inode_count = geom.inode_count();
        let superblock = Superblock {
            capacity,
            block_size,
            free_list_head: NULL_BLOCK,
            free_list_cursor: 0,
            free_inode_head: if inode_count > 1 { 1 } else { 0 },
            inode_count,
        };
        let mut disk = Self {
            path: path.to_path_buf(),
            file,
            map,
            geom,
            superblock,
        };

        for index in 1..inode_count {
            let next = if index + 1 < inode_count { index + 1 } else { 0 };
            disk.write_inode(&Inode::new(index, next, 0, InodeKind::File))?;
        }
        for n in (geom.first_data_block()..capacity).rev() {
            disk.push_free(n)?;
        }

        let root_block = disk.allocate_block()?;
        disk.write_inode(&Inode::new(ROOT_INODE, root_block, 1, InodeKind::Directory))?;
        disk.sync()?;

        info!(
            "format: {} capacity={} block_size={} inodes={} first_data_block={}",
            path.display(),
            capacity,
            block_size,
            inode_count,
            geom.first_data_block()
        );
        Ok(())
    }

    /// Opens an existing backing store and loads its superblock.
    ///
    /// # Errors
    /// Returns `NotFound` if `path` does not exist and `Corrupt` if block 0
    /// does not describe the file it lives in.
    pub fn open(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FsError::NotFound(format!("disk {}", path.display())));
        }
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;
        let len = file.metadata()?.len();
        if len < SUPERBLOCK_LEN as u64 {
            return Err(FsError::Corrupt(format!(
                "{} is too short to hold a superblock",
                path.display()
            )));
        }
        let map = map_file(&file, len)?;
        let superblock = Superblock::from_bytes(&map[..SUPERBLOCK_LEN])?;
        let geom = Geometry::new(superblock.capacity, superblock.block_size).map_err(|_| {
            FsError::Corrupt(format!(
                "superblock geometry {}x{} is invalid",
                superblock.capacity, superblock.block_size
            ))
        })?;
        if geom.byte_len() != len {
            return Err(FsError::Corrupt(format!(
                "backing length {len} does not match {} blocks of {} bytes",
                superblock.capacity, superblock.block_size
            )));
        }
        if geom.inode_count() != superblock.inode_count {
            return Err(FsError::Corrupt(format!(
                "inode count {} does not match geometry ({})",
                superblock.inode_count,
                geom.inode_count()
            )));
        }
        let head = superblock.free_list_head;
        if (head != NULL_BLOCK && head < geom.first_data_block())
            || head >= superblock.capacity
            || superblock.free_list_cursor as usize >= geom.pointers_per_block()
            || superblock.free_inode_head >= superblock.inode_count
        {
            return Err(FsError::Corrupt("free list heads out of range".to_string()));
        }

        info!(
            "open: {} capacity={} block_size={} inodes={}",
            path.display(),
            superblock.capacity,
            superblock.block_size,
            superblock.inode_count
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            geom,
            superblock,
        })
    }

    /// Persists the superblock, flushes the map and releases the backing handle.
    ///
    /// # Errors
    /// Returns `Io` if the flush fails.
    pub fn close(mut self) -> FsResult<()> {
        self.sync()?;
        info!("close: {}", self.path.display());
        Ok(())
    }

    /// Deletes the backing store of a closed disk.
    ///
    /// # Errors
    /// Returns `NotFound` if `path` does not exist.
    pub fn destroy(path: impl AsRef<Path>) -> FsResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FsError::NotFound(format!("disk {}", path.display())));
        }
        std::fs::remove_file(path)?;
        info!("destroy: {}", path.display());
        Ok(())
    }

    /// Writes the mutable superblock fields to block 0 and flushes the map.
    ///
    /// # Errors
    /// Returns `Io` if the flush fails.
    pub fn sync(&mut self) -> FsResult<()> {
        self.superblock
            .write_bytes(&mut self.map[..SUPERBLOCK_LEN])?;
        self.map.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geom
    }

    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.superblock.capacity
    }

    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.superblock.block_size as usize
    }

    #[must_use]
    pub const fn inode_count(&self) -> u32 {
        self.superblock.inode_count
    }

    #[must_use]
    pub fn first_data_block(&self) -> u32 {
        self.geom.first_data_block()
    }

    #[must_use]
    pub const fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// `new_block` returns a zero-filled buffer sized for this disk.
    #[must_use]
    pub fn new_block(&self) -> Block {
        Block::zeroed(self.block_size())
    }

    /// Reads block `n` into a fresh buffer. Block 0 may be read.
    ///
    /// # Errors
    /// Returns `OutOfRange` if `n` is not below the capacity.
    pub fn read_block(&self, n: u32) -> FsResult<Block> {
        let mut block = self.new_block();
        self.read_block_into(n, &mut block)?;
        Ok(block)
    }

    /// Reads block `n` into `block`.
    ///
    /// # Errors
    /// Returns `OutOfRange` for a bad block number and `SizeMismatch` if the
    /// buffer is not exactly one block long.
    pub fn read_block_into(&self, n: u32, block: &mut Block) -> FsResult<()> {
        if n >= self.capacity() {
            return Err(FsError::range(u64::from(n), u64::from(self.capacity())));
        }
        self.check_size(block)?;
        let off = self.geom.block_offset(n);
        block
            .as_bytes_mut()
            .copy_from_slice(&self.map[off..off + self.block_size()]);
        metrics::record_block_io(BlockIo {
            op: IoOpType::Read,
            block: n,
            bytes: self.block_size() as u64,
        });
        Ok(())
    }

    /// Writes `block` to block `n`. Block 0 is never a valid target.
    ///
    /// # Errors
    /// Returns `OutOfRange` for a bad block number and `SizeMismatch` if the
    /// buffer is not exactly one block long.
    pub fn write_block(&mut self, n: u32, block: &Block) -> FsResult<()> {
        if n == 0 || n >= self.capacity() {
            return Err(FsError::range(u64::from(n), u64::from(self.capacity())));
        }
        self.check_size(block)?;
        let off = self.geom.block_offset(n);
        let len = self.block_size();
        self.map[off..off + len].copy_from_slice(block.as_bytes());
        metrics::record_block_io(BlockIo {
            op: IoOpType::Write,
            block: n,
            bytes: len as u64,
        });
        Ok(())
    }

    /// Pops the most recently released block off the free-block list and
    /// returns it zero-filled.
    ///
    /// When the head free-list block has no pointers left it is handed out
    /// itself and the list moves on to the block linked from its slot 0.
    ///
    /// # Errors
    /// Returns `DiskFull` when the list is empty and `Corrupt`, with the
    /// superblock untouched, when the list points outside the data area.
    pub fn allocate_block(&mut self) -> FsResult<u32> {
        let head = self.superblock.free_list_head;
        if head == NULL_BLOCK {
            warn!("allocate_block: {} has no free blocks", self.path.display());
            return Err(FsError::DiskFull("no free blocks"));
        }
        let list = self.read_block(head)?;
        let cursor = self.superblock.free_list_cursor;
        let (n, next_head, next_cursor) = if cursor != 0 {
            let n = get_u32(list.as_bytes(), cursor as usize * INT_SIZE)?;
            (n, head, cursor - 1)
        } else {
            let link = get_u32(list.as_bytes(), 0)?;
            if link != NULL_BLOCK && !self.is_data_block(link) {
                return Err(FsError::Corrupt(format!(
                    "free-block list links to block {link}"
                )));
            }
            (head, link, self.last_pointer_slot())
        };
        if !self.is_data_block(n) {
            return Err(FsError::Corrupt(format!(
                "free-block list yielded block {n}"
            )));
        }
        self.superblock.free_list_head = next_head;
        self.superblock.free_list_cursor = next_cursor;
        self.write_block(n, &self.new_block())?;

        trace!(block = n, "allocate_block");
        metrics::record_alloc(AllocEvent {
            target: AllocTarget::Block,
            op: AllocOp::Allocate,
            id: n,
        });
        Ok(n)
    }

    /// Zero-fills block `n` and pushes it onto the free-block list.
    ///
    /// # Errors
    /// Returns `InvalidIndex` for block 0, inode-table blocks and numbers
    /// beyond the capacity.
    pub fn release_block(&mut self, n: u32) -> FsResult<()> {
        if !self.is_data_block(n) {
            return Err(FsError::index(u64::from(n), u64::from(self.capacity())));
        }
        self.write_block(n, &self.new_block())?;
        self.push_free(n)?;

        trace!(block = n, "release_block");
        metrics::record_alloc(AllocEvent {
            target: AllocTarget::Block,
            op: AllocOp::Release,
            id: n,
        });
        Ok(())
    }

    fn push_free(&mut self, n: u32) -> FsResult<()> {
        let head = self.superblock.free_list_head;
        if head == NULL_BLOCK {
            let mut list = self.new_block();
            put_u32(list.as_bytes_mut(), 0, NULL_BLOCK)?;
            self.write_block(n, &list)?;
            self.superblock.free_list_head = n;
            self.superblock.free_list_cursor = 0;
        } else if self.superblock.free_list_cursor == self.last_pointer_slot() {
            let mut list = self.new_block();
            put_u32(list.as_bytes_mut(), 0, head)?;
            self.write_block(n, &list)?;
            self.superblock.free_list_head = n;
            self.superblock.free_list_cursor = 0;
        } else {
            let mut list = self.read_block(head)?;
            let cursor = self.superblock.free_list_cursor + 1;
            put_u32(list.as_bytes_mut(), cursor as usize * INT_SIZE, n)?;
            self.write_block(head, &list)?;
            self.superblock.free_list_cursor = cursor;
        }
        Ok(())
    }

    /// Detaches the head of the free-inode list.
    ///
    /// The returned inode carries its index only; the caller sets its block,
    /// size and kind and persists it with [`Self::write_inode`].
    ///
    /// # Errors
    /// Returns `DiskFull` when no inode is free.
    pub fn allocate_inode(&mut self) -> FsResult<Inode> {
        let head = self.superblock.free_inode_head;
        if head == 0 {
            warn!("allocate_inode: {} has no free inodes", self.path.display());
            return Err(FsError::DiskFull("no free inodes"));
        }
        let mut inode = self.read_inode(head)?;
        self.superblock.free_inode_head = inode.first_block;
        inode.first_block = NULL_BLOCK;
        inode.size = 0;

        trace!(inode = head, "allocate_inode");
        metrics::record_alloc(AllocEvent {
            target: AllocTarget::Inode,
            op: AllocOp::Allocate,
            id: head,
        });
        Ok(inode)
    }

    /// Threads `inode` onto the free-inode list and persists it.
    ///
    /// # Errors
    /// Returns `InvalidIndex` for the root inode or an index past the table.
    pub fn release_inode(&mut self, inode: Inode) -> FsResult<()> {
        if inode.index == ROOT_INODE || inode.index >= self.inode_count() {
            return Err(FsError::index(
                u64::from(inode.index),
                u64::from(self.inode_count()),
            ));
        }
        let freed = Inode::new(
            inode.index,
            self.superblock.free_inode_head,
            0,
            InodeKind::File,
        );
        self.write_inode(&freed)?;
        self.superblock.free_inode_head = inode.index;

        trace!(inode = inode.index, "release_inode");
        metrics::record_alloc(AllocEvent {
            target: AllocTarget::Inode,
            op: AllocOp::Release,
            id: inode.index,
        });
        Ok(())
    }

    /// Reads inode `index` from the inode table.
    ///
    /// # Errors
    /// Returns `InvalidIndex` outside `0..inode_count`.
    pub fn read_inode(&self, index: u32) -> FsResult<Inode> {
        self.check_inode_index(index)?;
        let off = self.geom.inode_position(index);
        let mut raw = [0u8; INODE_SIZE];
        raw.copy_from_slice(&self.map[off..off + INODE_SIZE]);
        Inode::from_bytes(index, &raw)
    }

    /// Stores `inode` in its inode-table slot.
    ///
    /// # Errors
    /// Returns `InvalidIndex` outside `0..inode_count`.
    pub fn write_inode(&mut self, inode: &Inode) -> FsResult<()> {
        self.check_inode_index(inode.index)?;
        let off = self.geom.inode_position(inode.index);
        self.map[off..off + INODE_SIZE].copy_from_slice(&inode.to_bytes());
        Ok(())
    }

    pub fn root_inode(&self) -> FsResult<Inode> {
        self.read_inode(ROOT_INODE)
    }

    /// Coarse admission check comparing `blocks` with the capacity left after
    /// the root directory's recorded size. It does not walk the free list.
    pub fn has_capacity_for(&self, blocks: u32) -> FsResult<bool> {
        let root = self.root_inode()?;
        Ok(blocks <= self.capacity().saturating_sub(root.size))
    }

    /// Counts the blocks currently on the free-block list.
    ///
    /// # Errors
    /// Returns `Corrupt` if the list links loop or leave the disk.
    pub fn free_block_count(&self) -> FsResult<u32> {
        let mut head = self.superblock.free_list_head;
        if head == NULL_BLOCK {
            return Ok(0);
        }
        let per_block = self.geom.pointers_per_block() as u32;
        let mut count = self.superblock.free_list_cursor + 1;
        let mut hops = 0u32;
        loop {
            let list = self.read_block(head)?;
            head = get_u32(list.as_bytes(), 0)?;
            if head == NULL_BLOCK {
                return Ok(count);
            }
            hops += 1;
            if hops > self.capacity() || head >= self.capacity() {
                return Err(FsError::Corrupt("free-block list is malformed".to_string()));
            }
            count += per_block;
        }
    }

    /// Counts the inodes currently on the free-inode list.
    ///
    /// # Errors
    /// Returns `Corrupt` if the list loops.
    pub fn free_inode_count(&self) -> FsResult<u32> {
        let mut next = self.superblock.free_inode_head;
        let mut count = 0u32;
        while next != 0 {
            count += 1;
            if count >= self.inode_count() {
                return Err(FsError::Corrupt("free-inode list is malformed".to_string()));
            }
            next = self.read_inode(next)?.first_block;
        }
        Ok(count)
    }

    fn is_data_block(&self, n: u32) -> bool {
        n >= self.first_data_block() && n < self.capacity()
    }

    fn last_pointer_slot(&self) -> u32 {
        self.geom.pointers_per_block() as u32 - 1
    }

    fn check_size(&self, block: &Block) -> FsResult<()> {
        if block.capacity() != self.block_size() {
            return Err(FsError::SizeMismatch {
                expected: self.block_size(),
                actual: block.capacity(),
            });
        }
        Ok(())
    }

    fn check_inode_index(&self, index: u32) -> FsResult<()> {
        if index >= self.inode_count() {
            return Err(FsError::index(
                u64::from(index),
                u64::from(self.inode_count()),
            ));
        }
        Ok(())
    }
}

impl Drop for VirtualDisk {
    fn drop(&mut self) {
        if let Err(err) = self.sync() {
            warn!("drop: failed to sync {}: {err}", self.path.display());
        }
    }
}

fn map_file(file: &File, len: u64) -> FsResult<MmapMut> {
    let map_len = usize::try_from(len)
        .map_err(|_| FsError::Corrupt(format!("disk length {len} exceeds addressable size")))?;
    let map = unsafe { MmapOptions::new().len(map_len).map_mut(file)? };
    Ok(map)
}
