
use tracing::trace;

use super::{gather_payload, load_pointers, spread_payload, store_pointers};
use crate::error::{FsError, FsResult};
use crate::layout::block::Block;
use crate::retention::disk::VirtualDisk;

/// SingleIndirect is a view over one block used as an array of data-block
/// pointers. The pointer array is kept dense: removal moves the last pointer
/// into the hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleIndirect {
    root: u32,
    pointers: Vec<u32>,
    fanout: usize,
}

impl SingleIndirect {
    /// Allocates a pointer block and `count` zeroed data blocks.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `count` exceeds the fanout and `DiskFull`
    /// if the allocator runs dry part way.
    pub fn create(disk: &mut VirtualDisk, count: usize) -> FsResult<Self> {
        let fanout = disk.geometry().pointers_per_block();
        if count > fanout {
            return Err(FsError::invalid(format!(
                "single-indirect block holds at most {fanout} pointers, asked for {count}"
            )));
        }
        let root = disk.allocate_block()?;
        let mut view = Self {
            root,
            pointers: Vec::with_capacity(count),
            fanout,
        };
        for _ in 0..count {
            view.pointers.push(disk.allocate_block()?);
        }
        view.persist(disk)?;
        trace!(root, count, "single-indirect created");
        Ok(view)
    }

    /// Binds to an existing pointer block, inferring its length.
    pub fn open(disk: &VirtualDisk, root: u32) -> FsResult<Self> {
        Ok(Self {
            root,
            pointers: load_pointers(disk, root)?,
            fanout: disk.geometry().pointers_per_block(),
        })
    }

    #[must_use]
    pub const fn root(&self) -> u32 {
        self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.pointers.len() == self.fanout
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.fanout
    }

    #[must_use]
    pub fn pointers(&self) -> &[u32] {
        &self.pointers
    }

    /// `get` returns the data block number stored at slot `i`.
    pub fn get(&self, i: usize) -> FsResult<u32> {
        self.pointers
            .get(i)
            .copied()
            .ok_or(FsError::range(i as u64, self.pointers.len() as u64))
    }

    pub fn read(&self, disk: &VirtualDisk, i: usize) -> FsResult<Block> {
        disk.read_block(self.get(i)?)
    }

    pub fn write(&self, disk: &mut VirtualDisk, i: usize, block: &Block) -> FsResult<()> {
        disk.write_block(self.get(i)?, block)
    }

    /// Allocates a data block holding `block` and stores it at the end.
    ///
    /// # Errors
    /// Returns `FileFull` when every slot is taken.
    pub fn append(&mut self, disk: &mut VirtualDisk, block: &Block) -> FsResult<u32> {
        if self.is_full() {
            return Err(FsError::FileFull("single-indirect block"));
        }
        let n = disk.allocate_block()?;
        disk.write_block(n, block)?;
        self.pointers.push(n);
        self.persist(disk)?;
        Ok(n)
    }

    pub fn remove_last(&mut self, disk: &mut VirtualDisk) -> FsResult<()> {
        let n = self.detach_last(disk)?;
        disk.release_block(n)
    }

    /// Releases the data block at slot `i`; the last pointer fills the hole.
    pub fn remove_at(&mut self, disk: &mut VirtualDisk, i: usize) -> FsResult<()> {
        let n = self.get(i)?;
        self.pointers.swap_remove(i);
        self.persist(disk)?;
        disk.release_block(n)
    }

    /// Drops the last pointer without releasing the block it names.
    ///
    /// # Errors
    /// Returns `OutOfRange` when the array is empty.
    pub fn detach_last(&mut self, disk: &mut VirtualDisk) -> FsResult<u32> {
        let n = self.pointers.pop().ok_or(FsError::range(0, 0))?;
        self.persist(disk)?;
        Ok(n)
    }

    /// Stores an already-owned data block number at the end.
    ///
    /// # Errors
    /// Returns `FileFull` when every slot is taken.
    pub fn attach(&mut self, disk: &mut VirtualDisk, n: u32) -> FsResult<()> {
        if self.is_full() {
            return Err(FsError::FileFull("single-indirect block"));
        }
        self.pointers.push(n);
        self.persist(disk)
    }

    /// Releases every data block, then the pointer block itself.
    pub fn delete(self, disk: &mut VirtualDisk) -> FsResult<()> {
        for n in &self.pointers {
            disk.release_block(*n)?;
        }
        disk.release_block(self.root)?;
        trace!(root = self.root, "single-indirect deleted");
        Ok(())
    }

    /// Spreads `payload` over the data blocks in slot order.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the payload is larger than the blocks.
    pub fn write_payload(&self, disk: &mut VirtualDisk, payload: &[u8]) -> FsResult<()> {
        spread_payload(disk, &self.pointers, payload)
    }

    pub fn read_payload(&self, disk: &VirtualDisk) -> FsResult<Vec<u8>> {
        gather_payload(disk, &self.pointers)
    }

    fn persist(&self, disk: &mut VirtualDisk) -> FsResult<()> {
        store_pointers(disk, self.root, &self.pointers)
    }
}
