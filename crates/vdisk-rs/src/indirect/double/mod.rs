
use tracing::trace;

use super::{SingleIndirect, load_pointers, store_pointers};
use crate::error::{FsError, FsResult};
use crate::layout::block::Block;
use crate::retention::disk::VirtualDisk;

/// DoubleIndirect is a view over one block of single-indirect root pointers.
///
/// Every child except the last is full, so global index `i` lives in child
/// `i / fanout` at slot `i % fanout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleIndirect {
    root: u32,
    children: Vec<SingleIndirect>,
    fanout: usize,
}

impl DoubleIndirect {
    /// Allocates a pointer block and enough children to address `count`
    /// zeroed data blocks.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `count` exceeds fanout squared.
    pub fn create(disk: &mut VirtualDisk, count: usize) -> FsResult<Self> {
        let fanout = disk.geometry().pointers_per_block();
        if count > fanout * fanout {
            return Err(FsError::invalid(format!(
                "double-indirect block addresses at most {} blocks, asked for {count}",
                fanout * fanout
            )));
        }
        let root = disk.allocate_block()?;
        let mut view = Self {
            root,
            children: Vec::with_capacity(count.div_ceil(fanout)),
            fanout,
        };
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(fanout);
            view.children.push(SingleIndirect::create(disk, take)?);
            remaining -= take;
        }
        view.persist(disk)?;
        trace!(root, count, children = view.children.len(), "double-indirect created");
        Ok(view)
    }

    pub fn open(disk: &VirtualDisk, root: u32) -> FsResult<Self> {
        let children = load_pointers(disk, root)?
            .into_iter()
            .map(|child| SingleIndirect::open(disk, child))
            .collect::<FsResult<Vec<_>>>()?;
        Ok(Self {
            root,
            children,
            fanout: disk.geometry().pointers_per_block(),
        })
    }

    #[must_use]
    pub const fn root(&self) -> u32 {
        self.root
    }

    /// `len` is the number of data blocks addressed across all children.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.children.last() {
            Some(last) => (self.children.len() - 1) * self.fanout + last.len(),
            None => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.fanout * self.fanout
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, i: usize) -> FsResult<&SingleIndirect> {
        self.children
            .get(i)
            .ok_or(FsError::range(i as u64, self.children.len() as u64))
    }

    fn locate(&self, i: usize) -> FsResult<(usize, usize)> {
        if i >= self.len() {
            return Err(FsError::range(i as u64, self.len() as u64));
        }
        Ok((i / self.fanout, i % self.fanout))
    }

    pub fn get(&self, i: usize) -> FsResult<u32> {
        let (child, slot) = self.locate(i)?;
        self.children[child].get(slot)
    }

    pub fn read_block(&self, disk: &VirtualDisk, i: usize) -> FsResult<Block> {
        let (child, slot) = self.locate(i)?;
        self.children[child].read(disk, slot)
    }

    pub fn write_block(&self, disk: &mut VirtualDisk, i: usize, block: &Block) -> FsResult<()> {
        let (child, slot) = self.locate(i)?;
        self.children[child].write(disk, slot, block)
    }

    /// Appends one data block holding `block`, opening a new child when the
    /// last one is full.
    ///
    /// # Errors
    /// Returns `FileFull` once fanout squared blocks are addressed.
    pub fn append_block(&mut self, disk: &mut VirtualDisk, block: &Block) -> FsResult<u32> {
        if self.len() == self.capacity() {
            return Err(FsError::FileFull("double-indirect block"));
        }
        match self.children.last_mut() {
            Some(last) if !last.is_full() => return last.append(disk, block),
            _ => {}
        }
        let mut child = SingleIndirect::create(disk, 0)?;
        let n = child.append(disk, block)?;
        self.children.push(child);
        self.persist(disk)?;
        Ok(n)
    }

    /// Releases the data block at global index `i`.
    ///
    /// The hole is refilled from the globally last block so that children
    /// stay dense, and a last child left empty is released with its slot.
    pub fn remove_block_at(&mut self, disk: &mut VirtualDisk, i: usize) -> FsResult<()> {
        let (owner, slot) = self.locate(i)?;
        let last = self.children.len() - 1;
        self.children[owner].remove_at(disk, slot)?;
        if owner != last {
            let donor = self.children[last].detach_last(disk)?;
            self.children[owner].attach(disk, donor)?;
        }
        if self.children[last].is_empty() {
            if let Some(child) = self.children.pop() {
                child.delete(disk)?;
            }
            self.persist(disk)?;
        }
        Ok(())
    }

    /// Deletes every child, then releases the pointer block.
    pub fn delete(self, disk: &mut VirtualDisk) -> FsResult<()> {
        let root = self.root;
        for child in self.children {
            child.delete(disk)?;
        }
        disk.release_block(root)?;
        trace!(root, "double-indirect deleted");
        Ok(())
    }

    /// Spreads `payload` over the addressed blocks, child by child.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the payload is larger than the blocks.
    pub fn write_payload(&self, disk: &mut VirtualDisk, payload: &[u8]) -> FsResult<()> {
        let span = self.fanout * disk.block_size();
        if payload.len() > self.len() * disk.block_size() {
            return Err(FsError::invalid(format!(
                "payload of {} bytes exceeds {} blocks",
                payload.len(),
                self.len()
            )));
        }
        for (i, child) in self.children.iter().enumerate() {
            let start = (i * span).min(payload.len());
            let end = ((i + 1) * span).min(payload.len());
            child.write_payload(disk, &payload[start..end])?;
        }
        Ok(())
    }

    pub fn read_payload(&self, disk: &VirtualDisk) -> FsResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len() * disk.block_size());
        for child in &self.children {
            out.extend(child.read_payload(disk)?);
        }
        Ok(out)
    }

    fn persist(&self, disk: &mut VirtualDisk) -> FsResult<()> {
        let roots: Vec<u32> = self.children.iter().map(SingleIndirect::root).collect();
        store_pointers(disk, self.root, &roots)
    }
}
