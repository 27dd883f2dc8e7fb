
use tracing::debug;

use super::tiers::RootPointers;
use crate::constants::{DIR_ENTRY_SIZE, DIR_NAME_LEN, INT_SIZE, NULL_BLOCK, ROOT_INODE};
use crate::error::{FsError, FsResult};
use crate::indirect::{DoubleIndirect, SingleIndirect};
use crate::layout::block::Block;
use crate::layout::codec::{clear, get_text, get_u32, is_blank, put_text, put_u32};
use crate::layout::geometry::Tier;
use crate::layout::inode::{Inode, InodeKind};
use crate::retention::disk::VirtualDisk;

/// One occupied directory slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: u32,
}

/// Directory is a view over one directory inode.
///
/// Entries are 24-byte slots (20-byte name, 4-byte inode index) held in the
/// root block's inline region and in the logical blocks behind it. Every
/// logical block except the last is full; removal refills the hole from the
/// tail so that invariant survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directory {
    inode: Inode,
}

#[derive(Debug, Clone, Copy)]
struct SlotRef {
    block: usize,
    slot: usize,
}

impl Directory {
    /// Allocates a directory inode with one zeroed root block.
    pub fn create(disk: &mut VirtualDisk) -> FsResult<Self> {
        let mut inode = disk.allocate_inode()?;
        inode.first_block = disk.allocate_block()?;
        inode.size = 1;
        inode.kind = InodeKind::Directory;
        disk.write_inode(&inode)?;
        debug!(inode = inode.index, root = inode.first_block, "directory created");
        Ok(Self { inode })
    }

    /// Binds to the existing directory inode `index`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the inode is a regular file.
    pub fn open(disk: &VirtualDisk, index: u32) -> FsResult<Self> {
        let inode = disk.read_inode(index)?;
        if !inode.is_directory() {
            return Err(FsError::invalid(format!("inode {index} is not a directory")));
        }
        Ok(Self { inode })
    }

    pub fn open_root(disk: &VirtualDisk) -> FsResult<Self> {
        Self::open(disk, ROOT_INODE)
    }

    #[must_use]
    pub const fn inode(&self) -> Inode {
        self.inode
    }

    /// `block_count` is the number of logical blocks, the root included.
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.inode.size as usize
    }

    /// Stores `name -> index` in the first free slot of the last logical
    /// block, growing the directory by one block when that block is full.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a malformed name or inode 0,
    /// `AlreadyExists` for a duplicate name and `FileFull` once every tier
    /// is exhausted.
    pub fn add_entry(&mut self, disk: &mut VirtualDisk, name: &str, index: u32) -> FsResult<()> {
        validate_name(name)?;
        if index == ROOT_INODE {
            return Err(FsError::invalid("the root inode cannot be linked by name"));
        }
        if index >= disk.inode_count() {
            return Err(FsError::index(
                u64::from(index),
                u64::from(disk.inode_count()),
            ));
        }
        if self.find(disk, name)?.is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }

        let last = self.block_count() - 1;
        let n = self.block_number(disk, last)?;
        let mut block = disk.read_block(n)?;
        for slot in 0..slots_in(disk, last) {
            if slot_inode(&block, slot)? == 0 {
                write_slot(&mut block, slot, name, index)?;
                return disk.write_block(n, &block);
            }
        }

        let n = self.grow(disk)?;
        let mut block = disk.new_block();
        write_slot(&mut block, 0, name, index)?;
        disk.write_block(n, &block)
    }

    /// Clears the slot named `name` and returns the inode index it held.
    ///
    /// A hole outside the last logical block is refilled with the last
    /// occupied slot of the tail block; a non-root tail block left empty is
    /// released.
    ///
    /// # Errors
    /// Returns `NotFound` if no entry matches.
    pub fn remove_entry(&mut self, disk: &mut VirtualDisk, name: &str) -> FsResult<u32> {
        let (hole, removed) = self
            .find(disk, name)?
            .ok_or_else(|| FsError::NotFound(format!("entry {name}")))?;
        let last = self.block_count() - 1;
        let tail_n = self.block_number(disk, last)?;

        if hole.block == last {
            let mut tail = disk.read_block(tail_n)?;
            clear_slot(&mut tail, hole.slot)?;
            disk.write_block(tail_n, &tail)?;
            if last != 0 && is_blank(tail.as_bytes()) {
                self.shrink(disk)?;
            }
            return Ok(removed);
        }

        let mut tail = disk.read_block(tail_n)?;
        let donor = *occupied(disk, &tail, last)?
            .last()
            .ok_or_else(|| FsError::Corrupt(format!("directory block {last} is empty")))?;
        let name_bytes = get_text(tail.as_bytes(), donor * DIR_ENTRY_SIZE, DIR_NAME_LEN)?.to_vec();
        let donor_inode = slot_inode(&tail, donor)?;

        let hole_n = self.block_number(disk, hole.block)?;
        let mut target = disk.read_block(hole_n)?;
        put_text(
            target.as_bytes_mut(),
            hole.slot * DIR_ENTRY_SIZE,
            DIR_NAME_LEN,
            &name_bytes,
        )?;
        put_u32(
            target.as_bytes_mut(),
            hole.slot * DIR_ENTRY_SIZE + DIR_NAME_LEN,
            donor_inode,
        )?;
        disk.write_block(hole_n, &target)?;

        clear_slot(&mut tail, donor)?;
        disk.write_block(tail_n, &tail)?;
        if is_blank(tail.as_bytes()) {
            self.shrink(disk)?;
        }
        Ok(removed)
    }

    /// Scans every logical block for `name`.
    pub fn lookup(&self, disk: &VirtualDisk, name: &str) -> FsResult<Option<Inode>> {
        match self.find(disk, name)? {
            Some((_, index)) => Ok(Some(disk.read_inode(index)?)),
            None => Ok(None),
        }
    }

    /// Names of every slot whose first byte is alphabetic.
    pub fn list_entries(&self, disk: &VirtualDisk) -> FsResult<Vec<String>> {
        let mut names = Vec::new();
        for i in 0..self.block_count() {
            let block = self.logical_block(disk, i)?;
            for slot in 0..slots_in(disk, i) {
                let off = slot * DIR_ENTRY_SIZE;
                if block.as_bytes()[off].is_ascii_alphabetic() {
                    names.push(slot_name(&block, slot)?);
                }
            }
        }
        Ok(names)
    }

    pub fn entries(&self, disk: &VirtualDisk) -> FsResult<Vec<DirEntry>> {
        let mut out = Vec::new();
        for i in 0..self.block_count() {
            let block = self.logical_block(disk, i)?;
            for slot in occupied(disk, &block, i)? {
                out.push(DirEntry {
                    name: slot_name(&block, slot)?,
                    inode: slot_inode(&block, slot)?,
                });
            }
        }
        Ok(out)
    }

    pub fn is_empty(&self, disk: &VirtualDisk) -> FsResult<bool> {
        Ok(self.entries(disk)?.is_empty())
    }

    /// Reads logical block `i`.
    ///
    /// # Errors
    /// Returns `OutOfRange` unless `i < block_count()`.
    pub fn logical_block(&self, disk: &VirtualDisk, i: usize) -> FsResult<Block> {
        disk.read_block(self.block_number(disk, i)?)
    }

    /// Releases every block and the inode of an empty, non-root directory.
    ///
    /// # Errors
    /// Returns `InvalidIndex` for the root directory and `NotEmpty` while
    /// entries remain.
    pub fn delete(mut self, disk: &mut VirtualDisk) -> FsResult<()> {
        if self.inode.index == ROOT_INODE {
            return Err(FsError::index(u64::from(ROOT_INODE), 1));
        }
        if !self.is_empty(disk)? {
            return Err(FsError::NotEmpty);
        }
        while self.block_count() > 1 {
            self.shrink(disk)?;
        }
        disk.release_block(self.inode.first_block)?;
        disk.release_inode(self.inode)?;
        debug!(inode = self.inode.index, "directory deleted");
        Ok(())
    }

    fn find(&self, disk: &VirtualDisk, name: &str) -> FsResult<Option<(SlotRef, u32)>> {
        for i in 0..self.block_count() {
            let block = self.logical_block(disk, i)?;
            for slot in occupied(disk, &block, i)? {
                let stored = get_text(block.as_bytes(), slot * DIR_ENTRY_SIZE, DIR_NAME_LEN)?;
                if stored == name.as_bytes() {
                    let at = SlotRef { block: i, slot };
                    return Ok(Some((at, slot_inode(&block, slot)?)));
                }
            }
        }
        Ok(None)
    }

    fn block_number(&self, disk: &VirtualDisk, i: usize) -> FsResult<u32> {
        if i >= self.block_count() {
            return Err(FsError::range(i as u64, self.block_count() as u64));
        }
        let geom = *disk.geometry();
        if i == 0 {
            return Ok(self.inode.first_block);
        }
        let ptrs = self.pointers(disk)?;
        match geom.locate_block(i)? {
            Tier::Root => Ok(self.inode.first_block),
            Tier::Direct(slot) => Ok(ptrs.direct[slot]),
            Tier::Single(k) => SingleIndirect::open(disk, ptrs.single)?.get(k),
            Tier::Double(k) => DoubleIndirect::open(disk, ptrs.double)?.get(k),
        }
    }

    fn pointers(&self, disk: &VirtualDisk) -> FsResult<RootPointers> {
        let root = disk.read_block(self.inode.first_block)?;
        RootPointers::read(disk.geometry(), &root)
    }

    fn set_pointers(&self, disk: &mut VirtualDisk, ptrs: &RootPointers) -> FsResult<()> {
        let mut root = disk.read_block(self.inode.first_block)?;
        ptrs.write(disk.geometry(), &mut root)?;
        disk.write_block(self.inode.first_block, &root)
    }

    /// Adds one zeroed logical block and returns its block number.
    fn grow(&mut self, disk: &mut VirtualDisk) -> FsResult<u32> {
        let geom = *disk.geometry();
        let tier = geom
            .locate_block(self.block_count())
            .map_err(|_| FsError::FileFull("directory"))?;
        let mut ptrs = self.pointers(disk)?;
        let empty = disk.new_block();

        let n = match tier {
            Tier::Root => return Err(FsError::Corrupt("directory has no root block".to_string())),
            Tier::Direct(slot) => {
                let n = disk.allocate_block()?;
                ptrs.direct[slot] = n;
                self.set_pointers(disk, &ptrs)?;
                n
            }
            Tier::Single(0) => {
                let single = SingleIndirect::create(disk, 1)?;
                ptrs.single = single.root();
                self.set_pointers(disk, &ptrs)?;
                single.get(0)?
            }
            Tier::Single(_) => SingleIndirect::open(disk, ptrs.single)?.append(disk, &empty)?,
            Tier::Double(0) => {
                let double = DoubleIndirect::create(disk, 1)?;
                ptrs.double = double.root();
                self.set_pointers(disk, &ptrs)?;
                double.get(0)?
            }
            Tier::Double(_) => DoubleIndirect::open(disk, ptrs.double)?.append_block(disk, &empty)?,
        };

        self.inode.size += 1;
        disk.write_inode(&self.inode)?;
        Ok(n)
    }

    /// Releases the last logical block. The root block is never released here.
    fn shrink(&mut self, disk: &mut VirtualDisk) -> FsResult<()> {
        let last = self.block_count() - 1;
        let geom = *disk.geometry();
        let mut ptrs = self.pointers(disk)?;

        match geom.locate_block(last)? {
            Tier::Root => return Ok(()),
            Tier::Direct(slot) => {
                disk.release_block(ptrs.direct[slot])?;
                ptrs.direct[slot] = NULL_BLOCK;
                self.set_pointers(disk, &ptrs)?;
            }
            Tier::Single(0) => {
                SingleIndirect::open(disk, ptrs.single)?.delete(disk)?;
                ptrs.single = NULL_BLOCK;
                self.set_pointers(disk, &ptrs)?;
            }
            Tier::Single(_) => SingleIndirect::open(disk, ptrs.single)?.remove_last(disk)?,
            Tier::Double(0) => {
                DoubleIndirect::open(disk, ptrs.double)?.delete(disk)?;
                ptrs.double = NULL_BLOCK;
                self.set_pointers(disk, &ptrs)?;
            }
            Tier::Double(k) => DoubleIndirect::open(disk, ptrs.double)?.remove_block_at(disk, k)?,
        }

        self.inode.size -= 1;
        disk.write_inode(&self.inode)
    }
}

/// Entry names are 1 to 20 bytes, start with an ASCII letter and hold no
/// `/` or NUL.
pub fn validate_name(name: &str) -> FsResult<()> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > DIR_NAME_LEN {
        return Err(FsError::invalid(format!(
            "entry name must be 1 to {DIR_NAME_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if !bytes[0].is_ascii_alphabetic() {
        return Err(FsError::invalid(format!("entry name {name:?} must start with a letter")));
    }
    if bytes.iter().any(|b| *b == b'/' || *b == 0) {
        return Err(FsError::invalid(format!("entry name {name:?} holds '/' or NUL")));
    }
    Ok(())
}

fn slots_in(disk: &VirtualDisk, logical: usize) -> usize {
    if logical == 0 {
        disk.geometry().root_dir_slots()
    } else {
        disk.geometry().dir_slots()
    }
}

fn slot_inode(block: &Block, slot: usize) -> FsResult<u32> {
    get_u32(block.as_bytes(), slot * DIR_ENTRY_SIZE + DIR_NAME_LEN)
}

fn slot_name(block: &Block, slot: usize) -> FsResult<String> {
    let raw = get_text(block.as_bytes(), slot * DIR_ENTRY_SIZE, DIR_NAME_LEN)?;
    String::from_utf8(raw.to_vec())
        .map_err(|_| FsError::Corrupt(format!("directory slot {slot} holds a non-UTF-8 name")))
}

fn write_slot(block: &mut Block, slot: usize, name: &str, index: u32) -> FsResult<()> {
    let off = slot * DIR_ENTRY_SIZE;
    put_text(block.as_bytes_mut(), off, DIR_NAME_LEN, name.as_bytes())?;
    put_u32(block.as_bytes_mut(), off + DIR_NAME_LEN, index)
}

fn clear_slot(block: &mut Block, slot: usize) -> FsResult<()> {
    clear(block.as_bytes_mut(), slot * DIR_ENTRY_SIZE, DIR_NAME_LEN + INT_SIZE)
}

/// Occupied slots of logical block `logical`, in slot order.
fn occupied(disk: &VirtualDisk, block: &Block, logical: usize) -> FsResult<Vec<usize>> {
    let mut slots = Vec::new();
    for slot in 0..slots_in(disk, logical) {
        if slot_inode(block, slot)? != 0 {
            slots.push(slot);
        }
    }
    Ok(slots)
}
