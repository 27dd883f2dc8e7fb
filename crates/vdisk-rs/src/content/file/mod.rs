
use tracing::debug;

use super::tiers::RootPointers;
use crate::constants::NULL_BLOCK;
use crate::error::{FsError, FsResult};
use crate::indirect::{DoubleIndirect, SingleIndirect};
use crate::layout::geometry::Geometry;
use crate::layout::inode::{Inode, InodeKind};
use crate::retention::disk::VirtualDisk;

pub use crate::layout::geometry::max_payload;

/// File is a view over one regular-file inode.
///
/// The payload is UTF-8 text laid out inline first, then over the direct
/// blocks, the single-indirect tier and the double-indirect tier. Unused
/// bytes are NUL, so the text length is recovered from the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct File {
    inode: Inode,
}

impl File {
    /// Allocates an inode and root block and stores `text` across the tiers.
    ///
    /// # Errors
    /// Returns `InvalidArgument` before allocating anything if `text` holds a
    /// NUL byte or exceeds the payload limit, and `DiskFull` if the allocators
    /// run dry part way.
    pub fn create(disk: &mut VirtualDisk, text: &str) -> FsResult<Self> {
        validate(disk.geometry(), text)?;

        let mut inode = disk.allocate_inode()?;
        inode.first_block = disk.allocate_block()?;
        inode.kind = InodeKind::File;
        inode.size = size_hint(disk.geometry(), text.len());
        store(disk, inode.first_block, text.as_bytes())?;
        disk.write_inode(&inode)?;

        debug!(
            inode = inode.index,
            root = inode.first_block,
            bytes = text.len(),
            "file created"
        );
        Ok(Self { inode })
    }

    /// Binds to the existing file inode `index`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the inode is a directory.
    pub fn open(disk: &VirtualDisk, index: u32) -> FsResult<Self> {
        let inode = disk.read_inode(index)?;
        if inode.is_directory() {
            return Err(FsError::invalid(format!("inode {index} is a directory")));
        }
        Ok(Self { inode })
    }

    #[must_use]
    pub const fn inode(&self) -> Inode {
        self.inode
    }

    /// Concatenates the inline region, the direct blocks and both indirect
    /// payloads, stopping at the first NUL.
    ///
    /// # Errors
    /// Returns `Corrupt` if the stored bytes are not UTF-8.
    pub fn read(&self, disk: &VirtualDisk) -> FsResult<String> {
        let geom = *disk.geometry();
        let root = disk.read_block(self.inode.first_block)?;
        let ptrs = RootPointers::read(&geom, &root)?;

        let mut bytes = root.as_bytes()[..geom.inline_len()].to_vec();
        for n in ptrs.direct.iter().filter(|n| **n != NULL_BLOCK) {
            bytes.extend_from_slice(disk.read_block(*n)?.as_bytes());
        }
        if ptrs.single != NULL_BLOCK {
            bytes.extend(SingleIndirect::open(disk, ptrs.single)?.read_payload(disk)?);
        }
        if ptrs.double != NULL_BLOCK {
            bytes.extend(DoubleIndirect::open(disk, ptrs.double)?.read_payload(disk)?);
        }

        if let Some(end) = bytes.iter().position(|b| *b == 0) {
            bytes.truncate(end);
        }
        String::from_utf8(bytes).map_err(|err| {
            FsError::Corrupt(format!(
                "file inode {} holds non-UTF-8 text: {err}",
                self.inode.index
            ))
        })
    }

    /// Replaces the whole payload with `text`.
    ///
    /// Both free lists are stacks, so the rewritten file comes back on the
    /// same inode index and root block.
    pub fn overwrite(&mut self, disk: &mut VirtualDisk, text: &str) -> FsResult<()> {
        validate(disk.geometry(), text)?;
        self.release(disk)?;
        *self = Self::create(disk, text)?;
        Ok(())
    }

    /// Rewrites the file with `text` added after the current payload.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the combined text is over the limit; the
    /// file is left untouched in that case.
    pub fn append(&mut self, disk: &mut VirtualDisk, text: &str) -> FsResult<()> {
        let mut combined = self.read(disk)?;
        combined.push_str(text);
        self.overwrite(disk, &combined)
    }

    /// Releases every block the file owns and returns its inode.
    pub fn delete(self, disk: &mut VirtualDisk) -> FsResult<()> {
        self.release(disk)?;
        debug!(inode = self.inode.index, "file deleted");
        Ok(())
    }

    fn release(&self, disk: &mut VirtualDisk) -> FsResult<()> {
        let geom = *disk.geometry();
        let root = disk.read_block(self.inode.first_block)?;
        let ptrs = RootPointers::read(&geom, &root)?;

        for n in ptrs.direct.iter().filter(|n| **n != NULL_BLOCK) {
            disk.release_block(*n)?;
        }
        if ptrs.single != NULL_BLOCK {
            SingleIndirect::open(disk, ptrs.single)?.delete(disk)?;
        }
        if ptrs.double != NULL_BLOCK {
            DoubleIndirect::open(disk, ptrs.double)?.delete(disk)?;
        }
        disk.release_block(self.inode.first_block)?;
        disk.release_inode(self.inode)
    }
}

fn validate(geom: &Geometry, text: &str) -> FsResult<()> {
    if text.as_bytes().contains(&0) {
        return Err(FsError::invalid("file text must not contain NUL bytes"));
    }
    if text.len() as u64 > geom.max_payload() {
        return Err(FsError::invalid(format!(
            "text of {} bytes exceeds the {}-byte file limit",
            text.len(),
            geom.max_payload()
        )));
    }
    Ok(())
}

/// Legacy used-block hint: one root block plus the blocks the text would fill.
fn size_hint(geom: &Geometry, len: usize) -> u32 {
    u32::try_from(len.div_ceil(geom.block_size()) + 1).unwrap_or(u32::MAX)
}

fn store(disk: &mut VirtualDisk, root_block: u32, payload: &[u8]) -> FsResult<()> {
    let geom = *disk.geometry();
    let bs = geom.block_size();
    let mut root = disk.new_block();
    let mut ptrs = RootPointers::default();

    let inline = payload.len().min(geom.inline_len());
    root.as_bytes_mut()[..inline].copy_from_slice(&payload[..inline]);
    let mut rest = &payload[inline..];

    for slot in &mut ptrs.direct {
        if rest.is_empty() {
            break;
        }
        let take = rest.len().min(bs);
        let n = disk.allocate_block()?;
        let mut block = disk.new_block();
        block.as_bytes_mut()[..take].copy_from_slice(&rest[..take]);
        disk.write_block(n, &block)?;
        *slot = n;
        rest = &rest[take..];
    }

    if !rest.is_empty() {
        let count = rest.len().div_ceil(bs).min(geom.single_capacity());
        let take = rest.len().min(count * bs);
        let single = SingleIndirect::create(disk, count)?;
        single.write_payload(disk, &rest[..take])?;
        ptrs.single = single.root();
        rest = &rest[take..];
    }

    if !rest.is_empty() {
        let double = DoubleIndirect::create(disk, rest.len().div_ceil(bs))?;
        double.write_payload(disk, rest)?;
        ptrs.double = double.root();
    }

    ptrs.write(&geom, &mut root)?;
    disk.write_block(root_block, &root)
}
