//! Pointer blocks that turn a block of block numbers into a resizable
//! sequence of data blocks.
//!
//! Neither view stores its length on disk. The length is recovered by
//! scanning pointer slots up to the first zero, which is sound because the
//! allocator never hands out block 0.

pub mod double;
pub mod single;

pub use double::DoubleIndirect;
pub use single::SingleIndirect;

use crate::constants::{INT_SIZE, NULL_BLOCK};
use crate::error::{FsError, FsResult};
use crate::layout::codec::{get_u32, put_u32};
use crate::retention::disk::VirtualDisk;

/// Reads the dense prefix of non-zero pointers stored in block `root`.
pub(crate) fn load_pointers(disk: &VirtualDisk, root: u32) -> FsResult<Vec<u32>> {
    let block = disk.read_block(root)?;
    let mut pointers = Vec::new();
    for slot in 0..disk.geometry().pointers_per_block() {
        let n = get_u32(block.as_bytes(), slot * INT_SIZE)?;
        if n == NULL_BLOCK {
            break;
        }
        if n >= disk.capacity() {
            return Err(FsError::Corrupt(format!(
                "pointer block {root} slot {slot} names block {n}"
            )));
        }
        pointers.push(n);
    }
    Ok(pointers)
}

/// Rewrites block `root` with `pointers` followed by zeroed slots.
pub(crate) fn store_pointers(disk: &mut VirtualDisk, root: u32, pointers: &[u32]) -> FsResult<()> {
    let mut block = disk.new_block();
    for (slot, n) in pointers.iter().enumerate() {
        put_u32(block.as_bytes_mut(), slot * INT_SIZE, *n)?;
    }
    disk.write_block(root, &block)
}

/// Splits `payload` into block-sized, zero-padded writes against `targets`.
pub(crate) fn spread_payload(
    disk: &mut VirtualDisk,
    targets: &[u32],
    payload: &[u8],
) -> FsResult<()> {
    let bs = disk.block_size();
    if payload.len() > targets.len() * bs {
        return Err(FsError::invalid(format!(
            "payload of {} bytes exceeds {} blocks",
            payload.len(),
            targets.len()
        )));
    }
    let mut chunks = payload.chunks(bs);
    for n in targets {
        let mut block = disk.new_block();
        if let Some(chunk) = chunks.next() {
            block.as_bytes_mut()[..chunk.len()].copy_from_slice(chunk);
        }
        disk.write_block(*n, &block)?;
    }
    Ok(())
}

/// Concatenates the contents of `targets` in order.
pub(crate) fn gather_payload(disk: &VirtualDisk, targets: &[u32]) -> FsResult<Vec<u8>> {
    let mut out = Vec::with_capacity(targets.len() * disk.block_size());
    let mut block = disk.new_block();
    for n in targets {
        disk.read_block_into(*n, &mut block)?;
        out.extend_from_slice(block.as_bytes());
    }
    Ok(out)
}
