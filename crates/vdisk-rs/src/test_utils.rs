use rand::Rng;
use rand::distr::Alphanumeric;
use tempfile::TempDir;

use crate::retention::disk::VirtualDisk;

/// Formats and opens a throw-away disk inside a fresh temp directory.
pub fn temp_disk(capacity: u32, block_size: u32) -> (TempDir, VirtualDisk) {
    let dir = TempDir::new().expect("tmp dir");
    let path = dir.path().join("unit.disk");
    VirtualDisk::format(&path, capacity, block_size).expect("format");
    let disk = VirtualDisk::open(&path).expect("open");
    (dir, disk)
}

/// Snapshot of both free lists, compared before and after a round trip.
pub fn free_counts(disk: &VirtualDisk) -> (u32, u32) {
    (
        disk.free_block_count().expect("free blocks"),
        disk.free_inode_count().expect("free inodes"),
    )
}

pub fn random_text(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
