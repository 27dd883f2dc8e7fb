use super::VirtualDisk;
use crate::constants::{INT_SIZE, NULL_BLOCK, ROOT_INODE, SB_FREE_LIST_HEAD, SUPERBLOCK_LEN};
use crate::error::FsError;
use crate::layout::codec::{get_u32, put_u32};
use crate::layout::inode::{Inode, InodeKind};
use crate::test_utils::{free_counts, temp_disk};
use tempfile::TempDir;

#[test]
fn format_then_open_reproduces_geometry() {
    for (capacity, block_size) in [(4u32, 32u32), (64, 64), (128, 32), (1024, 256), (256, 512)] {
        let dir = TempDir::new().expect("tmp dir");
        let path = dir.path().join("d");
        VirtualDisk::format(&path, capacity, block_size).expect("format");

        let disk = VirtualDisk::open(&path).expect("open");
        assert_eq!(disk.capacity(), capacity);
        assert_eq!(disk.block_size(), block_size as usize);
        let expected_inodes = (u64::from(capacity) * u64::from(block_size) / 100).max(1);
        assert_eq!(u64::from(disk.inode_count()), expected_inodes);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            u64::from(capacity) * u64::from(block_size)
        );
    }
}

#[test]
fn superblock_bytes_are_big_endian() {
    let (_dir, disk) = temp_disk(64, 64);
    let block0 = disk.read_block(0).expect("block 0 is readable");
    let raw = &block0.as_bytes()[..SUPERBLOCK_LEN];
    assert_eq!(&raw[0..4], &[0, 0, 0, 64]);
    assert_eq!(&raw[4..8], &[0, 0, 0, 64]);
    assert_eq!(get_u32(raw, 16).unwrap(), 1);
    assert_eq!(get_u32(raw, 20).unwrap(), 40);
}

#[test]
fn format_binds_root_directory() {
    let (_dir, disk) = temp_disk(64, 64);
    let root = disk.root_inode().unwrap();
    assert_eq!(root.index, ROOT_INODE);
    assert_eq!(root.kind, InodeKind::Directory);
    assert_eq!(root.size, 1);
    assert!(root.first_block >= disk.first_data_block());
    assert!(disk.read_block(root.first_block).unwrap().as_bytes().iter().all(|b| *b == 0));

    // 64 blocks: superblock, 6 table blocks, root block.
    assert_eq!(disk.free_block_count().unwrap(), 64 - 7 - 1);
    assert_eq!(disk.free_inode_count().unwrap(), 39);
}

#[test]
fn format_rejects_existing_name_and_bad_parameters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("d");
    VirtualDisk::format(&path, 64, 64).unwrap();
    assert!(matches!(
        VirtualDisk::format(&path, 64, 64),
        Err(FsError::AlreadyExists(_))
    ));

    for (capacity, block_size) in [(63u32, 64u32), (64, 48), (64, 16), (0, 64), (2, 32)] {
        let other = dir.path().join(format!("bad-{capacity}-{block_size}"));
        assert!(
            matches!(
                VirtualDisk::format(&other, capacity, block_size),
                Err(FsError::InvalidParameters { .. })
            ),
            "{capacity}x{block_size} must be rejected"
        );
        assert!(!other.exists(), "rejected format must not leave a file");
    }
}

#[test]
fn open_and_destroy_missing_disk_fail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope");
    assert!(matches!(VirtualDisk::open(&path), Err(FsError::NotFound(_))));
    assert!(matches!(VirtualDisk::destroy(&path), Err(FsError::NotFound(_))));
}

#[test]
fn destroy_removes_backing_store() {
    let (dir, disk) = temp_disk(64, 64);
    let path = disk.path().to_path_buf();
    disk.close().unwrap();
    VirtualDisk::destroy(&path).unwrap();
    assert!(!path.exists());
    drop(dir);
}

#[test]
fn open_rejects_truncated_store() {
    let (_dir, disk) = temp_disk(64, 64);
    let path = disk.path().to_path_buf();
    disk.close().unwrap();

    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(64 * 32).unwrap();
    drop(file);
    assert!(matches!(VirtualDisk::open(&path), Err(FsError::Corrupt(_))));
}

#[test]
fn open_rejects_free_list_head_inside_inode_table() {
    let (_dir, disk) = temp_disk(64, 64);
    let path = disk.path().to_path_buf();
    disk.close().unwrap();

    let mut raw = std::fs::read(&path).unwrap();
    put_u32(&mut raw, SB_FREE_LIST_HEAD, 1).unwrap();
    std::fs::write(&path, raw).unwrap();
    assert!(matches!(VirtualDisk::open(&path), Err(FsError::Corrupt(_))));
}

#[test]
fn block_io_bounds_and_size_checks() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let block = disk.new_block();

    assert!(matches!(disk.write_block(0, &block), Err(FsError::OutOfRange { .. })));
    assert!(matches!(disk.write_block(64, &block), Err(FsError::OutOfRange { .. })));
    assert!(matches!(disk.read_block(64), Err(FsError::OutOfRange { .. })));

    let wrong = crate::layout::block::Block::new(32).unwrap();
    assert!(matches!(
        disk.write_block(10, &wrong),
        Err(FsError::SizeMismatch { expected: 64, actual: 32 })
    ));
}

#[test]
fn block_write_read_is_exact() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let n = disk.allocate_block().unwrap();
    let mut block = disk.new_block();
    for (i, b) in block.as_bytes_mut().iter_mut().enumerate() {
        *b = (i * 7) as u8;
    }
    disk.write_block(n, &block).unwrap();
    assert_eq!(disk.read_block(n).unwrap().as_bytes(), block.as_bytes());
}

#[test]
fn allocate_release_round_trip_restores_state() {
    let (_dir, mut disk) = temp_disk(128, 32);
    let before = free_counts(&disk);
    let sb_before = *disk.superblock();

    let n = disk.allocate_block().unwrap();
    assert_eq!(disk.free_block_count().unwrap(), before.0 - 1);
    disk.release_block(n).unwrap();

    assert_eq!(free_counts(&disk), before);
    assert_eq!(*disk.superblock(), sb_before);
    assert_eq!(disk.allocate_block().unwrap(), n, "free list is a stack");
}

#[test]
fn allocator_donates_exhausted_free_list_block() {
    let (_dir, mut disk) = temp_disk(128, 32);
    let head = disk.superblock().free_list_head;
    let cursor = disk.superblock().free_list_cursor;
    let list = disk.read_block(head).unwrap();
    let link = get_u32(list.as_bytes(), 0).unwrap();

    for _ in 0..cursor {
        let n = disk.allocate_block().unwrap();
        assert_ne!(n, head);
    }
    assert_eq!(disk.superblock().free_list_cursor, 0);

    let donated = disk.allocate_block().unwrap();
    assert_eq!(donated, head);
    assert_eq!(disk.superblock().free_list_head, link);
    assert_eq!(disk.superblock().free_list_cursor, 32 / INT_SIZE as u32 - 1);
    assert!(
        disk.read_block(donated).unwrap().as_bytes().iter().all(|b| *b == 0),
        "donated block is handed out zeroed"
    );
}

#[test]
fn release_starts_new_free_list_block_when_head_is_full() {
    let (_dir, mut disk) = temp_disk(128, 32);
    // Drain until a fresh head block is full (cursor at the last slot).
    let mut taken = Vec::new();
    while disk.superblock().free_list_cursor != 32 / INT_SIZE as u32 - 1 || taken.is_empty() {
        taken.push(disk.allocate_block().unwrap());
    }
    let old_head = disk.superblock().free_list_head;

    let n = taken.pop().unwrap();
    disk.release_block(n).unwrap();
    assert_eq!(disk.superblock().free_list_head, n);
    assert_eq!(disk.superblock().free_list_cursor, 0);
    assert_eq!(get_u32(disk.read_block(n).unwrap().as_bytes(), 0).unwrap(), old_head);
}

#[test]
fn exhausting_free_list_reports_disk_full() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let available = 64 - disk.first_data_block() - 1;
    let mut seen = std::collections::HashSet::new();
    for _ in 0..available {
        let n = disk.allocate_block().unwrap();
        assert!(n >= disk.first_data_block() && n < 64);
        assert!(seen.insert(n), "block {n} handed out twice");
    }
    assert_eq!(disk.superblock().free_list_head, NULL_BLOCK);
    assert_eq!(disk.free_block_count().unwrap(), 0);
    assert!(matches!(disk.allocate_block(), Err(FsError::DiskFull(_))));

    // The first release on an empty list seeds a new head.
    let n = *seen.iter().next().unwrap();
    disk.release_block(n).unwrap();
    assert_eq!(disk.superblock().free_list_head, n);
    assert_eq!(disk.free_block_count().unwrap(), 1);
}

#[test]
fn corrupt_free_list_pointer_leaves_superblock_untouched() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let before = *disk.superblock();
    let head = before.free_list_head;
    let cursor = before.free_list_cursor as usize;
    assert_ne!(cursor, 0);

    let mut list = disk.read_block(head).unwrap();
    put_u32(list.as_bytes_mut(), cursor * INT_SIZE, 1).unwrap();
    disk.write_block(head, &list).unwrap();

    assert!(matches!(disk.allocate_block(), Err(FsError::Corrupt(_))));
    assert_eq!(*disk.superblock(), before);
}

#[test]
fn corrupt_free_list_link_leaves_superblock_untouched() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let head = disk.superblock().free_list_head;
    for _ in 0..disk.superblock().free_list_cursor {
        disk.allocate_block().unwrap();
    }
    let before = *disk.superblock();
    assert_eq!(before.free_list_cursor, 0);

    let mut list = disk.read_block(head).unwrap();
    put_u32(list.as_bytes_mut(), 0, 2).unwrap();
    disk.write_block(head, &list).unwrap();

    assert!(matches!(disk.allocate_block(), Err(FsError::Corrupt(_))));
    assert_eq!(*disk.superblock(), before);
}

#[test]
fn release_block_rejects_reserved_and_out_of_range() {
    let (_dir, mut disk) = temp_disk(64, 64);
    for n in [0u32, 1, 6, 64, 1000] {
        assert!(
            matches!(disk.release_block(n), Err(FsError::InvalidIndex { .. })),
            "block {n} must be rejected"
        );
    }
}

#[test]
fn released_blocks_are_zeroed() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let a = disk.allocate_block().unwrap();
    let b = disk.allocate_block().unwrap();
    let mut block = disk.new_block();
    block.as_bytes_mut().fill(0xEE);
    disk.write_block(a, &block).unwrap();
    disk.release_block(a).unwrap();
    disk.release_block(b).unwrap();
    // `a` sits in the head list's pointer slots, not holding a list itself.
    assert!(disk.read_block(a).unwrap().as_bytes().iter().all(|x| *x == 0));
}

#[test]
fn inode_allocation_walks_and_rebuilds_free_list() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let a = disk.allocate_inode().unwrap();
    let b = disk.allocate_inode().unwrap();
    assert_eq!((a.index, b.index), (1, 2));
    assert_eq!(a.first_block, NULL_BLOCK);
    assert_eq!(disk.free_inode_count().unwrap(), 37);

    disk.release_inode(a).unwrap();
    assert_eq!(disk.superblock().free_inode_head, 1);
    let stored = disk.read_inode(1).unwrap();
    assert_eq!(stored.first_block, 3);
    assert_eq!((stored.size, stored.kind), (0, InodeKind::File));
    assert_eq!(disk.allocate_inode().unwrap().index, 1);
}

#[test]
fn inode_exhaustion_and_bounds() {
    let (_dir, mut disk) = temp_disk(4, 32);
    // 128 bytes -> one inode, reserved for the root.
    assert_eq!(disk.inode_count(), 1);
    assert!(matches!(disk.allocate_inode(), Err(FsError::DiskFull(_))));

    let root = disk.root_inode().unwrap();
    assert!(matches!(disk.release_inode(root), Err(FsError::InvalidIndex { .. })));
    assert!(matches!(disk.read_inode(1), Err(FsError::InvalidIndex { .. })));
    assert!(matches!(
        disk.write_inode(&Inode::new(5, 0, 0, InodeKind::File)),
        Err(FsError::InvalidIndex { .. })
    ));
}

#[test]
fn inode_write_read_round_trip() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let mut inode = disk.allocate_inode().unwrap();
    inode.first_block = 33;
    inode.size = 4;
    inode.kind = InodeKind::Directory;
    disk.write_inode(&inode).unwrap();
    assert_eq!(disk.read_inode(inode.index).unwrap(), inode);
}

#[test]
fn allocator_state_survives_close_and_open() {
    let (_dir, mut disk) = temp_disk(64, 64);
    let path = disk.path().to_path_buf();
    let first = disk.allocate_block().unwrap();
    let second = disk.allocate_block().unwrap();
    let inode = disk.allocate_inode().unwrap();
    let sb = *disk.superblock();
    let counts = free_counts(&disk);
    disk.close().unwrap();

    let mut disk = VirtualDisk::open(&path).unwrap();
    assert_eq!(*disk.superblock(), sb);
    assert_eq!(free_counts(&disk), counts);
    assert_ne!(disk.allocate_block().unwrap(), first);
    assert_ne!(disk.allocate_inode().unwrap().index, inode.index);
    disk.release_block(second).unwrap();
}

#[test]
fn has_capacity_for_uses_root_size() {
    let (_dir, disk) = temp_disk(64, 64);
    assert!(disk.has_capacity_for(63).unwrap());
    assert!(!disk.has_capacity_for(64).unwrap());
}
