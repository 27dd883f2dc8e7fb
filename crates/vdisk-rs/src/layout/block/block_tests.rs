use super::*;

#[test]
fn new_is_zero_filled_for_various_sizes() {
    for size in [8usize, 32, 64, 256, 4096] {
        let b = Block::new(size).expect("valid size");
        assert_eq!(b.capacity(), size);
        assert!(b.as_bytes().iter().all(|&x| x == 0));
    }
}

#[test]
fn rejects_small_or_non_power_of_two_capacity() {
    for size in [0usize, 1, 4, 7, 12, 100, 255] {
        assert!(
            matches!(Block::new(size), Err(FsError::InvalidParameters { .. })),
            "size {size} must be rejected"
        );
    }
}

#[test]
fn get_set_are_bounds_checked() {
    let mut b = Block::new(8).unwrap();
    b.set(0, 0xAB).unwrap();
    b.set(7, 0xCD).unwrap();
    assert_eq!(b.get(0).unwrap(), 0xAB);
    assert_eq!(b.get(7).unwrap(), 0xCD);

    assert!(matches!(b.get(8), Err(FsError::OutOfRange { .. })));
    assert!(matches!(b.set(8, 1), Err(FsError::OutOfRange { .. })));
}

#[test]
fn as_bytes_mut_exposes_backing_storage() {
    let mut b = Block::new(8).unwrap();
    b.as_bytes_mut()[3] = 9;
    assert_eq!(b.as_bytes(), &[0, 0, 0, 9, 0, 0, 0, 0]);

    b.clear();
    assert_eq!(b.as_bytes(), &[0u8; 8]);
}
