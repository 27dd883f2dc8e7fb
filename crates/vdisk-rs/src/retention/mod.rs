//! Retention layer: the virtual disk, its superblock and its allocators.

pub mod disk;
