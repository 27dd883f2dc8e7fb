//! Block and inode storage engine for a Unix-style file system living inside
//! a single host file used as a raw block device.
#![allow(clippy::cargo_common_metadata)]

pub mod constants;
pub mod content;
pub mod error;
pub mod indirect;
pub mod layout;
pub mod metrics;
pub mod retention;

#[cfg(test)]
pub(crate) mod test_utils;

pub use content::directory::{DirEntry, Directory};
pub use content::file::File;
pub use error::{FsError, FsResult};
pub use layout::block::Block;
pub use layout::inode::{Inode, InodeKind};
pub use retention::disk::VirtualDisk;
