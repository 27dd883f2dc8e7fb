//! Content engines bound to one inode: regular files and directories.
//!
//! Both share the four-tier layout of a content root block: an inline
//! region, three direct pointers, one single-indirect pointer and one
//! double-indirect pointer.

pub mod directory;
pub mod file;
mod tiers;
