//! Byte-level layout primitives: block buffers, integer/text marshalling,
//! disk geometry and the inode record.

pub mod block;
pub mod codec;
pub mod geometry;
pub mod inode;
