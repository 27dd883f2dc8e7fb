use crate::constants::{DIRECT_POINTERS, NULL_BLOCK};
use crate::error::FsResult;
use crate::layout::block::Block;
use crate::layout::codec::{get_u32, put_u32};
use crate::layout::geometry::Geometry;

/// Pointer region at the tail of a content root block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RootPointers {
    pub direct: [u32; DIRECT_POINTERS],
    pub single: u32,
    pub double: u32,
}

impl RootPointers {
    pub fn read(geom: &Geometry, root: &Block) -> FsResult<Self> {
        let bytes = root.as_bytes();
        let mut direct = [NULL_BLOCK; DIRECT_POINTERS];
        for (slot, n) in direct.iter_mut().enumerate() {
            *n = get_u32(bytes, geom.direct_offset(slot))?;
        }
        Ok(Self {
            direct,
            single: get_u32(bytes, geom.single_offset())?,
            double: get_u32(bytes, geom.double_offset())?,
        })
    }

    pub fn write(&self, geom: &Geometry, root: &mut Block) -> FsResult<()> {
        let bytes = root.as_bytes_mut();
        for (slot, n) in self.direct.iter().enumerate() {
            put_u32(bytes, geom.direct_offset(slot), *n)?;
        }
        put_u32(bytes, geom.single_offset(), self.single)?;
        put_u32(bytes, geom.double_offset(), self.double)
    }
}
