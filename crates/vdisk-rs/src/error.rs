//! Error kinds raised by the storage engine.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("position {index} out of range (limit {limit})")]
    OutOfRange { index: u64, limit: u64 },
    #[error("invalid index {index} (limit {limit})")]
    InvalidIndex { index: u64, limit: u64 },
    #[error("buffer holds {actual} bytes, block size is {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("disk is full: {0}")]
    DiskFull(&'static str),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("directory is not empty")]
    NotEmpty,
    #[error("invalid disk parameters: capacity = {capacity}, block size = {block_size}")]
    InvalidParameters { capacity: u64, block_size: u64 },
    #[error("{0} has no room for more blocks")]
    FileFull(&'static str),
    #[error("corrupt disk: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) const fn range(index: u64, limit: u64) -> Self {
        Self::OutOfRange { index, limit }
    }

    pub(crate) const fn index(index: u64, limit: u64) -> Self {
        Self::InvalidIndex { index, limit }
    }
}
