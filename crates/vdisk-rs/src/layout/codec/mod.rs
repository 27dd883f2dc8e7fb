//! Marshalling of 32-bit integers and fixed-width text into byte buffers.
//!
//! Integers are stored big-endian: the most significant byte sits at the
//! lowest index of its 4-byte slot. Text fields are NUL-padded to their width.


use crate::constants::INT_SIZE;
use crate::error::{FsError, FsResult};

fn span(buf_len: usize, offset: usize, len: usize) -> FsResult<std::ops::Range<usize>> {
    let end = offset
        .checked_add(len)
        .ok_or(FsError::range(offset as u64, buf_len as u64))?;
    if end > buf_len {
        return Err(FsError::range(end as u64, buf_len as u64));
    }
    Ok(offset..end)
}

/// `put_u32` writes `value` into the four bytes starting at `offset`.
///
/// # Errors
/// Returns `OutOfRange` if the slot does not fit inside `buf`.
pub fn put_u32(buf: &mut [u8], offset: usize, value: u32) -> FsResult<()> {
    let range = span(buf.len(), offset, INT_SIZE)?;
    buf[range].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// `get_u32` reads the integer stored in the four bytes starting at `offset`.
///
/// # Errors
/// Returns `OutOfRange` if the slot does not fit inside `buf`.
pub fn get_u32(buf: &[u8], offset: usize) -> FsResult<u32> {
    let range = span(buf.len(), offset, INT_SIZE)?;
    let mut raw = [0u8; INT_SIZE];
    raw.copy_from_slice(&buf[range]);
    Ok(u32::from_be_bytes(raw))
}

/// `put_text` stores `text` in the `width`-byte field at `offset`, zero-filling
/// whatever the text leaves unused.
///
/// # Errors
/// Returns `InvalidArgument` if `text` is wider than the field and
/// `OutOfRange` if the field does not fit inside `buf`.
pub fn put_text(buf: &mut [u8], offset: usize, width: usize, text: &[u8]) -> FsResult<()> {
    if text.len() > width {
        return Err(FsError::invalid(format!(
            "text of {} bytes does not fit a {width}-byte field",
            text.len()
        )));
    }
    let range = span(buf.len(), offset, width)?;
    let field = &mut buf[range];
    field[..text.len()].copy_from_slice(text);
    field[text.len()..].fill(0);
    Ok(())
}

/// `get_text` returns the bytes of the field at `offset` up to its first NUL.
///
/// # Errors
/// Returns `OutOfRange` if the field does not fit inside `buf`.
pub fn get_text(buf: &[u8], offset: usize, width: usize) -> FsResult<&[u8]> {
    let range = span(buf.len(), offset, width)?;
    let field = &buf[range];
    let end = field.iter().position(|b| *b == 0).unwrap_or(width);
    Ok(&field[..end])
}

/// `clear` zero-fills `len` bytes starting at `offset`.
///
/// # Errors
/// Returns `OutOfRange` if the region does not fit inside `buf`.
pub fn clear(buf: &mut [u8], offset: usize, len: usize) -> FsResult<()> {
    let range = span(buf.len(), offset, len)?;
    buf[range].fill(0);
    Ok(())
}

/// `is_blank` reports whether `bytes` holds nothing but NULs and ASCII whitespace.
#[must_use]
pub fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0 || b.is_ascii_whitespace())
}
