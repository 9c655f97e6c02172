//! Little-endian cursor helpers shared by the field and frame codecs.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::MarshalError;

/// Splits `count` bytes off the front of `input`.
pub(crate) fn take<'a>(
    input: &mut &'a [u8],
    count: usize,
    path: &str,
) -> Result<&'a [u8], MarshalError> {
    let Some((head, tail)) = input.split_at_checked(count) else {
        return Err(MarshalError::truncated(path, count, input.len()));
    };
    *input = tail;
    Ok(head)
}

pub(crate) fn read_u8(input: &mut &[u8], path: &str) -> Result<u8, MarshalError> {
    let mut raw = take(input, 1, path)?;
    Ok(raw.get_u8())
}

pub(crate) fn read_u32(input: &mut &[u8], path: &str) -> Result<u32, MarshalError> {
    let mut raw = take(input, 4, path)?;
    Ok(raw.get_u32_le())
}

/// Reads a `u32` length prefix.
pub(crate) fn read_len(input: &mut &[u8], path: &str) -> Result<usize, MarshalError> {
    let len = read_u32(input, path)?;
    usize::try_from(len).map_err(|_| MarshalError::malformed(format!("'{path}' length {len}")))
}

/// Writes a `u32` length prefix.
pub(crate) fn put_len(out: &mut BytesMut, len: usize, path: &str) -> Result<(), MarshalError> {
    let prefix = u32::try_from(len).map_err(|_| MarshalError::OutOfRange {
        path: path.to_owned(),
        expected: "u32 length prefix".to_owned(),
        reason: format!("{len} exceeds {}", u32::MAX),
    })?;
    out.put_u32_le(prefix);
    Ok(())
}

/// Reads a length-prefixed UTF-8 name used in frame headers.
pub(crate) fn read_name(input: &mut &[u8], path: &str) -> Result<String, MarshalError> {
    let len = read_len(input, path)?;
    let raw = take(input, len, path)?;
    String::from_utf8(raw.to_vec())
        .map_err(|err| MarshalError::malformed(format!("'{path}' is not UTF-8: {err}")))
}

/// Writes a length-prefixed UTF-8 name used in frame headers.
pub(crate) fn put_name(out: &mut BytesMut, name: &str, path: &str) -> Result<(), MarshalError> {
    put_len(out, name.len(), path)?;
    out.put_slice(name.as_bytes());
    Ok(())
}
