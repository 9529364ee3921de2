//! XDR primitives (RFC 4506) over `bytes` buffers
//!
//! Everything is big-endian and padded to 4-byte units.

use bytes::{Buf, BufMut};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XdrError {
    #[error("unexpected end of message: needed {needed} bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("opaque field of {len} bytes exceeds limit of {max}")]
    TooLong { len: usize, max: usize },
    #[error("invalid boolean discriminant {0}")]
    InvalidBool(u32),
    #[error("invalid {name} value {value}")]
    InvalidEnum { name: &'static str, value: u32 },
    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

fn ensure(remaining: usize, needed: usize) -> Result<(), XdrError> {
    if remaining < needed {
        return Err(XdrError::UnexpectedEof { needed, remaining });
    }
    Ok(())
}

fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

pub fn read_u32(buf: &mut impl Buf) -> Result<u32, XdrError> {
    ensure(buf.remaining(), 4)?;
    Ok(buf.get_u32())
}

pub fn read_u64(buf: &mut impl Buf) -> Result<u64, XdrError> {
    ensure(buf.remaining(), 8)?;
    Ok(buf.get_u64())
}

pub fn read_bool(buf: &mut impl Buf) -> Result<bool, XdrError> {
    match read_u32(buf)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(XdrError::InvalidBool(other)),
    }
}

/// Variable-length opaque of at most `max` bytes
pub fn read_opaque(buf: &mut impl Buf, max: usize) -> Result<Vec<u8>, XdrError> {
    let len = read_u32(buf)? as usize;
    if len > max {
        return Err(XdrError::TooLong { len, max });
    }
    let padded = len + padding(len);
    ensure(buf.remaining(), padded)?;

    let mut data = vec![0u8; len];
    buf.copy_to_slice(&mut data);
    buf.advance(padding(len));
    Ok(data)
}

pub fn read_string(buf: &mut impl Buf, max: usize) -> Result<String, XdrError> {
    String::from_utf8(read_opaque(buf, max)?).map_err(|_| XdrError::InvalidUtf8)
}

pub fn write_u32(buf: &mut impl BufMut, value: u32) {
    buf.put_u32(value);
}

pub fn write_u64(buf: &mut impl BufMut, value: u64) {
    buf.put_u64(value);
}

pub fn write_bool(buf: &mut impl BufMut, value: bool) {
    buf.put_u32(u32::from(value));
}

pub fn write_opaque(buf: &mut impl BufMut, data: &[u8]) {
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
    buf.put_bytes(0, padding(data.len()));
}

pub fn write_string(buf: &mut impl BufMut, value: &str) {
    write_opaque(buf, value.as_bytes());
}
