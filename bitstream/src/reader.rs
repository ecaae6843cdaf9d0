//! Bounds-checked read cursor over a byte slice.

use crate::error::{BitError, BitResult};

/// Maximum encoded length of a `u32` varint.
pub const VARU32_MAX_BYTES: usize = 5;

/// Maximum encoded length of a `u64` varint.
pub const VARU64_MAX_BYTES: usize = 10;

/// A byte-level reader for decoding message data.
///
/// All read operations are bounds-checked and return errors on failure.
/// A failed read does not advance the cursor. The reader never panics on
/// malformed input.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a reader positioned at `pos`, clamped to the end of `data`.
    #[must_use]
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    /// Returns the number of bytes remaining to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bytes to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unread tail without consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Reads `len` bytes as a borrowed slice.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<&'a [u8]> {
        self.ensure(len)?;
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Fills `dst` from the stream.
    pub fn read_into(&mut self, dst: &mut [u8]) -> BitResult<()> {
        let src = self.read_bytes(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> BitResult<[u8; N]> {
        let mut out = [0u8; N];
        self.read_into(&mut out)?;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> BitResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> BitResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> BitResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> BitResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i8(&mut self) -> BitResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> BitResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> BitResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> BitResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Reads a base-128 varint `u32`, least significant group first.
    pub fn read_varu32(&mut self) -> BitResult<u32> {
        let (value, len) = decode_varint(self.rest(), VARU32_MAX_BYTES)?;
        let value = u32::try_from(value).map_err(|_| BitError::InvalidVarint)?;
        self.pos += len;
        Ok(value)
    }

    /// Reads a base-128 varint `u64`, least significant group first.
    pub fn read_varu64(&mut self) -> BitResult<u64> {
        let (value, len) = decode_varint(self.rest(), VARU64_MAX_BYTES)?;
        self.pos += len;
        Ok(value)
    }

    /// Reads a varint length prefix followed by that many bytes.
    ///
    /// Lengths above `max_len` are rejected before any payload is touched.
    pub fn read_block(&mut self, max_len: usize) -> BitResult<&'a [u8]> {
        let start = self.pos;
        let len = self.read_varu32()? as usize;
        if len > max_len {
            self.pos = start;
            return Err(BitError::RangeViolation {
                value: len as u64,
                limit: max_len as u64 + 1,
            });
        }
        match self.read_bytes(len) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    /// Reads a NUL-terminated UTF-8 string of at most `max_len` bytes.
    pub fn read_string(&mut self, max_len: usize) -> BitResult<&'a str> {
        let rest = self.rest();
        let window = &rest[..rest.len().min(max_len.saturating_add(1))];
        let Some(nul) = window.iter().position(|&b| b == 0) else {
            if window.len() < max_len.saturating_add(1) {
                return Err(BitError::UnexpectedEof {
                    requested: window.len() + 1,
                    available: rest.len(),
                });
            }
            return Err(BitError::InvalidString);
        };
        let text = std::str::from_utf8(&rest[..nul]).map_err(|_| BitError::InvalidString)?;
        self.pos += nul + 1;
        Ok(text)
    }

    fn ensure(&self, len: usize) -> BitResult<()> {
        let available = self.remaining();
        if len > available {
            return Err(BitError::UnexpectedEof {
                requested: len,
                available,
            });
        }
        Ok(())
    }
}

fn decode_varint(buf: &[u8], max_bytes: usize) -> BitResult<(u64, usize)> {
    let mut value = 0u64;
    for (idx, &byte) in buf.iter().take(max_bytes).enumerate() {
        let group = u64::from(byte & 0x7F);
        let shift = 7 * idx as u32;
        if shift == 63 && group > 1 {
            return Err(BitError::InvalidVarint);
        }
        value |= group << shift;
        if byte & 0x80 == 0 {
            return Ok((value, idx + 1));
        }
    }
    if buf.len() < max_bytes {
        return Err(BitError::UnexpectedEof {
            requested: buf.len() + 1,
            available: buf.len(),
        });
    }
    Err(BitError::InvalidVarint)
}

/// Returns the encoded length of a varint.
#[must_use]
pub const fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}
