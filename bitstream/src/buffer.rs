//! Bounded message buffer with a write cursor and a read cursor.

use crate::error::{BitError, BitResult};
use crate::reader::{varint_len, ByteReader};

/// A bounded byte buffer holding one message.
///
/// Writes append at `cursize` and fail with [`BitError::BufferOverflow`]
/// instead of growing past `maxsize`; a failed write leaves the buffer
/// untouched. Reads consume from `readcount` and fail with
/// [`BitError::UnexpectedEof`] at `cursize`.
///
/// Invariant: `readcount <= cursize <= maxsize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBuffer {
    data: Vec<u8>,
    maxsize: usize,
    readcount: usize,
}

impl MessageBuffer {
    /// Creates an empty buffer that can hold up to `maxsize` bytes.
    #[must_use]
    pub fn new(maxsize: usize) -> Self {
        Self {
            data: Vec::with_capacity(maxsize),
            maxsize,
            readcount: 0,
        }
    }

    /// Creates a buffer holding a copy of `bytes`, ready for reading.
    pub fn from_bytes(bytes: &[u8], maxsize: usize) -> BitResult<Self> {
        let mut buf = Self::new(maxsize);
        buf.write_bytes(bytes)?;
        Ok(buf)
    }

    /// Returns the maximum size in bytes.
    #[must_use]
    pub const fn maxsize(&self) -> usize {
        self.maxsize
    }

    /// Returns the number of bytes written.
    #[must_use]
    pub fn cursize(&self) -> usize {
        self.data.len()
    }

    /// Returns the read cursor.
    #[must_use]
    pub const fn readcount(&self) -> usize {
        self.readcount
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes that can still be written.
    #[must_use]
    pub fn free(&self) -> usize {
        self.maxsize - self.data.len()
    }

    /// Returns the number of written bytes not yet read.
    #[must_use]
    pub fn unread_len(&self) -> usize {
        self.data.len() - self.readcount
    }

    /// Returns all written bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the written bytes not yet read.
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.readcount..]
    }

    /// Discards all data and resets both cursors.
    pub fn clear(&mut self) {
        self.data.clear();
        self.readcount = 0;
    }

    /// Rewinds the read cursor to the start of the message.
    pub fn begin_reading(&mut self) {
        self.readcount = 0;
    }

    /// Replaces the contents with `len` zero bytes and returns them for
    /// filling, with the read cursor reset.
    ///
    /// Fails without touching the buffer if `len` exceeds the maximum size.
    pub fn reset_with_len(&mut self, len: usize) -> BitResult<&mut [u8]> {
        if len > self.maxsize {
            return Err(BitError::BufferOverflow {
                attempted: len,
                capacity: self.maxsize,
            });
        }
        self.data.clear();
        self.data.resize(len, 0);
        self.readcount = 0;
        Ok(&mut self.data)
    }

    /// Checks that `len` more bytes fit.
    pub fn ensure_free(&self, len: usize) -> BitResult<()> {
        let attempted = self.data.len().saturating_add(len);
        if attempted > self.maxsize {
            return Err(BitError::BufferOverflow {
                attempted,
                capacity: self.maxsize,
            });
        }
        Ok(())
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> BitResult<()> {
        self.ensure_free(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> BitResult<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i8(&mut self, value: i8) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> BitResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a base-128 varint `u32`, least significant group first.
    pub fn write_varu32(&mut self, value: u32) -> BitResult<()> {
        self.write_varu64(u64::from(value))
    }

    /// Writes a base-128 varint `u64`, least significant group first.
    pub fn write_varu64(&mut self, value: u64) -> BitResult<()> {
        let mut scratch = [0u8; crate::VARU64_MAX_BYTES];
        let len = encode_varint(value, &mut scratch);
        self.write_bytes(&scratch[..len])
    }

    /// Writes a varint length prefix followed by `bytes`.
    pub fn write_block(&mut self, bytes: &[u8]) -> BitResult<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| BitError::BufferOverflow {
            attempted: bytes.len(),
            capacity: self.maxsize,
        })?;
        self.ensure_free(varint_len(u64::from(len)) + bytes.len())?;
        self.write_varu32(len)?;
        self.write_bytes(bytes)
    }

    /// Writes `text` followed by a NUL terminator.
    ///
    /// Strings longer than `max_len` bytes or containing NUL are rejected.
    pub fn write_string(&mut self, text: &str, max_len: usize) -> BitResult<()> {
        let bytes = text.as_bytes();
        if bytes.len() > max_len || bytes.contains(&0) {
            return Err(BitError::StringTooLong {
                len: bytes.len(),
                max_len,
            });
        }
        self.ensure_free(bytes.len() + 1)?;
        self.data.extend_from_slice(bytes);
        self.data.push(0);
        Ok(())
    }

    /// Runs `read` against a cursor at `readcount` and commits its progress.
    pub fn with_reader<T>(
        &mut self,
        read: impl FnOnce(&mut ByteReader<'_>) -> BitResult<T>,
    ) -> BitResult<T> {
        let mut reader = ByteReader::at(&self.data, self.readcount);
        let result = read(&mut reader);
        self.readcount = reader.position();
        result
    }

    pub fn read_bytes(&mut self, len: usize) -> BitResult<Vec<u8>> {
        self.with_reader(|r| r.read_bytes(len).map(<[u8]>::to_vec))
    }

    pub fn read_into(&mut self, dst: &mut [u8]) -> BitResult<()> {
        self.with_reader(|r| r.read_into(dst))
    }

    pub fn read_u8(&mut self) -> BitResult<u8> {
        self.with_reader(|r| r.read_u8())
    }

    pub fn read_u16(&mut self) -> BitResult<u16> {
        self.with_reader(|r| r.read_u16())
    }

    pub fn read_u32(&mut self) -> BitResult<u32> {
        self.with_reader(|r| r.read_u32())
    }

    pub fn read_u64(&mut self) -> BitResult<u64> {
        self.with_reader(|r| r.read_u64())
    }

    pub fn read_i8(&mut self) -> BitResult<i8> {
        self.with_reader(|r| r.read_i8())
    }

    pub fn read_i16(&mut self) -> BitResult<i16> {
        self.with_reader(|r| r.read_i16())
    }

    pub fn read_i32(&mut self) -> BitResult<i32> {
        self.with_reader(|r| r.read_i32())
    }

    pub fn read_i64(&mut self) -> BitResult<i64> {
        self.with_reader(|r| r.read_i64())
    }

    pub fn read_varu32(&mut self) -> BitResult<u32> {
        self.with_reader(|r| r.read_varu32())
    }

    pub fn read_varu64(&mut self) -> BitResult<u64> {
        self.with_reader(|r| r.read_varu64())
    }

    pub fn read_block(&mut self, max_len: usize) -> BitResult<Vec<u8>> {
        self.with_reader(|r| r.read_block(max_len).map(<[u8]>::to_vec))
    }

    pub fn read_string(&mut self, max_len: usize) -> BitResult<String> {
        self.with_reader(|r| r.read_string(max_len).map(str::to_owned))
    }
}

pub(crate) fn encode_varint(mut value: u64, out: &mut [u8]) -> usize {
    let mut offset = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out[offset] = byte;
        offset += 1;
        if value == 0 {
            break;
        }
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buf = MessageBuffer::new(16);
        assert_eq!(buf.cursize(), 0);
        assert_eq!(buf.readcount(), 0);
        assert_eq!(buf.maxsize(), 16);
        assert!(buf.is_empty());
    }

    #[test]
    fn write_u32_little_endian() {
        let mut buf = MessageBuffer::new(16);
        buf.write_u32(0x1234_5678).unwrap();
        assert_eq!(buf.as_bytes(), &[0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn write_overflow_leaves_buffer_untouched() {
        let mut buf = MessageBuffer::new(3);
        buf.write_u16(0xBEEF).unwrap();
        let err = buf.write_u16(0xCAFE).unwrap_err();
        assert_eq!(
            err,
            BitError::BufferOverflow {
                attempted: 4,
                capacity: 3
            }
        );
        assert!(err.is_fatal());
        assert_eq!(buf.as_bytes(), &[0xEF, 0xBE]);
    }

    #[test]
    fn overflow_exact_fit() {
        let mut buf = MessageBuffer::new(4);
        buf.write_u32(u32::MAX).unwrap();
        assert_eq!(buf.free(), 0);
        assert!(buf.write_u8(0).is_err());
    }

    #[test]
    fn write_varu32_300() {
        let mut buf = MessageBuffer::new(8);
        buf.write_varu32(300).unwrap();
        assert_eq!(buf.as_bytes(), &[0xAC, 0x02]);
    }

    #[test]
    fn write_varint_is_all_or_nothing() {
        let mut buf = MessageBuffer::new(1);
        assert!(buf.write_varu32(300).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn every_width_reads_back_in_order() {
        let mut buf = MessageBuffer::new(64);
        buf.write_u8(0xAB).unwrap();
        buf.write_u16(0xBEEF).unwrap();
        buf.write_u32(0xDEAD_BEEF).unwrap();
        buf.write_u64(u64::MAX - 1).unwrap();
        buf.write_i8(-3).unwrap();
        buf.write_i16(-300).unwrap();
        buf.write_i32(-70_000).unwrap();
        buf.write_i64(i64::MIN).unwrap();
        buf.write_varu32(u32::MAX).unwrap();
        buf.write_varu64(1 << 40).unwrap();

        assert_eq!(buf.read_u8().unwrap(), 0xAB);
        assert_eq!(buf.read_u16().unwrap(), 0xBEEF);
        assert_eq!(buf.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(buf.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(buf.read_i8().unwrap(), -3);
        assert_eq!(buf.read_i16().unwrap(), -300);
        assert_eq!(buf.read_i32().unwrap(), -70_000);
        assert_eq!(buf.read_i64().unwrap(), i64::MIN);
        assert_eq!(buf.read_varu32().unwrap(), u32::MAX);
        assert_eq!(buf.read_varu64().unwrap(), 1 << 40);
        assert_eq!(buf.unread_len(), 0);
    }

    #[test]
    fn read_past_cursize_is_recoverable() {
        let mut buf = MessageBuffer::new(16);
        buf.write_u8(7).unwrap();
        assert_eq!(buf.read_u8().unwrap(), 7);
        let err = buf.read_u8().unwrap_err();
        assert!(matches!(err, BitError::UnexpectedEof { .. }));
        assert!(!err.is_fatal());
        assert_eq!(buf.readcount(), buf.cursize());
    }

    #[test]
    fn string_roundtrip_and_bounds() {
        let mut buf = MessageBuffer::new(32);
        buf.write_string("mapname", 16).unwrap();
        assert!(matches!(
            buf.write_string("this is too long", 8).unwrap_err(),
            BitError::StringTooLong {
                len: 16,
                max_len: 8
            }
        ));
        assert!(buf.write_string("a\0b", 8).is_err());
        assert_eq!(buf.cursize(), 8);
        assert_eq!(buf.read_string(16).unwrap(), "mapname");
    }

    #[test]
    fn block_roundtrip() {
        let mut buf = MessageBuffer::new(32);
        buf.write_block(&[9, 8, 7]).unwrap();
        assert_eq!(buf.as_bytes(), &[3, 9, 8, 7]);
        assert_eq!(buf.read_block(16).unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn reset_with_len_rejects_oversize() {
        let mut buf = MessageBuffer::new(4);
        buf.write_u8(1).unwrap();
        assert!(buf.reset_with_len(5).is_err());
        assert_eq!(buf.as_bytes(), &[1]);

        let slot = buf.reset_with_len(2).unwrap();
        slot.copy_from_slice(&[5, 6]);
        assert_eq!(buf.readcount(), 0);
        assert_eq!(buf.read_u16().unwrap(), 0x0605);
    }

    #[test]
    fn begin_reading_rewinds() {
        let mut buf = MessageBuffer::new(8);
        buf.write_i16(-2).unwrap();
        assert_eq!(buf.read_i16().unwrap(), -2);
        buf.begin_reading();
        assert_eq!(buf.unread_len(), 2);
        assert_eq!(buf.read_i16().unwrap(), -2);
    }
}
