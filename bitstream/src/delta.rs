//! Field presence mask codec.
//!
//! A delta block is laid out as:
//!
//! ```text
//! varu32 field_count | ceil(field_count / 8) mask bytes | payload
//! ```
//!
//! Bit `i` of the mask (LSB-first within each byte) says whether field `i`
//! carries payload. Payload bytes follow in ascending field order and exist
//! only for set bits, so an unchanged field costs one clear bit.
//!
//! Both halves keep a sticky error: after the first failure writes become
//! no-ops and reads yield zeros, and the caller checks once per record.

use crate::buffer::MessageBuffer;
use crate::error::{BitError, BitResult};
use crate::reader::{varint_len, ByteReader};

/// Hard upper bound on fields per delta block.
pub const MAX_DELTA_FIELDS: usize = 1024;

const MASK_BYTES: usize = MAX_DELTA_FIELDS / 8;

/// Returns the number of mask bytes for `field_count` fields.
#[must_use]
pub const fn mask_len(field_count: usize) -> usize {
    field_count.div_ceil(8)
}

/// Accumulates presence flags and payload for one delta block.
#[derive(Debug, Clone)]
pub struct DeltaWriter {
    mask: [u8; MASK_BYTES],
    field_count: usize,
    max_fields: usize,
    payload: Vec<u8>,
    max_payload: usize,
    error: Option<BitError>,
}

impl DeltaWriter {
    /// Creates a writer whose payload may not exceed `max_payload` bytes.
    #[must_use]
    pub fn new(max_payload: usize) -> Self {
        Self {
            mask: [0; MASK_BYTES],
            field_count: 0,
            max_fields: MAX_DELTA_FIELDS,
            payload: Vec::new(),
            max_payload,
            error: None,
        }
    }

    /// Lowers the field cap below [`MAX_DELTA_FIELDS`].
    #[must_use]
    pub fn with_max_fields(mut self, max_fields: usize) -> Self {
        self.max_fields = max_fields.min(MAX_DELTA_FIELDS);
        self
    }

    /// Declares the next field and whether it carries payload.
    pub fn add_bit(&mut self, present: bool) {
        if self.error.is_some() {
            return;
        }
        if self.field_count >= self.max_fields {
            self.error = Some(BitError::FieldOverflow {
                max: self.max_fields,
            });
            return;
        }
        if present {
            self.mask[self.field_count / 8] |= 1 << (self.field_count % 8);
        }
        self.field_count += 1;
    }

    /// Appends payload for the most recently declared field.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        let attempted = self.payload.len().saturating_add(bytes.len());
        if attempted > self.max_payload {
            self.error = Some(BitError::BufferOverflow {
                attempted,
                capacity: self.max_payload,
            });
            return;
        }
        self.payload.extend_from_slice(bytes);
    }

    /// Number of declared fields.
    #[must_use]
    pub const fn field_count(&self) -> usize {
        self.field_count
    }

    /// Payload bytes accumulated so far.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&BitError> {
        self.error.as_ref()
    }

    /// Returns `true` if any declared field carries payload.
    #[must_use]
    pub fn any_set(&self) -> bool {
        self.mask[..mask_len(self.field_count)]
            .iter()
            .any(|&b| b != 0)
    }

    /// Size of the block once written.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        varint_len(self.field_count as u64) + mask_len(self.field_count) + self.payload.len()
    }

    /// Writes the block into `out`.
    ///
    /// Nothing is written if the sticky error is set or the block does not
    /// fit. Returns the number of bytes written.
    pub fn finish_into(self, out: &mut MessageBuffer) -> BitResult<usize> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let len = self.encoded_len();
        out.ensure_free(len)?;
        // field_count <= MAX_DELTA_FIELDS, so the cast cannot truncate.
        out.write_varu32(self.field_count as u32)?;
        out.write_bytes(&self.mask[..mask_len(self.field_count)])?;
        out.write_bytes(&self.payload)?;
        Ok(len)
    }
}

/// Consumes presence flags and payload for one delta block.
#[derive(Debug)]
pub struct DeltaReader<'r, 'a> {
    reader: &'r mut ByteReader<'a>,
    mask: [u8; MASK_BYTES],
    declared: usize,
    consumed: usize,
    error: Option<BitError>,
}

impl<'r, 'a> DeltaReader<'r, 'a> {
    /// Reads the field count and mask from `reader`.
    ///
    /// Failures are recorded in the sticky error, not returned.
    pub fn begin(reader: &'r mut ByteReader<'a>, max_fields: usize) -> Self {
        let mut this = Self {
            reader,
            mask: [0; MASK_BYTES],
            declared: 0,
            consumed: 0,
            error: None,
        };
        let max_fields = max_fields.min(MAX_DELTA_FIELDS);
        let declared = match this.reader.read_varu32() {
            Ok(count) => count as usize,
            Err(err) => {
                this.error = Some(err);
                return this;
            }
        };
        if declared > max_fields {
            this.error = Some(BitError::FieldCountExceeded {
                declared,
                max: max_fields,
            });
            return this;
        }
        let len = mask_len(declared);
        if let Err(err) = this.reader.read_into(&mut this.mask[..len]) {
            this.error = Some(err);
            return this;
        }
        this.declared = declared;
        this
    }

    /// Field count declared by the writer.
    #[must_use]
    pub const fn declared(&self) -> usize {
        self.declared
    }

    /// Flags consumed so far.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Consumes the next flag. Returns `false` once the error is set.
    pub fn get_bit(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.consumed >= self.declared {
            self.error = Some(BitError::FieldsExhausted {
                declared: self.declared,
            });
            return false;
        }
        let bit = self.mask[self.consumed / 8] & (1 << (self.consumed % 8)) != 0;
        self.consumed += 1;
        bit
    }

    /// Fills `dst` with payload, or with zeros once the error is set.
    pub fn get_bytes(&mut self, dst: &mut [u8]) {
        if self.error.is_none() {
            match self.reader.read_into(dst) {
                Ok(()) => return,
                Err(err) => self.error = Some(err),
            }
        }
        dst.fill(0);
    }

    pub fn get_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        self.get_bytes(&mut out);
        out
    }

    /// Reads a NUL-terminated payload string, or returns an empty one once
    /// the error is set.
    pub fn get_string(&mut self, max_len: usize) -> String {
        if self.error.is_some() {
            return String::new();
        }
        match self.reader.read_string(max_len) {
            Ok(text) => text.to_owned(),
            Err(err) => {
                self.error = Some(err);
                String::new()
            }
        }
    }

    /// Records a decode failure found by the caller. The first error wins.
    pub fn set_error(&mut self, err: BitError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&BitError> {
        self.error.as_ref()
    }

    /// Ends the block, reporting the sticky error if any.
    ///
    /// Unread flags must all be clear; a set one would leave its payload
    /// unconsumed.
    pub fn finish(self) -> BitResult<()> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let unread_set =
            (self.consumed..self.declared).any(|i| self.mask[i / 8] & (1 << (i % 8)) != 0);
        if unread_set {
            return Err(BitError::UnreadFields {
                declared: self.declared,
                consumed: self.consumed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(bits: &[bool]) -> Vec<u8> {
        let mut writer = DeltaWriter::new(64);
        for &bit in bits {
            writer.add_bit(bit);
        }
        let mut out = MessageBuffer::new(256);
        writer.finish_into(&mut out).unwrap();
        out.as_bytes().to_vec()
    }

    #[test]
    fn mask_is_lsb_first() {
        let mut bits = [false; 10];
        bits[0] = true;
        bits[9] = true;
        assert_eq!(encode(&bits), vec![10, 0x01, 0x02]);
    }

    #[test]
    fn empty_block() {
        assert_eq!(encode(&[]), vec![0]);
    }

    #[test]
    fn payload_only_for_set_bits() {
        let mut writer = DeltaWriter::new(64);
        writer.add_bit(false);
        writer.add_bit(true);
        writer.add_bytes(&[0xAA, 0xBB]);
        writer.add_bit(false);
        assert_eq!(writer.encoded_len(), 4);

        let mut out = MessageBuffer::new(16);
        assert_eq!(writer.finish_into(&mut out).unwrap(), 4);
        assert_eq!(out.as_bytes(), &[3, 0b010, 0xAA, 0xBB]);

        let mut reader = ByteReader::new(out.as_bytes());
        let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        assert!(!delta.get_bit());
        assert!(delta.get_bit());
        assert_eq!(delta.get_array::<2>(), [0xAA, 0xBB]);
        assert!(!delta.get_bit());
        delta.finish().unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn field_overflow_is_sticky_and_writes_nothing() {
        let mut writer = DeltaWriter::new(8);
        for _ in 0..=MAX_DELTA_FIELDS {
            writer.add_bit(false);
        }
        assert!(writer.has_error());
        assert_eq!(writer.field_count(), MAX_DELTA_FIELDS);
        writer.add_bytes(&[1]);
        assert!(writer.payload().is_empty());

        let mut out = MessageBuffer::new(1024);
        let err = writer.finish_into(&mut out).unwrap_err();
        assert_eq!(
            err,
            BitError::FieldOverflow {
                max: MAX_DELTA_FIELDS
            }
        );
        assert!(err.is_fatal());
        assert!(out.is_empty());
    }

    #[test]
    fn payload_budget_is_enforced() {
        let mut writer = DeltaWriter::new(2);
        writer.add_bit(true);
        writer.add_bytes(&[1, 2, 3]);
        assert!(matches!(
            writer.error(),
            Some(BitError::BufferOverflow { .. })
        ));
    }

    #[test]
    fn finish_into_too_small_writes_nothing() {
        let mut writer = DeltaWriter::new(8);
        writer.add_bit(true);
        writer.add_bytes(&[1, 2, 3, 4]);
        let mut out = MessageBuffer::new(4);
        assert!(writer.finish_into(&mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn reading_past_declared_count_fails() {
        let bytes = encode(&[true]);
        let mut reader = ByteReader::new(&bytes);
        let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        assert!(delta.get_bit());
        assert!(!delta.get_bit());
        assert_eq!(
            delta.finish().unwrap_err(),
            BitError::FieldsExhausted { declared: 1 }
        );
    }

    #[test]
    fn truncated_payload_zero_fills() {
        let bytes = [1u8, 0x01, 0xAA];
        let mut reader = ByteReader::new(&bytes);
        let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        assert!(delta.get_bit());
        let mut dst = [0xFFu8; 4];
        delta.get_bytes(&mut dst);
        assert_eq!(dst, [0; 4]);
        assert!(delta.has_error());
        assert!(!delta.finish().unwrap_err().is_fatal());
    }

    #[test]
    fn declared_count_above_max_is_rejected() {
        let bytes = [0x81u8, 0x08];
        let mut reader = ByteReader::new(&bytes);
        let delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        assert_eq!(
            delta.finish().unwrap_err(),
            BitError::FieldCountExceeded {
                declared: 1025,
                max: MAX_DELTA_FIELDS
            }
        );
    }

    #[test]
    fn trailing_clear_flags_may_stay_unread() {
        let bytes = encode(&[true, false, false]);
        let mut reader = ByteReader::new(&bytes);
        let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        assert!(delta.get_bit());
        delta.finish().unwrap();
    }

    #[test]
    fn unread_set_flag_is_corrupt() {
        let bytes = encode(&[false, false, true]);
        let mut reader = ByteReader::new(&bytes);
        let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        assert!(!delta.get_bit());
        assert_eq!(
            delta.finish().unwrap_err(),
            BitError::UnreadFields {
                declared: 3,
                consumed: 1
            }
        );
    }

    #[test]
    fn first_error_wins() {
        let bytes = encode(&[]);
        let mut reader = ByteReader::new(&bytes);
        let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
        delta.set_error(BitError::RangeViolation { value: 5, limit: 4 });
        assert!(!delta.get_bit());
        assert_eq!(
            delta.finish().unwrap_err(),
            BitError::RangeViolation { value: 5, limit: 4 }
        );
    }

    #[test]
    fn strings_in_payload() {
        let mut writer = DeltaWriter::new(32);
        writer.add_bit(true);
        writer.add_bytes(b"hi\0");
        let mut out = MessageBuffer::new(32);
        writer.finish_into(&mut out).unwrap();

        let mut reader = ByteReader::new(out.as_bytes());
        let mut delta = DeltaReader::begin(&mut reader, 8);
        assert!(delta.get_bit());
        assert_eq!(delta.get_string(8), "hi");
        delta.finish().unwrap();
    }
}
