//! Byte-level message primitives for the snapdelta codec.
//!
//! This crate provides [`MessageBuffer`] for bounded message composition,
//! [`ByteReader`] for bounds-checked decoding of borrowed bytes, and the
//! [`DeltaWriter`] / [`DeltaReader`] pair for field presence masks.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads/writes are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about entities or game state.
//! - **Explicit errors** - All failures return structured errors, never panic.
//!
//! # Example
//!
//! ```
//! use bitstream::{ByteReader, DeltaReader, DeltaWriter, MessageBuffer, MAX_DELTA_FIELDS};
//!
//! let mut writer = DeltaWriter::new(64);
//! writer.add_bit(false);
//! writer.add_bit(true);
//! writer.add_bytes(&42u16.to_le_bytes());
//!
//! let mut msg = MessageBuffer::new(64);
//! writer.finish_into(&mut msg).unwrap();
//!
//! let mut reader = ByteReader::new(msg.as_bytes());
//! let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
//! assert!(!delta.get_bit());
//! assert!(delta.get_bit());
//! assert_eq!(u16::from_le_bytes(delta.get_array()), 42);
//! delta.finish().unwrap();
//! ```

mod buffer;
mod delta;
mod error;
mod reader;

pub use buffer::MessageBuffer;
pub use delta::{mask_len, DeltaReader, DeltaWriter, MAX_DELTA_FIELDS};
pub use error::{BitError, BitResult, ErrorClass};
pub use reader::{varint_len, ByteReader, VARU32_MAX_BYTES, VARU64_MAX_BYTES};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let msg = MessageBuffer::new(0);
        assert!(msg.is_empty());

        let reader = ByteReader::new(msg.as_bytes());
        assert!(reader.is_empty());
    }

    #[test]
    fn mixed_roundtrip() {
        let mut msg = MessageBuffer::new(64);
        msg.write_u8(0xFF).unwrap();
        msg.write_varu32(300).unwrap();
        msg.write_i32(-7).unwrap();
        msg.write_string("sky", 8).unwrap();
        msg.write_block(&[1, 2]).unwrap();

        let mut reader = ByteReader::new(msg.as_bytes());
        assert_eq!(reader.read_u8().unwrap(), 0xFF);
        assert_eq!(reader.read_varu32().unwrap(), 300);
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.read_string(8).unwrap(), "sky");
        assert_eq!(reader.read_block(8).unwrap(), &[1, 2]);
        assert!(reader.is_empty());
    }

    #[test]
    fn delta_block_follows_header_bytes() {
        let mut msg = MessageBuffer::new(64);
        msg.write_u16(9).unwrap();
        let mut writer = DeltaWriter::new(8);
        writer.add_bit(true);
        writer.add_bytes(&[7]);
        writer.finish_into(&mut msg).unwrap();
        msg.write_u8(0xEE).unwrap();

        let mut reader = ByteReader::new(msg.as_bytes());
        assert_eq!(reader.read_u16().unwrap(), 9);
        let mut delta = DeltaReader::begin(&mut reader, 4);
        assert!(delta.get_bit());
        assert_eq!(delta.get_array::<1>(), [7]);
        delta.finish().unwrap();
        assert_eq!(reader.read_u8().unwrap(), 0xEE);
    }
}
