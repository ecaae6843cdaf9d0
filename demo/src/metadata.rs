//! The metadata record that opens every demo.
//!
//! ```text
//! u32 record_length = 16 + max_size
//! i32 total_length     = 12 + max_size   (bytes after this field)
//! i32 metadata_offset  = absolute file offset of the blob
//! i32 metadata_real_size
//! i32 metadata_max_size
//! max_size bytes: key\0value\0 ... zero-padded
//! ```
//!
//! The block is fixed-size so metadata can be rewritten after recording
//! without moving the frames that follow it.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{DemoResult, MetadataError};

/// Size of the four header fields.
pub const METADATA_HEADER_SIZE: usize = 16;

/// Size of a record's length prefix.
pub const RECORD_PREFIX_SIZE: usize = 4;

/// Ordered key/value pairs describing a demo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoMetadata {
    entries: Vec<(String, String)>,
}

impl DemoMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier value in place.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), MetadataError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || key.contains('\0') || value.contains('\0') {
            return Err(MetadataError::InvalidEntry { key });
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the encoded key/value pairs.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.entries
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum()
    }

    fn encode_blob(&self, max_size: usize) -> Result<Vec<u8>, MetadataError> {
        let size = self.encoded_len();
        if size > max_size {
            return Err(MetadataError::TooLarge {
                size,
                max: max_size,
            });
        }
        let mut blob = Vec::with_capacity(max_size);
        for (key, value) in &self.entries {
            blob.extend_from_slice(key.as_bytes());
            blob.push(0);
            blob.extend_from_slice(value.as_bytes());
            blob.push(0);
        }
        blob.resize(max_size, 0);
        Ok(blob)
    }

    fn decode_blob(blob: &[u8]) -> Result<Self, MetadataError> {
        let mut parts = Vec::new();
        let mut rest = blob;
        while !rest.is_empty() {
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or(MetadataError::Unterminated)?;
            let text = std::str::from_utf8(&rest[..nul]).map_err(|_| MetadataError::InvalidUtf8)?;
            parts.push(text.to_owned());
            rest = &rest[nul + 1..];
        }
        if parts.len() % 2 != 0 {
            return Err(MetadataError::Unterminated);
        }
        let mut metadata = Self::new();
        let mut parts = parts.into_iter();
        while let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            metadata.set(key, value)?;
        }
        Ok(metadata)
    }
}

/// Size of a complete metadata record, length prefix included.
#[must_use]
pub const fn metadata_record_len(max_size: usize) -> usize {
    RECORD_PREFIX_SIZE + METADATA_HEADER_SIZE + max_size
}

/// Writes the metadata record for a record starting at `record_offset`.
pub fn write_metadata_record<W: Write>(
    writer: &mut W,
    metadata: &DemoMetadata,
    max_size: usize,
    record_offset: u64,
) -> DemoResult<()> {
    let blob = metadata.encode_blob(max_size)?;
    let total_length = header_i32("total_length", 12 + max_size as i64)?;
    let offset = header_i32(
        "metadata_offset",
        record_offset as i64 + (RECORD_PREFIX_SIZE + METADATA_HEADER_SIZE) as i64,
    )?;
    let record_len = header_i32("record_length", 16 + max_size as i64)?;

    writer.write_u32::<LittleEndian>(record_len as u32)?;
    writer.write_i32::<LittleEndian>(total_length)?;
    writer.write_i32::<LittleEndian>(offset)?;
    writer.write_i32::<LittleEndian>(metadata.encoded_len() as i32)?;
    writer.write_i32::<LittleEndian>(max_size as i32)?;
    writer.write_all(&blob)?;
    Ok(())
}

/// Reads and validates the metadata record starting at `record_offset`.
///
/// Returns the metadata and the size of its reserved block.
pub fn read_metadata_record<R: Read>(
    reader: &mut R,
    max_size_limit: usize,
    record_offset: u64,
) -> DemoResult<(DemoMetadata, usize)> {
    let record_len = reader.read_u32::<LittleEndian>()?;
    let total_length = reader.read_i32::<LittleEndian>()?;
    let offset = reader.read_i32::<LittleEndian>()?;
    let real_size = reader.read_i32::<LittleEndian>()?;
    let max_size = reader.read_i32::<LittleEndian>()?;

    let max_usize = usize::try_from(max_size)
        .ok()
        .filter(|&size| size <= max_size_limit)
        .ok_or(MetadataError::TooLarge {
            size: max_size.max(0) as usize,
            max: max_size_limit,
        })?;
    check_header(
        "record_length",
        i64::from(record_len),
        16 + i64::from(max_size),
    )?;
    check_header(
        "total_length",
        i64::from(total_length),
        12 + i64::from(max_size),
    )?;
    check_header(
        "metadata_offset",
        i64::from(offset),
        record_offset as i64 + (RECORD_PREFIX_SIZE + METADATA_HEADER_SIZE) as i64,
    )?;
    if real_size < 0 || real_size > max_size {
        return Err(MetadataError::BadHeader {
            field: "metadata_real_size",
            expected: i64::from(max_size),
            found: i64::from(real_size),
        }
        .into());
    }

    let mut blob = vec![0u8; max_usize];
    reader.read_exact(&mut blob)?;
    let metadata = DemoMetadata::decode_blob(&blob[..real_size as usize])?;
    Ok((metadata, max_usize))
}

fn header_i32(field: &'static str, value: i64) -> Result<i32, MetadataError> {
    i32::try_from(value).map_err(|_| MetadataError::BadHeader {
        field,
        expected: i64::from(i32::MAX),
        found: value,
    })
}

fn check_header(field: &'static str, found: i64, expected: i64) -> Result<(), MetadataError> {
    if found == expected {
        Ok(())
    } else {
        Err(MetadataError::BadHeader {
            field,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemoError;

    fn sample() -> DemoMetadata {
        let mut metadata = DemoMetadata::new();
        metadata.set("map", "e1m1").unwrap();
        metadata.set("player", "ranger").unwrap();
        metadata
    }

    #[test]
    fn record_layout_matches_format() {
        let mut out = Vec::new();
        write_metadata_record(&mut out, &sample(), 64, 0).unwrap();
        assert_eq!(out.len(), metadata_record_len(64));
        assert_eq!(&out[0..4], &80u32.to_le_bytes());
        assert_eq!(&out[4..8], &76i32.to_le_bytes());
        assert_eq!(&out[8..12], &20i32.to_le_bytes());
        assert_eq!(&out[12..16], &23i32.to_le_bytes());
        assert_eq!(&out[16..20], &64i32.to_le_bytes());
        assert_eq!(&out[20..43], b"map\0e1m1\0player\0ranger\0");
        assert!(out[43..].iter().all(|&b| b == 0));
    }

    #[test]
    fn record_roundtrip() {
        let mut out = Vec::new();
        write_metadata_record(&mut out, &sample(), 64, 0).unwrap();
        let (metadata, max_size) = read_metadata_record(&mut out.as_slice(), 64, 0).unwrap();
        assert_eq!(metadata, sample());
        assert_eq!(max_size, 64);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut metadata = sample();
        metadata.set("map", "e2m3").unwrap();
        assert_eq!(metadata.get("map"), Some("e2m3"));
        let keys: Vec<&str> = metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["map", "player"]);
        assert_eq!(metadata.remove("player"), Some("ranger".to_owned()));
        assert_eq!(metadata.len(), 1);
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let mut metadata = DemoMetadata::new();
        assert!(metadata.set("", "x").is_err());
        assert!(metadata.set("a\0b", "x").is_err());
        assert!(metadata.set("k", "v\0").is_err());
        assert!(metadata.is_empty());
    }

    #[test]
    fn oversized_metadata_is_rejected() {
        let mut metadata = DemoMetadata::new();
        metadata.set("key", "x".repeat(100)).unwrap();
        let err = write_metadata_record(&mut Vec::new(), &metadata, 64, 0).unwrap_err();
        assert!(matches!(
            err,
            DemoError::Metadata(MetadataError::TooLarge { size: 105, max: 64 })
        ));
    }

    #[test]
    fn wrong_offset_is_rejected() {
        let mut out = Vec::new();
        write_metadata_record(&mut out, &sample(), 64, 0).unwrap();
        let err = read_metadata_record(&mut out.as_slice(), 64, 8).unwrap_err();
        assert!(matches!(
            err,
            DemoError::Metadata(MetadataError::BadHeader {
                field: "metadata_offset",
                ..
            })
        ));
    }

    #[test]
    fn oversized_block_is_rejected_before_allocating() {
        let mut out = Vec::new();
        write_metadata_record(&mut out, &sample(), 64, 0).unwrap();
        let err = read_metadata_record(&mut out.as_slice(), 32, 0).unwrap_err();
        assert!(matches!(
            err,
            DemoError::Metadata(MetadataError::TooLarge { .. })
        ));
    }

    #[test]
    fn odd_blob_is_unterminated() {
        assert_eq!(
            DemoMetadata::decode_blob(b"key\0"),
            Err(MetadataError::Unterminated)
        );
        assert_eq!(
            DemoMetadata::decode_blob(b"key\0val"),
            Err(MetadataError::Unterminated)
        );
    }
}
