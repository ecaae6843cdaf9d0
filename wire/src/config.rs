//! Config string section body.
//!
//! ```text
//! varu32 count | count * (varu32 index | NUL-terminated string)
//! ```

use bitstream::{BitError, ByteReader, MessageBuffer};

use crate::error::{DecodeError, EncodeError, LimitKind, SectionFramingError, WireResult};
use crate::limits::Limits;
use crate::message::SectionTag;

/// Writes a config string section body into `out`.
pub fn encode_config_strings(
    entries: &[(u32, &str)],
    limits: &Limits,
    out: &mut MessageBuffer,
) -> Result<(), EncodeError> {
    let count = u32::try_from(entries.len()).map_err(|_| EncodeError::LengthOverflow {
        length: entries.len(),
    })?;
    out.write_varu32(count)?;
    for &(index, value) in entries {
        if index as usize >= limits.max_config_strings {
            return Err(EncodeError::ConfigStringIndex {
                index,
                max: limits.max_config_strings,
            });
        }
        out.write_varu32(index)?;
        out.write_string(value, limits.max_config_string_len)?;
    }
    Ok(())
}

/// Parses a config string section body.
pub fn decode_config_strings<'a>(
    body: &'a [u8],
    limits: &Limits,
) -> WireResult<Vec<(u32, &'a str)>> {
    let mut reader = ByteReader::new(body);
    let count = reader.read_varu32().map_err(body_error)? as usize;
    if count > limits.max_config_strings {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::ConfigStringCount,
            limit: limits.max_config_strings,
            actual: count,
        });
    }

    // Each entry needs at least two bytes, so a lying count cannot force a
    // large allocation.
    let mut entries = Vec::with_capacity(count.min(body.len() / 2));
    for _ in 0..count {
        let index = reader.read_varu32().map_err(body_error)?;
        if index as usize >= limits.max_config_strings {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::ConfigStringIndex,
                limit: limits.max_config_strings,
                actual: index as usize,
            });
        }
        let value = reader
            .read_string(limits.max_config_string_len)
            .map_err(body_error)?;
        entries.push((index, value));
    }

    if !reader.is_empty() {
        return Err(DecodeError::SectionFraming(
            SectionFramingError::TrailingBytes {
                tag: SectionTag::ConfigStrings,
                extra: reader.remaining(),
            },
        ));
    }
    Ok(entries)
}

const fn body_error(source: BitError) -> DecodeError {
    DecodeError::Body {
        tag: SectionTag::ConfigStrings,
        source,
    }
}
