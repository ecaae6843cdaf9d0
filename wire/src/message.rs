//! Message decoding and section framing.

use bitstream::{varint_len, BitError, ByteReader, MessageBuffer};

use crate::error::{DecodeError, EncodeError, LimitKind, SectionFramingError, WireResult};
use crate::header::{MessageHeader, HEADER_SIZE, MAGIC, VERSION};
use crate::limits::Limits;

/// Section tags for version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SectionTag {
    /// Config string table updates.
    ConfigStrings = 1,
    /// Snapshot delta body.
    Entities = 2,
}

impl SectionTag {
    /// Parses a section tag from a raw byte.
    pub const fn parse(tag: u8) -> WireResult<Self> {
        match tag {
            1 => Ok(Self::ConfigStrings),
            2 => Ok(Self::Entities),
            _ => Err(DecodeError::UnknownSectionTag { tag }),
        }
    }
}

/// A section within a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireSection<'a> {
    pub tag: SectionTag,
    pub body: &'a [u8],
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage<'a> {
    pub header: MessageHeader,
    pub sections: Vec<WireSection<'a>>,
}

impl<'a> WireMessage<'a> {
    /// Returns the body of the section tagged `tag`, if present.
    #[must_use]
    pub fn section(&self, tag: SectionTag) -> Option<&'a [u8]> {
        self.sections
            .iter()
            .find(|section| section.tag == tag)
            .map(|section| section.body)
    }
}

/// Decodes a wire message into header + section slices.
pub fn decode_message<'a>(buf: &'a [u8], limits: &Limits) -> WireResult<WireMessage<'a>> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::MessageTooSmall {
            actual: buf.len(),
            required: HEADER_SIZE,
        });
    }
    if buf.len() > limits.max_message_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::MessageBytes,
            limit: limits.max_message_bytes,
            actual: buf.len(),
        });
    }

    let mut reader = ByteReader::new(buf);
    let too_small = |_| DecodeError::MessageTooSmall {
        actual: buf.len(),
        required: HEADER_SIZE,
    };
    let magic = reader.read_u32().map_err(too_small)?;
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic { found: magic });
    }
    let header = MessageHeader::read_fields(&mut reader).map_err(too_small)?;
    validate_header(&header)?;

    let payload = reader.rest();
    if header.payload_len as usize != payload.len() {
        return Err(DecodeError::PayloadLengthMismatch {
            header_len: header.payload_len,
            actual_len: payload.len(),
        });
    }

    let sections = decode_sections(payload, limits)?;
    Ok(WireMessage { header, sections })
}

fn validate_header(header: &MessageHeader) -> WireResult<()> {
    if header.version != VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: header.version,
        });
    }
    let flags = header.flags;
    if !flags.is_valid() {
        return Err(DecodeError::InvalidFlags { flags: flags.raw() });
    }
    let baseline_ok = if flags.is_full_snapshot() {
        header.baseline_tick == 0
    } else {
        header.baseline_tick != 0 && header.baseline_tick < header.tick
    };
    if !baseline_ok {
        return Err(DecodeError::InvalidBaselineTick {
            tick: header.tick,
            baseline_tick: header.baseline_tick,
            flags: flags.raw(),
        });
    }
    Ok(())
}

/// Decodes sections from a payload buffer (no message header).
pub fn decode_sections<'a>(payload: &'a [u8], limits: &Limits) -> WireResult<Vec<WireSection<'a>>> {
    let mut reader = ByteReader::new(payload);
    let mut sections: Vec<WireSection<'a>> = Vec::new();

    while !reader.is_empty() {
        if sections.len() >= limits.max_sections {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::SectionCount,
                limit: limits.max_sections,
                actual: sections.len() + 1,
            });
        }

        let tag = reader.read_u8().map_err(framing)?;
        let len = reader.read_varu32().map_err(framing)? as usize;
        if len > limits.max_section_len {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::SectionLength,
                limit: limits.max_section_len,
                actual: len,
            });
        }
        let body = reader.read_bytes(len).map_err(framing)?;

        let tag = SectionTag::parse(tag)?;
        if sections.iter().any(|section| section.tag == tag) {
            return Err(DecodeError::DuplicateSection { tag });
        }
        sections.push(WireSection { tag, body });
    }

    Ok(sections)
}

fn framing(err: BitError) -> DecodeError {
    match err {
        BitError::UnexpectedEof {
            requested,
            available,
        } => DecodeError::SectionFraming(SectionFramingError::Truncated {
            needed: requested,
            available,
        }),
        _ => DecodeError::SectionFraming(SectionFramingError::InvalidVarint),
    }
}

/// Encoded size of one section.
#[must_use]
pub fn section_len(body_len: usize) -> usize {
    1 + varint_len(body_len as u64) + body_len
}

/// Writes `header` followed by `sections` into `out`.
///
/// The header's `payload_len` is derived from the sections. Nothing is
/// written if the whole message does not fit. Returns the bytes written.
pub fn encode_message(
    header: &MessageHeader,
    sections: &[WireSection<'_>],
    out: &mut MessageBuffer,
) -> Result<usize, EncodeError> {
    let payload_len: usize = sections.iter().map(|s| section_len(s.body.len())).sum();
    let payload_len_u32 = u32::try_from(payload_len).map_err(|_| EncodeError::LengthOverflow {
        length: payload_len,
    })?;
    let total = HEADER_SIZE + payload_len;
    out.ensure_free(total)?;

    let header = MessageHeader {
        payload_len: payload_len_u32,
        ..*header
    };
    header.write(out)?;
    for section in sections {
        encode_section(section.tag, section.body, out)?;
    }
    Ok(total)
}

/// Writes a single section into `out`.
pub fn encode_section(
    tag: SectionTag,
    body: &[u8],
    out: &mut MessageBuffer,
) -> Result<usize, EncodeError> {
    let len_u32 =
        u32::try_from(body.len()).map_err(|_| EncodeError::LengthOverflow { length: body.len() })?;
    let needed = section_len(body.len());
    out.ensure_free(needed)?;
    out.write_u8(tag as u8)?;
    out.write_varu32(len_u32)?;
    out.write_bytes(body)?;
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::MessageFlags;

    fn header_bytes(header: &MessageHeader) -> Vec<u8> {
        let mut out = MessageBuffer::new(HEADER_SIZE);
        header.write(&mut out).unwrap();
        out.as_bytes().to_vec()
    }

    #[test]
    fn encode_message_roundtrip_empty_payload() {
        let header = MessageHeader::full_snapshot(0xABCD, 42, 0);
        let mut out = MessageBuffer::new(64);
        let written = encode_message(&header, &[], &mut out).unwrap();
        assert_eq!(written, HEADER_SIZE);

        let message = decode_message(out.as_bytes(), &Limits::for_testing()).unwrap();
        assert_eq!(message.header, header);
        assert!(message.sections.is_empty());
    }

    #[test]
    fn encode_message_derives_payload_len() {
        let header = MessageHeader::delta_snapshot(1, 10, 8, 999);
        let body = [1u8, 2, 3];
        let sections = [WireSection {
            tag: SectionTag::Entities,
            body: &body,
        }];
        let mut out = MessageBuffer::new(64);
        encode_message(&header, &sections, &mut out).unwrap();

        let message = decode_message(out.as_bytes(), &Limits::for_testing()).unwrap();
        assert_eq!(message.header.payload_len, 5);
        assert_eq!(message.section(SectionTag::Entities), Some(&body[..]));
        assert_eq!(message.section(SectionTag::ConfigStrings), None);
    }

    #[test]
    fn encode_message_too_small_writes_nothing() {
        let header = MessageHeader::full_snapshot(0, 1, 0);
        let body = [0u8; 8];
        let sections = [WireSection {
            tag: SectionTag::Entities,
            body: &body,
        }];
        let mut out = MessageBuffer::new(HEADER_SIZE + 4);
        let err = encode_message(&header, &sections, &mut out).unwrap_err();
        assert!(matches!(err, EncodeError::Overflow(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn decode_rejects_invalid_magic() {
        let mut buf = header_bytes(&MessageHeader::full_snapshot(0, 1, 0));
        buf[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let err = decode_message(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidMagic { .. }));
    }

    #[test]
    fn decode_rejects_short_message() {
        let err = decode_message(&[0u8; 10], &Limits::for_testing()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MessageTooSmall {
                actual: 10,
                required: HEADER_SIZE
            }
        );
    }

    #[test]
    fn decode_payload_length_mismatch() {
        let buf = header_bytes(&MessageHeader::full_snapshot(0, 1, 10));
        let err = decode_message(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadLengthMismatch { .. }));
    }

    #[test]
    fn decode_payload_length_mismatch_with_extra_bytes() {
        let mut buf = header_bytes(&MessageHeader::full_snapshot(0, 1, 0));
        buf.extend_from_slice(&[0u8; 4]);
        let err = decode_message(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadLengthMismatch { .. }));
    }

    #[test]
    fn decode_rejects_invalid_baseline_full() {
        let header = MessageHeader {
            baseline_tick: 1,
            ..MessageHeader::full_snapshot(0, 2, 0)
        };
        let err = decode_message(&header_bytes(&header), &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBaselineTick { .. }));
    }

    #[test]
    fn decode_rejects_invalid_baseline_delta() {
        for (tick, baseline) in [(1, 0), (5, 5), (5, 9)] {
            let header = MessageHeader::delta_snapshot(0, tick, baseline, 0);
            let err = decode_message(&header_bytes(&header), &Limits::for_testing()).unwrap_err();
            assert!(
                matches!(err, DecodeError::InvalidBaselineTick { .. }),
                "tick {tick} baseline {baseline}"
            );
        }
    }

    #[test]
    fn decode_rejects_invalid_flags_reserved_bits() {
        let header = MessageHeader {
            flags: MessageFlags::from_raw(0b1001),
            ..MessageHeader::full_snapshot(0, 1, 0)
        };
        let err = decode_message(&header_bytes(&header), &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFlags { .. }));
    }

    #[test]
    fn decode_accepts_bootstrap_flags() {
        let header = MessageHeader::bootstrap(0, 1, 0);
        let bytes = header_bytes(&header);
        let message = decode_message(&bytes, &Limits::for_testing()).unwrap();
        assert!(message.header.flags.is_bootstrap());
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let header = MessageHeader {
            version: 0,
            ..MessageHeader::full_snapshot(0, 1, 0)
        };
        let err = decode_message(&header_bytes(&header), &Limits::for_testing()).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { found: 0 }));
    }

    #[test]
    fn decode_rejects_invalid_varint_len() {
        let mut buf = header_bytes(&MessageHeader::full_snapshot(0, 1, 7));
        buf.push(SectionTag::Entities as u8);
        buf.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        let err = decode_message(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SectionFraming(SectionFramingError::InvalidVarint)
        ));
    }

    #[test]
    fn decode_rejects_truncated_section() {
        let mut buf = header_bytes(&MessageHeader::full_snapshot(0, 1, 4));
        buf.extend_from_slice(&[SectionTag::Entities as u8, 5, 1, 2]);
        let err = decode_message(&buf, &Limits::for_testing()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SectionFraming(SectionFramingError::Truncated { .. })
        ));
    }

    #[test]
    fn decode_rejects_unknown_and_duplicate_tags() {
        let err = decode_sections(&[9, 0], &Limits::for_testing()).unwrap_err();
        assert_eq!(err, DecodeError::UnknownSectionTag { tag: 9 });

        let err = decode_sections(&[2, 0, 2, 0], &Limits::default()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DuplicateSection {
                tag: SectionTag::Entities
            }
        );
    }

    #[test]
    fn decode_enforces_section_limits() {
        let mut payload = MessageBuffer::new(16);
        encode_section(SectionTag::Entities, &[0u8; 5], &mut payload).unwrap();

        let limits = Limits {
            max_section_len: 4,
            ..Limits::for_testing()
        };
        let err = decode_sections(payload.as_bytes(), &limits).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::SectionLength,
                ..
            }
        ));

        let limits = Limits {
            max_sections: 1,
            ..Limits::for_testing()
        };
        let err = decode_sections(&[1, 0, 2, 0], &limits).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::SectionCount,
                ..
            }
        ));
    }

    #[test]
    fn decode_enforces_message_limit() {
        let limits = Limits {
            max_message_bytes: HEADER_SIZE,
            ..Limits::for_testing()
        };
        let err = decode_message(&[0u8; HEADER_SIZE + 1], &limits).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::MessageBytes,
                ..
            }
        ));
    }
}
