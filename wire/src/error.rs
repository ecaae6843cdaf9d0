//! Error types for wire format operations.

use std::fmt;

use bitstream::BitError;

use crate::message::SectionTag;

/// Result type for wire format decoding.
pub type WireResult<T> = Result<T, DecodeError>;

/// High-level decode errors for wire framing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Message is too small to contain the required header.
    MessageTooSmall { actual: usize, required: usize },

    /// Invalid magic number in message header.
    InvalidMagic { found: u32 },

    /// Unsupported wire version.
    UnsupportedVersion { found: u16 },

    /// Invalid flags combination.
    InvalidFlags { flags: u16 },

    /// Invalid baseline tick for the message kind.
    InvalidBaselineTick {
        tick: u32,
        baseline_tick: u32,
        flags: u16,
    },

    /// Payload length mismatch.
    PayloadLengthMismatch { header_len: u32, actual_len: usize },

    /// Unknown section tag encountered.
    UnknownSectionTag { tag: u8 },

    /// The same section tag appears twice.
    DuplicateSection { tag: SectionTag },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Section framing error.
    SectionFraming(SectionFramingError),

    /// A section body is malformed.
    Body { tag: SectionTag, source: BitError },
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    MessageBytes,
    SectionCount,
    SectionLength,
    ConfigStringCount,
    ConfigStringIndex,
}

/// Errors that can occur while framing sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionFramingError {
    InvalidVarint,
    Truncated { needed: usize, available: usize },
    /// Bytes left over after a section body was fully parsed.
    TrailingBytes { tag: SectionTag, extra: usize },
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The output buffer or a field budget is too small.
    Overflow(BitError),
    LengthOverflow { length: usize },
    /// A config string index exceeds the configured table size.
    ConfigStringIndex { index: u32, max: usize },
}

impl DecodeError {
    /// Returns the underlying primitive error for malformed bodies.
    #[must_use]
    pub const fn bit_error(&self) -> Option<&BitError> {
        match self {
            Self::Body { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageTooSmall { actual, required } => {
                write!(
                    f,
                    "message too small: {actual} bytes, need at least {required}"
                )
            }
            Self::InvalidMagic { found } => {
                write!(f, "invalid magic number: 0x{found:08X}")
            }
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported wire version: {found}")
            }
            Self::InvalidFlags { flags } => {
                write!(f, "invalid flags: 0x{flags:04X}")
            }
            Self::InvalidBaselineTick {
                tick,
                baseline_tick,
                flags,
            } => {
                write!(
                    f,
                    "invalid baseline tick {baseline_tick} at tick {tick} for flags 0x{flags:04X}"
                )
            }
            Self::PayloadLengthMismatch {
                header_len,
                actual_len,
            } => {
                write!(
                    f,
                    "payload length mismatch: header {header_len} bytes but {actual_len} available"
                )
            }
            Self::UnknownSectionTag { tag } => {
                write!(f, "unknown section tag: {tag}")
            }
            Self::DuplicateSection { tag } => write!(f, "duplicate section: {tag:?}"),
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::SectionFraming(err) => write!(f, "section framing error: {err}"),
            Self::Body { tag, source } => write!(f, "malformed {tag:?} section: {source}"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MessageBytes => "message bytes",
            Self::SectionCount => "section count",
            Self::SectionLength => "section length",
            Self::ConfigStringCount => "config string count",
            Self::ConfigStringIndex => "config string index",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for SectionFramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVarint => write!(f, "invalid varint"),
            Self::Truncated { needed, available } => {
                write!(
                    f,
                    "truncated section: need {needed} bytes, have {available}"
                )
            }
            Self::TrailingBytes { tag, extra } => {
                write!(f, "{extra} trailing bytes after {tag:?} section")
            }
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow(err) => write!(f, "encode overflow: {err}"),
            Self::LengthOverflow { length } => {
                write!(f, "length overflow: {length}")
            }
            Self::ConfigStringIndex { index, max } => {
                write!(f, "config string index {index} exceeds table size {max}")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Body { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Overflow(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BitError> for EncodeError {
    fn from(err: BitError) -> Self {
        Self::Overflow(err)
    }
}
