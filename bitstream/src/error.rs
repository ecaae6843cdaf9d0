//! Error types for message buffer and field mask operations.

use std::fmt;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// How a failure must be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A write exceeded a budget the caller sized. This is a programming
    /// error, never bad input, and must not be ignored.
    ProtocolOverflow,
    /// Input from a peer or a file was shorter than declared or malformed.
    /// The record is discarded and the receiver keeps going.
    TruncatedOrCorrupt,
}

/// Errors that can occur while writing or reading message data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A write would grow the buffer past its maximum size.
    BufferOverflow {
        /// Size the buffer would have reached.
        attempted: usize,
        /// Maximum size of the buffer.
        capacity: usize,
    },

    /// Attempted to read past the end of the written data.
    UnexpectedEof {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A varint used more groups than its width allows.
    InvalidVarint,

    /// A string is longer than its declared bound or contains a NUL byte.
    StringTooLong {
        /// Length of the rejected string in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max_len: usize,
    },

    /// A string on the wire is unterminated within its bound or not UTF-8.
    InvalidString,

    /// A field mask writer was asked to declare more fields than its maximum.
    FieldOverflow {
        /// Maximum number of fields.
        max: usize,
    },

    /// A field mask on the wire declares more fields than allowed.
    FieldCountExceeded {
        /// Field count found on the wire.
        declared: usize,
        /// Maximum allowed field count.
        max: usize,
    },

    /// A reader asked for more flags than the writer declared.
    FieldsExhausted {
        /// Field count declared by the writer.
        declared: usize,
    },

    /// A reader finished while set flags were still unread.
    UnreadFields {
        /// Field count declared by the writer.
        declared: usize,
        /// Flags consumed by the reader.
        consumed: usize,
    },

    /// A decoded value lies outside its domain.
    RangeViolation {
        /// The decoded value.
        value: u64,
        /// Exclusive upper bound of the domain.
        limit: u64,
    },
}

impl BitError {
    /// Returns how the caller must treat this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::BufferOverflow { .. }
            | Self::StringTooLong { .. }
            | Self::FieldOverflow { .. } => ErrorClass::ProtocolOverflow,
            Self::UnexpectedEof { .. }
            | Self::InvalidVarint
            | Self::InvalidString
            | Self::FieldCountExceeded { .. }
            | Self::FieldsExhausted { .. }
            | Self::UnreadFields { .. }
            | Self::RangeViolation { .. } => ErrorClass::TruncatedOrCorrupt,
        }
    }

    /// Returns `true` for write-side budget violations.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::ProtocolOverflow)
    }
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferOverflow {
                attempted,
                capacity,
            } => {
                write!(
                    f,
                    "attempted to write {attempted} bytes but buffer capacity is {capacity} bytes"
                )
            }
            Self::UnexpectedEof {
                requested,
                available,
            } => {
                write!(
                    f,
                    "attempted to read {requested} bytes but only {available} bytes available"
                )
            }
            Self::InvalidVarint => write!(f, "invalid varint"),
            Self::StringTooLong { len, max_len } => {
                write!(f, "string of {len} bytes exceeds bound of {max_len} bytes")
            }
            Self::InvalidString => write!(f, "unterminated or non-utf8 string"),
            Self::FieldOverflow { max } => {
                write!(f, "field mask exceeds maximum of {max} fields")
            }
            Self::FieldCountExceeded { declared, max } => {
                write!(f, "field mask declares {declared} fields, maximum is {max}")
            }
            Self::FieldsExhausted { declared } => {
                write!(f, "read past the {declared} declared fields")
            }
            Self::UnreadFields { declared, consumed } => {
                write!(
                    f,
                    "set fields left unread: consumed {consumed} of {declared} declared"
                )
            }
            Self::RangeViolation { value, limit } => {
                write!(f, "value {value} out of range, must be below {limit}")
            }
        }
    }
}

impl std::error::Error for BitError {}
