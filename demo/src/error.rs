//! Error types for demo recording and playback.

use std::fmt;
use std::io;

use bitstream::BitError;
use codec::CodecError;

/// Result type for demo operations.
pub type DemoResult<T> = Result<T, DemoError>;

/// Errors that can occur while recording or playing a demo.
#[derive(Debug)]
pub enum DemoError {
    /// The underlying reader or writer failed.
    Io(io::Error),

    /// A record's length prefix exceeds the message buffer.
    Corrupt { length: u32, max: usize },

    /// The stream ended without the end-of-stream sentinel.
    Truncated { records: u64 },

    /// The metadata record is malformed or cannot be written.
    Metadata(MetadataError),

    /// A record to write is larger than a player will accept.
    MessageTooLarge { len: usize, max: usize },

    /// `skip` lies beyond the end of the message.
    InvalidSkip { skip: usize, len: usize },

    /// Composing into the live buffer failed.
    Bitstream(BitError),

    /// A snapshot could not be encoded or a record could not be decoded.
    Codec(CodecError),
}

/// Details for metadata errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The encoded key/value pairs do not fit the reserved blob.
    TooLarge { size: usize, max: usize },
    /// Keys must be non-empty and neither keys nor values may contain NUL.
    InvalidEntry { key: String },
    /// A header field disagrees with the record layout.
    BadHeader {
        field: &'static str,
        expected: i64,
        found: i64,
    },
    /// The blob ends inside a key or value.
    Unterminated,
    /// A key or value is not UTF-8.
    InvalidUtf8,
}

impl DemoError {
    /// Returns `true` if the file cannot be read any further.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InvalidSkip { .. } | Self::MessageTooLarge { .. }
        )
    }
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "demo i/o error: {e}"),
            Self::Corrupt { length, max } => {
                write!(
                    f,
                    "corrupt demo: record of {length} bytes exceeds {max} bytes"
                )
            }
            Self::Truncated { records } => {
                write!(f, "demo ended without end marker after {records} records")
            }
            Self::Metadata(e) => write!(f, "demo metadata error: {e}"),
            Self::MessageTooLarge { len, max } => {
                write!(f, "message of {len} bytes exceeds demo maximum of {max}")
            }
            Self::InvalidSkip { skip, len } => {
                write!(f, "cannot skip {skip} bytes of a {len} byte message")
            }
            Self::Bitstream(e) => write!(f, "demo buffer error: {e}"),
            Self::Codec(e) => write!(f, "demo codec error: {e}"),
        }
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size, max } => {
                write!(f, "{size} bytes of metadata exceed the {max} byte block")
            }
            Self::InvalidEntry { key } => write!(f, "invalid metadata entry '{key}'"),
            Self::BadHeader {
                field,
                expected,
                found,
            } => write!(f, "metadata {field} is {found}, expected {expected}"),
            Self::Unterminated => write!(f, "unterminated metadata entry"),
            Self::InvalidUtf8 => write!(f, "metadata is not valid utf-8"),
        }
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Metadata(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<io::Error> for DemoError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MetadataError> for DemoError {
    fn from(err: MetadataError) -> Self {
        Self::Metadata(err)
    }
}

impl From<BitError> for DemoError {
    fn from(err: BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl From<CodecError> for DemoError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}
