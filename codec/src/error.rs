//! Error types for codec operations.

use std::fmt;

use bitstream::{BitError, ErrorClass};

use crate::baseline::BaselineError;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during snapshot/delta encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Wire format decode error.
    Wire(wire::DecodeError),

    /// Wire format encode error.
    WireEncode(wire::EncodeError),

    /// Message buffer or field mask error.
    Bitstream(BitError),

    /// Baseline history error.
    Baseline(BaselineError),

    /// Schema hash mismatch.
    SchemaMismatch { expected: u64, found: u64 },

    /// A decode limit was exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// An encode limit was exceeded.
    EncodeLimitExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// An entity state does not have one value per schema leaf.
    FieldCountMismatch { expected: usize, actual: usize },

    /// A value does not fit its schema leaf.
    InvalidValue { field: usize, reason: ValueReason },

    /// No leaf with this name exists.
    UnknownField { name: String },

    /// A slot on the wire is zero or out of range.
    InvalidSlot { raw: u32 },

    /// Entity entries are not in strictly ascending slot order.
    InvalidEntityOrder { previous: u16, current: u16 },

    /// Section body had trailing bytes after parsing.
    TrailingSectionData {
        section: wire::SectionTag,
        remaining: usize,
    },

    /// A delta's baseline tick is zero or not older than its tick.
    InvalidBaseline { tick: u32, baseline_tick: u32 },

    /// Tick 0 is reserved and cannot be encoded.
    ZeroTick,

    /// Baseline tick does not match the message.
    BaselineTickMismatch { expected: u32, found: u32 },

    /// Baseline tick not found in history.
    BaselineNotFound {
        /// The requested baseline tick.
        requested_tick: u32,
    },

    /// A removal names an entity the baseline does not have.
    EntityNotFound {
        /// The missing slot.
        slot: u16,
    },

    /// A message is not newer than the last one applied.
    StaleMessage { tick: u32, latest: u32 },
}

/// Specific limit that was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Entries,
    Slots,
    MessageBytes,
}

/// Details for invalid value errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueReason {
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    EnumOutOfRange {
        value: u32,
        variants: u32,
    },
    StringTooLong {
        len: usize,
        max_len: u16,
    },
    StringContainsNul,
    IndexOutOfRange {
        len: usize,
    },
}

impl CodecError {
    /// Returns how the caller must treat this error.
    ///
    /// Encode-side failures are programming errors; decode-side failures mean
    /// the message is discarded.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Bitstream(err) => err.class(),
            Self::WireEncode(_)
            | Self::EncodeLimitExceeded { .. }
            | Self::FieldCountMismatch { .. }
            | Self::InvalidValue { .. }
            | Self::UnknownField { .. }
            | Self::InvalidBaseline { .. }
            | Self::ZeroTick
            | Self::Baseline(_) => ErrorClass::ProtocolOverflow,
            _ => ErrorClass::TruncatedOrCorrupt,
        }
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::ProtocolOverflow)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::WireEncode(e) => write!(f, "wire encode error: {e}"),
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::Baseline(e) => write!(f, "baseline error: {e}"),
            Self::SchemaMismatch { expected, found } => {
                write!(
                    f,
                    "schema hash mismatch: expected 0x{expected:016X}, found 0x{found:016X}"
                )
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::EncodeLimitExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "cannot encode {actual} {kind}, limit is {limit}")
            }
            Self::FieldCountMismatch { expected, actual } => {
                write!(f, "expected {expected} field values, got {actual}")
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid value for field {field}: {reason}")
            }
            Self::UnknownField { name } => write!(f, "unknown field '{name}'"),
            Self::InvalidSlot { raw } => write!(f, "invalid entity slot {raw}"),
            Self::InvalidEntityOrder { previous, current } => {
                write!(f, "entity order invalid: {previous} then {current}")
            }
            Self::TrailingSectionData { section, remaining } => {
                write!(f, "trailing data in section {section:?}: {remaining} bytes")
            }
            Self::InvalidBaseline {
                tick: _,
                baseline_tick: 0,
            } => write!(f, "tick 0 is reserved and cannot serve as a baseline"),
            Self::InvalidBaseline {
                tick,
                baseline_tick,
            } => {
                write!(
                    f,
                    "baseline tick {baseline_tick} is not older than tick {tick}"
                )
            }
            Self::ZeroTick => write!(f, "tick 0 is reserved and cannot be encoded"),
            Self::BaselineTickMismatch { expected, found } => {
                write!(
                    f,
                    "baseline tick mismatch: expected {expected}, found {found}"
                )
            }
            Self::BaselineNotFound { requested_tick } => {
                write!(f, "baseline tick {requested_tick} not found in history")
            }
            Self::EntityNotFound { slot } => {
                write!(f, "entity {slot} not found")
            }
            Self::StaleMessage { tick, latest } => {
                write!(f, "stale message for tick {tick}, already at {latest}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entries => "entity entries",
            Self::Slots => "entity slots",
            Self::MessageBytes => "message bytes",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for ValueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected} but got {found}")
            }
            Self::EnumOutOfRange { value, variants } => {
                write!(f, "enum value {value} outside {variants} variants")
            }
            Self::StringTooLong { len, max_len } => {
                write!(f, "string of {len} bytes exceeds bound of {max_len}")
            }
            Self::StringContainsNul => write!(f, "string contains a NUL byte"),
            Self::IndexOutOfRange { len } => {
                write!(f, "field index outside schema of {len} fields")
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::WireEncode(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            Self::Baseline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<wire::EncodeError> for CodecError {
    fn from(err: wire::EncodeError) -> Self {
        Self::WireEncode(err)
    }
}

impl From<BitError> for CodecError {
    fn from(err: BitError) -> Self {
        Self::Bitstream(err)
    }
}

impl From<BaselineError> for CodecError {
    fn from(err: BaselineError) -> Self {
        Self::Baseline(err)
    }
}
