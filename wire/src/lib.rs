//! Wire framing and message layout for the snapdelta codec.
//!
//! This crate handles the binary wire format: message headers, section
//! framing, the config string section body, and limit enforcement. It does
//! not know about entity state, only the structure of messages.
//!
//! # Design Principles
//!
//! - **Stable wire format** - The format is versioned and validated on decode.
//! - **Bounded decoding** - All length fields are validated against limits before iteration.
//! - **No domain knowledge** - This crate handles framing, not game logic.

mod config;
mod error;
mod header;
mod limits;
mod message;

pub use config::{decode_config_strings, encode_config_strings};
pub use error::{DecodeError, EncodeError, LimitKind, SectionFramingError, WireResult};
pub use header::{MessageFlags, MessageHeader, HEADER_SIZE, MAGIC, VERSION};
pub use limits::Limits;
pub use message::{
    decode_message, decode_sections, encode_message, encode_section, section_len, SectionTag,
    WireMessage, WireSection,
};
