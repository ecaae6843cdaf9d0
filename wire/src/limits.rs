//! Configurable limits for bounded decoding.

/// Wire-level limits for message decoding.
///
/// These limits are enforced during decoding to prevent resource exhaustion
/// and ensure bounded memory usage. Entity body limits belong to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum message size in bytes, header included.
    pub max_message_bytes: usize,

    /// Maximum number of sections in a message.
    pub max_sections: usize,

    /// Maximum length of a single section body in bytes.
    pub max_section_len: usize,

    /// Size of the config string table; indices must be below it.
    pub max_config_strings: usize,

    /// Maximum length of one config string in bytes.
    pub max_config_string_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // Matches the demo maximum message size.
            max_message_bytes: 64 * 1024,
            max_sections: 4,
            max_section_len: 64 * 1024,
            max_config_strings: 4096,
            max_config_string_len: 1024,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_message_bytes: 4096,
            max_sections: 2,
            max_section_len: 1024,
            max_config_strings: 64,
            max_config_string_len: 64,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_message_bytes: usize::MAX,
            max_sections: usize::MAX,
            max_section_len: usize::MAX,
            max_config_strings: usize::MAX,
            max_config_string_len: usize::MAX,
        }
    }
}
