//! Demo configuration.

use codec::CodecLimits;

/// Size of the metadata key/value block reserved at the start of a demo.
pub const METADATA_MAX_SIZE: usize = 65536;

/// Limits and sizes used when recording or playing a demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Largest record a player accepts, and the size of the live buffer.
    pub max_message_size: usize,
    /// Bytes reserved for metadata key/value pairs.
    pub metadata_max_size: usize,
    /// Limits for the snapshot bodies inside records.
    pub codec: CodecLimits,
    /// Limits for the wire messages inside records.
    pub wire: wire::Limits,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            max_message_size: 65536,
            metadata_max_size: METADATA_MAX_SIZE,
            codec: CodecLimits::default(),
            wire: wire::Limits::default(),
        }
    }
}

impl DemoConfig {
    /// Creates a configuration suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_message_size: 4096,
            metadata_max_size: 256,
            codec: CodecLimits::for_testing(),
            wire: wire::Limits::for_testing(),
        }
    }
}
