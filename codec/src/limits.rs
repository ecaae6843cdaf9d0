//! Limits for codec-level encoding and decoding.

/// Codec-specific limits enforced on snapshot bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Slots must be below this value.
    pub max_slots: usize,
    /// Maximum number of entity entries in one message.
    pub max_entries: usize,
    /// Number of sent or received snapshots kept as candidate baselines.
    pub baseline_history: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_slots: 8192,
            max_entries: 8192,
            baseline_history: 32,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_slots: 256,
            max_entries: 64,
            baseline_history: 8,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_slots: usize::MAX,
            max_entries: usize::MAX,
            baseline_history: 1024,
        }
    }
}
