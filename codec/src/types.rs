//! Core types for the codec.

use std::fmt;
use std::num::NonZeroU16;

/// A simulation tick number.
///
/// Ticks are monotonically increasing identifiers for simulation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnapshotTick(u32);

impl SnapshotTick {
    /// Creates a new snapshot tick.
    #[must_use]
    pub const fn new(tick: u32) -> Self {
        Self(tick)
    }

    /// Returns the raw tick value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this tick is zero (used as "no baseline").
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for SnapshotTick {
    fn from(tick: u32) -> Self {
        Self(tick)
    }
}

impl From<SnapshotTick> for u32 {
    fn from(tick: SnapshotTick) -> Self {
        tick.0
    }
}

impl fmt::Display for SnapshotTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable small-integer entity slot.
///
/// Slot 0 is reserved and cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntitySlot(NonZeroU16);

impl EntitySlot {
    /// Creates a slot, or `None` for the reserved slot 0.
    #[must_use]
    pub const fn new(slot: u16) -> Option<Self> {
        match NonZeroU16::new(slot) {
            Some(slot) => Some(Self(slot)),
            None => None,
        }
    }

    /// Returns the raw slot number.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0.get()
    }
}

impl From<EntitySlot> for u16 {
    fn from(slot: EntitySlot) -> Self {
        slot.raw()
    }
}

impl fmt::Display for EntitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
