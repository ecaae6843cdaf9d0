//! Message header types and constants.

use bitstream::{BitResult, ByteReader, MessageBuffer};

/// Magic number identifying snapdelta messages. On the wire it reads "SNPD".
///
/// This value is fixed and must never change across versions.
pub const MAGIC: u32 = u32::from_le_bytes(*b"SNPD");

/// Current wire format version.
pub const VERSION: u16 = 1;

/// Header size in bytes (28 total).
pub const HEADER_SIZE: usize = 4 + 2 + 2 + 8 + 4 + 4 + 4;

/// Message flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MessageFlags(u16);

impl MessageFlags {
    /// The message carries every entity against the empty snapshot.
    pub const FULL_SNAPSHOT: u16 = 1 << 0;

    /// The message carries changes against an acknowledged baseline.
    pub const DELTA_SNAPSHOT: u16 = 1 << 1;

    /// The message is the self-contained start of a demo or session.
    pub const BOOTSTRAP: u16 = 1 << 2;

    /// Reserved bits mask (must be zero in version 1).
    const RESERVED_MASK: u16 = !0b111;

    /// Creates new flags from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn is_full_snapshot(self) -> bool {
        self.0 & Self::FULL_SNAPSHOT != 0
    }

    #[must_use]
    pub const fn is_delta_snapshot(self) -> bool {
        self.0 & Self::DELTA_SNAPSHOT != 0
    }

    #[must_use]
    pub const fn is_bootstrap(self) -> bool {
        self.0 & Self::BOOTSTRAP != 0
    }

    /// Returns `true` if the flags are valid for version 1.
    ///
    /// Exactly one of full/delta must be set, bootstrap only together with
    /// full, and no reserved bits.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        let has_full = self.is_full_snapshot();
        let has_delta = self.is_delta_snapshot();
        if self.0 & Self::RESERVED_MASK != 0 {
            return false;
        }
        if self.is_bootstrap() && !has_full {
            return false;
        }
        has_full ^ has_delta
    }

    /// Creates flags for a full snapshot.
    #[must_use]
    pub const fn full_snapshot() -> Self {
        Self(Self::FULL_SNAPSHOT)
    }

    /// Creates flags for a delta snapshot.
    #[must_use]
    pub const fn delta_snapshot() -> Self {
        Self(Self::DELTA_SNAPSHOT)
    }

    /// Creates flags for a bootstrap message.
    #[must_use]
    pub const fn bootstrap() -> Self {
        Self(Self::FULL_SNAPSHOT | Self::BOOTSTRAP)
    }
}

/// Message header (version 1).
///
/// The magic number is validated during decoding and not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Wire format version.
    pub version: u16,
    pub flags: MessageFlags,
    /// Schema hash for compatibility checking.
    pub schema_hash: u64,
    /// Simulation tick this snapshot represents.
    pub tick: u32,
    /// Baseline tick for delta messages (0 for full snapshots).
    pub baseline_tick: u32,
    /// Payload length in bytes.
    pub payload_len: u32,
}

impl MessageHeader {
    /// Creates a new header for a full snapshot.
    #[must_use]
    pub const fn full_snapshot(schema_hash: u64, tick: u32, payload_len: u32) -> Self {
        Self {
            version: VERSION,
            flags: MessageFlags::full_snapshot(),
            schema_hash,
            tick,
            baseline_tick: 0,
            payload_len,
        }
    }

    /// Creates a new header for a delta snapshot.
    #[must_use]
    pub const fn delta_snapshot(
        schema_hash: u64,
        tick: u32,
        baseline_tick: u32,
        payload_len: u32,
    ) -> Self {
        Self {
            version: VERSION,
            flags: MessageFlags::delta_snapshot(),
            schema_hash,
            tick,
            baseline_tick,
            payload_len,
        }
    }

    /// Creates a new header for a bootstrap message.
    #[must_use]
    pub const fn bootstrap(schema_hash: u64, tick: u32, payload_len: u32) -> Self {
        Self {
            version: VERSION,
            flags: MessageFlags::bootstrap(),
            schema_hash,
            tick,
            baseline_tick: 0,
            payload_len,
        }
    }

    /// Writes the header, magic first.
    pub fn write(&self, out: &mut MessageBuffer) -> BitResult<()> {
        out.ensure_free(HEADER_SIZE)?;
        out.write_u32(MAGIC)?;
        out.write_u16(self.version)?;
        out.write_u16(self.flags.raw())?;
        out.write_u64(self.schema_hash)?;
        out.write_u32(self.tick)?;
        out.write_u32(self.baseline_tick)?;
        out.write_u32(self.payload_len)
    }

    /// Reads the raw header fields after the magic, without validating them.
    pub(crate) fn read_fields(reader: &mut ByteReader<'_>) -> BitResult<Self> {
        Ok(Self {
            version: reader.read_u16()?,
            flags: MessageFlags::from_raw(reader.read_u16()?),
            schema_hash: reader.read_u64()?,
            tick: reader.read_u32()?,
            baseline_tick: reader.read_u32()?,
            payload_len: reader.read_u32()?,
        })
    }
}
