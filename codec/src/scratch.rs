//! Reusable scratch buffers for codec operations.

use bitstream::MessageBuffer;

/// Scratch buffers for snapshot encoding.
///
/// Holding one of these across ticks avoids reallocating section bodies for
/// every message.
#[derive(Debug, Default)]
pub struct CodecScratch {
    pub(crate) entity: EntityScratch,
    pub(crate) entities: SectionBuf,
    pub(crate) config: SectionBuf,
}

impl CodecScratch {
    /// Creates a new scratch buffer with no pre-allocated capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Buffers used while composing entity entries.
#[derive(Debug, Default)]
pub(crate) struct EntityScratch {
    current_value: Vec<u8>,
    baseline_value: Vec<u8>,
    pub(crate) entries: SectionBuf,
}

impl EntityScratch {
    pub(crate) fn value_bufs_mut(&mut self) -> (&mut Vec<u8>, &mut Vec<u8>) {
        self.current_value.clear();
        self.baseline_value.clear();
        (&mut self.current_value, &mut self.baseline_value)
    }
}

/// A message buffer that is cleared, or resized, on each use.
#[derive(Debug)]
pub(crate) struct SectionBuf(MessageBuffer);

impl Default for SectionBuf {
    fn default() -> Self {
        Self(MessageBuffer::new(0))
    }
}

impl SectionBuf {
    pub(crate) fn reset(&mut self, maxsize: usize) -> &mut MessageBuffer {
        if self.0.maxsize() == maxsize {
            self.0.clear();
        } else {
            self.0 = MessageBuffer::new(maxsize);
        }
        &mut self.0
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}
