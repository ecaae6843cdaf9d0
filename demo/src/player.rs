//! Demo playback at the record level.

use std::io::{self, Read};

use bitstream::MessageBuffer;
use byteorder::{LittleEndian, ReadBytesExt};

use crate::config::DemoConfig;
use crate::error::{DemoError, DemoResult};
use crate::metadata::{read_metadata_record, DemoMetadata};
use crate::recorder::END_OF_STREAM;

/// Outcome of [`DemoPlayer::read_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoRead {
    /// A record was read into the buffer.
    Message,
    /// The end-of-stream sentinel was reached.
    EndOfStream,
}

/// Reads records from a demo written by [`DemoRecorder`](crate::DemoRecorder).
#[derive(Debug)]
pub struct DemoPlayer<R: Read> {
    reader: R,
    metadata: DemoMetadata,
    metadata_max_size: usize,
    records: u64,
    finished: bool,
}

impl<R: Read> DemoPlayer<R> {
    /// Reads and validates the metadata record.
    pub fn open(mut reader: R, config: &DemoConfig) -> DemoResult<Self> {
        let (metadata, metadata_max_size) =
            read_metadata_record(&mut reader, config.metadata_max_size, 0)?;
        Ok(Self {
            reader,
            metadata,
            metadata_max_size,
            records: 0,
            finished: false,
        })
    }

    #[must_use]
    pub const fn metadata(&self) -> &DemoMetadata {
        &self.metadata
    }

    /// Returns the size of the reserved metadata block.
    #[must_use]
    pub const fn metadata_max_size(&self) -> usize {
        self.metadata_max_size
    }

    /// Returns the number of records read so far.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Reads the next record into `msg` with its read cursor at the start.
    ///
    /// A length prefix larger than `msg.maxsize()` is fatal. Once the
    /// sentinel is reached every further call returns
    /// [`DemoRead::EndOfStream`].
    pub fn read_message(&mut self, msg: &mut MessageBuffer) -> DemoResult<DemoRead> {
        if self.finished {
            return Ok(DemoRead::EndOfStream);
        }
        let length = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(|err| self.eof_as_truncated(err))?;
        if length == END_OF_STREAM {
            self.finished = true;
            return Ok(DemoRead::EndOfStream);
        }
        if length as usize > msg.maxsize() {
            return Err(DemoError::Corrupt {
                length,
                max: msg.maxsize(),
            });
        }
        let dst = msg.reset_with_len(length as usize)?;
        if let Err(err) = self.reader.read_exact(dst) {
            msg.clear();
            return Err(self.eof_as_truncated(err));
        }
        self.records += 1;
        Ok(DemoRead::Message)
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn eof_as_truncated(&self, err: io::Error) -> DemoError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DemoError::Truncated {
                records: self.records,
            }
        } else {
            DemoError::Io(err)
        }
    }
}
