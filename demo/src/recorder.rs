//! Demo recording.

use std::collections::BTreeMap;
use std::io::Write;

use bitstream::MessageBuffer;
use byteorder::{LittleEndian, WriteBytesExt};
use codec::{encode_snapshot_message, CodecError, CodecScratch, MessageKind, Snapshot};
use schema::Schema;

use crate::config::DemoConfig;
use crate::error::{DemoError, DemoResult};
use crate::metadata::{metadata_record_len, write_metadata_record, DemoMetadata};

/// Length prefix that terminates a demo.
pub const END_OF_STREAM: u32 = u32::MAX;

#[derive(Debug, Clone)]
struct ConfigString {
    value: String,
    /// Changed since the last recorded frame.
    dirty: bool,
}

/// Writes a demo: the metadata record, then length-prefixed records, then
/// the end-of-stream sentinel on [`stop`](Self::stop).
///
/// Records come from three sources: raw messages via
/// [`record_message`](Self::record_message), the live buffer via
/// [`safe_write`](Self::safe_write), and snapshot frames via
/// [`record_snapshot`](Self::record_snapshot). The first snapshot frame is
/// a bootstrap carrying every config string and every entity in full, so
/// playback needs nothing from before the demo started.
#[derive(Debug)]
pub struct DemoRecorder<W: Write> {
    writer: W,
    config: DemoConfig,
    live: MessageBuffer,
    frame: MessageBuffer,
    scratch: CodecScratch,
    config_strings: BTreeMap<u32, ConfigString>,
    last: Option<Snapshot>,
    records: u64,
    bytes_written: u64,
}

impl<W: Write> DemoRecorder<W> {
    /// Writes the metadata record and returns a recorder ready for frames.
    pub fn start(mut writer: W, metadata: &DemoMetadata, config: DemoConfig) -> DemoResult<Self> {
        write_metadata_record(&mut writer, metadata, config.metadata_max_size, 0)?;
        tracing::info!(
            entries = metadata.len(),
            metadata_max_size = config.metadata_max_size,
            "demo recording started"
        );
        Ok(Self {
            writer,
            live: MessageBuffer::new(config.max_message_size),
            frame: MessageBuffer::new(config.wire.max_message_bytes),
            scratch: CodecScratch::new(),
            config_strings: BTreeMap::new(),
            last: None,
            records: 0,
            bytes_written: metadata_record_len(config.metadata_max_size) as u64,
            config,
        })
    }

    /// Returns the number of records written, metadata excluded.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns the live buffer that [`safe_write`](Self::safe_write) flushes.
    pub fn buffer_mut(&mut self) -> &mut MessageBuffer {
        &mut self.live
    }

    /// Writes `msg[skip..]` as one record.
    pub fn record_message(&mut self, msg: &MessageBuffer, skip: usize) -> DemoResult<()> {
        let bytes = msg.as_bytes().get(skip..).ok_or(DemoError::InvalidSkip {
            skip,
            len: msg.cursize(),
        })?;
        self.put_record(bytes)
    }

    /// Flushes the live buffer as a record once it is more than half full.
    ///
    /// Returns `true` if a record was written.
    pub fn safe_write(&mut self) -> DemoResult<bool> {
        if self.live.cursize() > self.live.maxsize() / 2 {
            self.flush_live()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Sets a config string. The next frame carries it.
    pub fn set_config_string(&mut self, index: u32, value: impl Into<String>) -> DemoResult<()> {
        let max = self.config.wire.max_config_strings;
        if index as usize >= max {
            let err = wire::EncodeError::ConfigStringIndex { index, max };
            return Err(CodecError::from(err).into());
        }
        self.config_strings.insert(
            index,
            ConfigString {
                value: value.into(),
                dirty: true,
            },
        );
        Ok(())
    }

    /// Records `current` as a frame: a bootstrap if it is the first, else a
    /// delta against the previous frame. Ticks must be nonzero and strictly
    /// increase.
    ///
    /// Every frame after the first must use the same schema. Returns the
    /// size of the frame.
    pub fn record_snapshot(&mut self, schema: &Schema, current: &Snapshot) -> DemoResult<usize> {
        self.encode_frame(schema, current, self.last.is_none())
    }

    /// Records `current` as a bootstrap frame even if earlier frames exist.
    pub fn record_bootstrap(&mut self, schema: &Schema, current: &Snapshot) -> DemoResult<usize> {
        self.encode_frame(schema, current, true)
    }

    /// Flushes pending data, writes the end-of-stream sentinel and returns
    /// the writer.
    pub fn stop(mut self) -> DemoResult<W> {
        self.flush_live()?;
        self.writer.write_u32::<LittleEndian>(END_OF_STREAM)?;
        self.writer.flush()?;
        self.bytes_written += 4;
        tracing::info!(
            records = self.records,
            bytes = self.bytes_written,
            "demo recording stopped"
        );
        Ok(self.writer)
    }

    fn encode_frame(
        &mut self,
        schema: &Schema,
        current: &Snapshot,
        bootstrap: bool,
    ) -> DemoResult<usize> {
        self.flush_live()?;
        let quantized = current.quantized(schema);
        let kind = match &self.last {
            Some(baseline) if !bootstrap => MessageKind::Delta { baseline },
            _ => MessageKind::Bootstrap,
        };
        let config: Vec<(u32, &str)> = self
            .config_strings
            .iter()
            .filter(|(_, entry)| bootstrap || entry.dirty)
            .map(|(index, entry)| (*index, entry.value.as_str()))
            .collect();

        self.frame.clear();
        encode_snapshot_message(
            schema,
            kind,
            &quantized,
            &config,
            &self.config.codec,
            &self.config.wire,
            &mut self.scratch,
            &mut self.frame,
        )?;
        let len = self.frame.cursize();
        write_record(
            &mut self.writer,
            self.frame.as_bytes(),
            self.config.max_message_size,
        )?;
        self.note_record(len);

        for entry in self.config_strings.values_mut() {
            entry.dirty = false;
        }
        tracing::debug!(tick = %quantized.tick, bytes = len, bootstrap, "recorded demo frame");
        self.last = Some(quantized);
        Ok(len)
    }

    fn flush_live(&mut self) -> DemoResult<()> {
        if self.live.is_empty() {
            return Ok(());
        }
        write_record(
            &mut self.writer,
            self.live.as_bytes(),
            self.config.max_message_size,
        )?;
        self.note_record(self.live.cursize());
        self.live.clear();
        Ok(())
    }

    fn put_record(&mut self, bytes: &[u8]) -> DemoResult<()> {
        write_record(&mut self.writer, bytes, self.config.max_message_size)?;
        self.note_record(bytes.len());
        Ok(())
    }

    fn note_record(&mut self, len: usize) {
        self.records += 1;
        self.bytes_written += 4 + len as u64;
    }
}

fn write_record<W: Write>(writer: &mut W, bytes: &[u8], max: usize) -> DemoResult<()> {
    let length = u32::try_from(bytes.len())
        .ok()
        .filter(|&length| length != END_OF_STREAM && bytes.len() <= max)
        .ok_or(DemoError::MessageTooLarge {
            len: bytes.len(),
            max,
        })?;
    writer.write_u32::<LittleEndian>(length)?;
    writer.write_all(bytes)?;
    Ok(())
}
