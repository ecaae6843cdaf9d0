//! Snapshot-level demo playback.

use std::collections::BTreeMap;
use std::io::Read;

use bitstream::MessageBuffer;
use codec::{decode_snapshot_message, Snapshot};
use schema::Schema;

use crate::config::DemoConfig;
use crate::error::DemoResult;
use crate::metadata::DemoMetadata;
use crate::player::{DemoPlayer, DemoRead};

/// Replays the snapshot frames of a demo.
///
/// Each record is decoded against the previous frame. Any malformed record
/// ends playback with an error.
#[derive(Debug)]
pub struct DemoPlayback<R: Read> {
    player: DemoPlayer<R>,
    schema: Schema,
    config: DemoConfig,
    buffer: MessageBuffer,
    state: Option<Snapshot>,
    config_strings: BTreeMap<u32, String>,
}

impl<R: Read> DemoPlayback<R> {
    #[must_use]
    pub fn new(player: DemoPlayer<R>, schema: Schema, config: DemoConfig) -> Self {
        Self {
            player,
            buffer: MessageBuffer::new(config.max_message_size),
            schema,
            config,
            state: None,
            config_strings: BTreeMap::new(),
        }
    }

    /// Opens `reader` and prepares it for playback.
    pub fn open(reader: R, schema: Schema, config: DemoConfig) -> DemoResult<Self> {
        let player = DemoPlayer::open(reader, &config)?;
        Ok(Self::new(player, schema, config))
    }

    #[must_use]
    pub const fn metadata(&self) -> &DemoMetadata {
        self.player.metadata()
    }

    /// Returns the most recent frame.
    #[must_use]
    pub const fn current(&self) -> Option<&Snapshot> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn config_string(&self, index: u32) -> Option<&str> {
        self.config_strings.get(&index).map(String::as_str)
    }

    /// Decodes the next frame, or returns `None` at the end of the demo.
    pub fn next_frame(&mut self) -> DemoResult<Option<&Snapshot>> {
        if self.player.read_message(&mut self.buffer)? == DemoRead::EndOfStream {
            return Ok(None);
        }
        let state = &self.state;
        let decoded = decode_snapshot_message(
            &self.schema,
            self.buffer.as_bytes(),
            &self.config.codec,
            &self.config.wire,
            |_| state.as_ref(),
        )?;

        if decoded.header.flags.is_bootstrap() {
            self.config_strings.clear();
        }
        self.config_strings.extend(decoded.config_strings);
        tracing::trace!(
            tick = decoded.header.tick,
            entities = decoded.snapshot.len(),
            "played demo frame"
        );
        self.state = Some(decoded.snapshot);
        Ok(self.state.as_ref())
    }

    /// Returns the record-level player.
    pub fn into_player(self) -> DemoPlayer<R> {
        self.player
    }
}
