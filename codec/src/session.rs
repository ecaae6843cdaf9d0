//! Live snapshot replication over a transport.
//!
//! [`SnapshotSender`] keeps a history of the snapshots it sent and encodes
//! each new one against the baseline the receiver last acknowledged, falling
//! back to a full snapshot when there is none. [`SnapshotReceiver`] keeps the
//! snapshots it reconstructed so any of them can serve as a baseline.
//! Malformed messages are dropped and the receiver keeps waiting.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use bitstream::MessageBuffer;
use schema::Schema;

use crate::baseline::BaselineStore;
use crate::error::{CodecError, CodecResult};
use crate::limits::CodecLimits;
use crate::message::{decode_snapshot_message, encode_snapshot_message, MessageKind};
use crate::scratch::CodecScratch;
use crate::snapshot::Snapshot;
use crate::types::SnapshotTick;

/// Unreliable datagram delivery supplied by the network layer.
pub trait Transport {
    /// Sends one message.
    fn send(&mut self, message: &[u8]);

    /// Returns the next received message, if any.
    fn receive(&mut self) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone)]
struct ConfigEntry {
    value: String,
    /// Tick of the first message that carried the current value.
    first_sent: Option<SnapshotTick>,
}

/// The sending half of a replication session.
#[derive(Debug)]
pub struct SnapshotSender {
    schema: Schema,
    limits: CodecLimits,
    wire_limits: wire::Limits,
    history: BaselineStore<Snapshot>,
    config: BTreeMap<u32, ConfigEntry>,
    scratch: CodecScratch,
    out: MessageBuffer,
}

impl SnapshotSender {
    #[must_use]
    pub fn new(schema: Schema, limits: CodecLimits, wire_limits: wire::Limits) -> Self {
        let capacity = NonZeroUsize::new(limits.baseline_history).unwrap_or(NonZeroUsize::MIN);
        let out = MessageBuffer::new(wire_limits.max_message_bytes);
        Self {
            schema,
            limits,
            wire_limits,
            history: BaselineStore::new(capacity),
            config: BTreeMap::new(),
            scratch: CodecScratch::new(),
            out,
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Sets a config string. It is resent with every message until a message
    /// carrying it is acknowledged.
    pub fn set_config_string(&mut self, index: u32, value: impl Into<String>) -> CodecResult<()> {
        if index as usize >= self.wire_limits.max_config_strings {
            return Err(wire::EncodeError::ConfigStringIndex {
                index,
                max: self.wire_limits.max_config_strings,
            }
            .into());
        }
        self.config.insert(
            index,
            ConfigEntry {
                value: value.into(),
                first_sent: None,
            },
        );
        Ok(())
    }

    /// Returns the config string at `index`.
    #[must_use]
    pub fn config_string(&self, index: u32) -> Option<&str> {
        self.config.get(&index).map(|entry| entry.value.as_str())
    }

    /// Returns the tick of the baseline new messages are encoded against.
    #[must_use]
    pub fn agreed_tick(&self) -> Option<SnapshotTick> {
        self.history.agreed().map(|(tick, _)| tick)
    }

    /// Encodes `current` for the receiver and records it as a candidate
    /// baseline. Ticks must be nonzero and strictly increase.
    pub fn encode(&mut self, current: &Snapshot) -> CodecResult<&[u8]> {
        let quantized = current.quantized(&self.schema);
        let kind = match self.history.agreed() {
            Some((_, baseline)) => MessageKind::Delta { baseline },
            None => MessageKind::Full,
        };
        let resend_all = matches!(kind, MessageKind::Full);
        let config: Vec<(u32, &str)> = self
            .config
            .iter()
            .filter(|(_, entry)| resend_all || !is_acked(entry, self.history.agreed()))
            .map(|(index, entry)| (*index, entry.value.as_str()))
            .collect();

        self.out.clear();
        encode_snapshot_message(
            &self.schema,
            kind,
            &quantized,
            &config,
            &self.limits,
            &self.wire_limits,
            &mut self.scratch,
            &mut self.out,
        )?;

        self.history.insert(quantized.tick, quantized)?;
        for entry in self.config.values_mut() {
            entry.first_sent.get_or_insert(current.tick);
        }
        Ok(self.out.as_bytes())
    }

    /// Encodes `current` and hands it to `transport`.
    pub fn send<T: Transport>(
        &mut self,
        current: &Snapshot,
        transport: &mut T,
    ) -> CodecResult<usize> {
        let message = self.encode(current)?;
        transport.send(message);
        Ok(message.len())
    }

    /// Records that the receiver reconstructed the snapshot at `tick`.
    pub fn acknowledge(&mut self, tick: SnapshotTick) -> CodecResult<()> {
        self.history.acknowledge(tick)?;
        tracing::trace!(%tick, "baseline acknowledged");
        Ok(())
    }

    /// Forgets all history so the next message is a full snapshot.
    pub fn reset(&mut self) {
        self.history.clear();
        for entry in self.config.values_mut() {
            entry.first_sent = None;
        }
    }
}

fn is_acked(entry: &ConfigEntry, agreed: Option<(SnapshotTick, &Snapshot)>) -> bool {
    match (entry.first_sent, agreed) {
        (Some(sent), Some((tick, _))) => sent <= tick,
        _ => false,
    }
}

/// The receiving half of a replication session.
#[derive(Debug)]
pub struct SnapshotReceiver {
    schema: Schema,
    limits: CodecLimits,
    wire_limits: wire::Limits,
    history: BaselineStore<Snapshot>,
    config: BTreeMap<u32, String>,
}

impl SnapshotReceiver {
    #[must_use]
    pub fn new(schema: Schema, limits: CodecLimits, wire_limits: wire::Limits) -> Self {
        let capacity = NonZeroUsize::new(limits.baseline_history).unwrap_or(NonZeroUsize::MIN);
        Self {
            schema,
            limits,
            wire_limits,
            history: BaselineStore::new(capacity),
            config: BTreeMap::new(),
        }
    }

    /// Decodes and applies one message, returning the tick to acknowledge.
    ///
    /// On error nothing is changed.
    pub fn apply(&mut self, bytes: &[u8]) -> CodecResult<SnapshotTick> {
        let history = &self.history;
        let decoded = decode_snapshot_message(
            &self.schema,
            bytes,
            &self.limits,
            &self.wire_limits,
            |tick| history.get(tick),
        )?;
        let tick = decoded.snapshot.tick;
        if let Some((latest, _)) = self.history.latest() {
            if tick <= latest {
                return Err(CodecError::StaleMessage {
                    tick: tick.raw(),
                    latest: latest.raw(),
                });
            }
        }

        if decoded.header.flags.is_bootstrap() {
            self.config.clear();
        }
        for (index, value) in decoded.config_strings {
            self.config.insert(index, value);
        }
        self.history.insert(tick, decoded.snapshot)?;
        Ok(tick)
    }

    /// Applies every pending message from `transport`.
    ///
    /// Malformed or stale messages are dropped with a warning. Returns the
    /// newest tick applied, which the caller acknowledges to the sender.
    pub fn poll<T: Transport>(&mut self, transport: &mut T) -> Option<SnapshotTick> {
        let mut newest = None;
        while let Some(message) = transport.receive() {
            match self.apply(&message) {
                Ok(tick) => newest = Some(tick),
                Err(err) => {
                    tracing::warn!(error = %err, len = message.len(), "dropping snapshot message");
                }
            }
        }
        newest
    }

    /// Returns the newest reconstructed snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.latest().map(|(_, snapshot)| snapshot)
    }

    /// Returns the config string at `index`.
    #[must_use]
    pub fn config_string(&self, index: u32) -> Option<&str> {
        self.config.get(&index).map(String::as_str)
    }
}
