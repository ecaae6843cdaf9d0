//! Snapshot messages: a wire header plus config string and entity sections.

use bitstream::MessageBuffer;
use schema::{schema_hash, Schema};
use wire::{
    decode_config_strings, encode_config_strings, section_len, MessageHeader, SectionTag,
    WireSection, HEADER_SIZE,
};

use crate::delta::{decode_snapshot_delta, encode_body};
use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::scratch::CodecScratch;
use crate::snapshot::Snapshot;
use crate::types::SnapshotTick;

/// What a snapshot message is encoded against.
#[derive(Debug, Clone, Copy)]
pub enum MessageKind<'a> {
    /// Delta against the empty snapshot.
    Full,
    /// Full snapshot that starts a self-contained stream, such as a demo.
    /// Receivers reset their config strings on it.
    Bootstrap,
    /// Delta against a baseline the receiver holds.
    Delta { baseline: &'a Snapshot },
}

/// A decoded snapshot message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub header: MessageHeader,
    /// Config strings carried by the message, in wire order.
    pub config_strings: Vec<(u32, String)>,
    /// The reconstructed snapshot at `header.tick`.
    pub snapshot: Snapshot,
}

/// Encodes `current` as a complete message into `out`.
///
/// Nothing is written unless the whole message fits. Returns the bytes
/// written. Tick 0 is reserved and rejected with [`CodecError::ZeroTick`].
#[allow(clippy::too_many_arguments)]
pub fn encode_snapshot_message(
    schema: &Schema,
    kind: MessageKind<'_>,
    current: &Snapshot,
    config_strings: &[(u32, &str)],
    limits: &CodecLimits,
    wire_limits: &wire::Limits,
    scratch: &mut CodecScratch,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    if current.tick.is_zero() {
        return Err(CodecError::ZeroTick);
    }
    let hash = schema_hash(schema);
    let tick = current.tick.raw();
    let empty = Snapshot::default();
    let (header, baseline) = match kind {
        MessageKind::Full => (MessageHeader::full_snapshot(hash, tick, 0), &empty),
        MessageKind::Bootstrap => (MessageHeader::bootstrap(hash, tick, 0), &empty),
        MessageKind::Delta { baseline } => {
            if baseline.tick.is_zero() || baseline.tick >= current.tick {
                return Err(CodecError::InvalidBaseline {
                    tick,
                    baseline_tick: baseline.tick.raw(),
                });
            }
            (
                MessageHeader::delta_snapshot(hash, tick, baseline.tick.raw(), 0),
                baseline,
            )
        }
    };

    let CodecScratch {
        entity,
        entities,
        config,
    } = scratch;
    let config = config.reset(wire_limits.max_section_len);
    if !config_strings.is_empty() {
        encode_config_strings(config_strings, wire_limits, config)?;
    }
    encode_body(
        schema,
        baseline,
        current,
        limits,
        entity,
        entities.reset(wire_limits.max_section_len),
    )?;

    let mut sections = Vec::with_capacity(2);
    if !config_strings.is_empty() {
        sections.push(WireSection {
            tag: SectionTag::ConfigStrings,
            body: config.as_bytes(),
        });
    }
    sections.push(WireSection {
        tag: SectionTag::Entities,
        body: entities.as_bytes(),
    });

    let total = HEADER_SIZE
        + sections
            .iter()
            .map(|section| section_len(section.body.len()))
            .sum::<usize>();
    if total > wire_limits.max_message_bytes {
        return Err(CodecError::EncodeLimitExceeded {
            kind: LimitKind::MessageBytes,
            limit: wire_limits.max_message_bytes,
            actual: total,
        });
    }
    let written = wire::encode_message(&header, &sections, out)?;
    tracing::debug!(
        tick,
        baseline_tick = header.baseline_tick,
        bytes = written,
        entities = current.len(),
        "encoded snapshot message"
    );
    Ok(written)
}

/// Encodes `current` as a full snapshot message.
pub fn encode_full_snapshot_message(
    schema: &Schema,
    current: &Snapshot,
    limits: &CodecLimits,
    wire_limits: &wire::Limits,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    encode_snapshot_message(
        schema,
        MessageKind::Full,
        current,
        &[],
        limits,
        wire_limits,
        &mut CodecScratch::default(),
        out,
    )
}

/// Encodes `current` as a delta message against `baseline`.
pub fn encode_delta_snapshot_message(
    schema: &Schema,
    baseline: &Snapshot,
    current: &Snapshot,
    limits: &CodecLimits,
    wire_limits: &wire::Limits,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    encode_snapshot_message(
        schema,
        MessageKind::Delta { baseline },
        current,
        &[],
        limits,
        wire_limits,
        &mut CodecScratch::default(),
        out,
    )
}

/// Decodes a message produced by [`encode_snapshot_message`].
///
/// `baseline` is asked for the snapshot a delta message was encoded against.
/// A missing entity section means no entity changed.
pub fn decode_snapshot_message<'b>(
    schema: &Schema,
    bytes: &[u8],
    limits: &CodecLimits,
    wire_limits: &wire::Limits,
    baseline: impl FnOnce(SnapshotTick) -> Option<&'b Snapshot>,
) -> CodecResult<DecodedMessage> {
    let message = wire::decode_message(bytes, wire_limits)?;
    let header = message.header;
    let expected = schema_hash(schema);
    if header.schema_hash != expected {
        return Err(CodecError::SchemaMismatch {
            expected,
            found: header.schema_hash,
        });
    }

    let config_strings = match message.section(SectionTag::ConfigStrings) {
        Some(body) => decode_config_strings(body, wire_limits)?
            .into_iter()
            .map(|(index, value)| (index, value.to_owned()))
            .collect(),
        None => Vec::new(),
    };

    let empty = Snapshot::default();
    let base = if header.flags.is_delta_snapshot() {
        let requested = SnapshotTick::new(header.baseline_tick);
        let found = baseline(requested).ok_or(CodecError::BaselineNotFound {
            requested_tick: header.baseline_tick,
        })?;
        if found.tick != requested {
            return Err(CodecError::BaselineTickMismatch {
                expected: header.baseline_tick,
                found: found.tick.raw(),
            });
        }
        found
    } else {
        &empty
    };

    let tick = SnapshotTick::new(header.tick);
    let body = message.section(SectionTag::Entities).unwrap_or(&[0]);
    let snapshot = decode_snapshot_delta(schema, base, body, tick, limits)?;
    tracing::debug!(
        tick = header.tick,
        baseline_tick = header.baseline_tick,
        bytes = bytes.len(),
        entities = snapshot.len(),
        "decoded snapshot message"
    );
    Ok(DecodedMessage {
        header,
        config_strings,
        snapshot,
    })
}
