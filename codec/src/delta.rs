//! Delta composition: per-entity field deltas and snapshot delta bodies.
//!
//! The field block of an entity is one field mask block with one flag per
//! schema leaf, in declaration order. An entity is carried as an exists
//! byte followed, when the entity exists, by its field block:
//!
//! ```text
//! entity block = u8 exists (0 | 1) | field block if exists
//! body         = varu32 entry_count | entry_count * (varu32 slot | entity block)
//! ```
//!
//! Entries are in strictly ascending slot order. A full snapshot is a delta
//! against the empty snapshot.

use std::cmp::Ordering;

use bitstream::{varint_len, BitError, ByteReader, DeltaReader, DeltaWriter, MessageBuffer};
use schema::{enum_width, FieldKind, Schema};

use crate::error::{CodecError, CodecResult, LimitKind};
use crate::limits::CodecLimits;
use crate::scratch::{CodecScratch, EntityScratch};
use crate::snapshot::{EntityState, FieldValue, Snapshot};
use crate::types::{EntitySlot, SnapshotTick};

const ENTITY_REMOVED: u8 = 0;
const ENTITY_PRESENT: u8 = 1;

/// Encodes the leaves of `current` as a field block into `out`.
///
/// Flag `i` of the mask belongs to schema leaf `i` and is set only when that
/// leaf differs from `baseline` (or from zero when `baseline` is `None`)
/// after quantization. Returns the number of leaves that changed.
pub fn encode_fields(
    schema: &Schema,
    baseline: Option<&EntityState>,
    current: &EntityState,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    let mut scratch = EntityScratch::default();
    let (writer, changed) = compose_fields(schema, baseline, current, &mut scratch)?;
    writer.finish_into(out)?;
    Ok(changed)
}

/// Decodes a field block produced by [`encode_fields`] on top of `baseline`.
pub fn decode_fields(
    schema: &Schema,
    baseline: Option<&EntityState>,
    reader: &mut ByteReader<'_>,
) -> CodecResult<EntityState> {
    let mut state = match baseline {
        Some(state) => {
            check_len(schema, state)?;
            state.clone()
        }
        None => EntityState::zeroed(schema),
    };

    let mut delta = DeltaReader::begin(reader, schema.len());
    for (slot, def) in state.values_mut().iter_mut().zip(&schema.fields) {
        if delta.get_bit() {
            *slot = read_value(def.kind, &mut delta);
        }
    }
    delta.finish()?;
    Ok(state)
}

/// Encodes one entity: the exists byte, then its field block.
///
/// `baseline` is the state both sides agree on, or `None` for the all-zero
/// state. `current` is `None` when the entity no longer exists, which costs
/// the single exists byte. Returns the number of leaves that changed.
pub fn encode_entity_delta(
    schema: &Schema,
    baseline: Option<&EntityState>,
    current: Option<&EntityState>,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    let Some(current) = current else {
        out.write_u8(ENTITY_REMOVED)?;
        return Ok(0);
    };
    let mut scratch = EntityScratch::default();
    let (writer, changed) = compose_fields(schema, baseline, current, &mut scratch)?;
    out.ensure_free(1 + writer.encoded_len())?;
    out.write_u8(ENTITY_PRESENT)?;
    writer.finish_into(out)?;
    Ok(changed)
}

/// Decodes one entity block produced by [`encode_entity_delta`].
///
/// Returns `None` when the block marks the entity as removed.
pub fn decode_entity_delta(
    schema: &Schema,
    baseline: Option<&EntityState>,
    reader: &mut ByteReader<'_>,
) -> CodecResult<Option<EntityState>> {
    match reader.read_u8()? {
        ENTITY_REMOVED => Ok(None),
        ENTITY_PRESENT => decode_fields(schema, baseline, reader).map(Some),
        other => Err(BitError::RangeViolation {
            value: u64::from(other),
            limit: 2,
        }
        .into()),
    }
}

/// Encodes the changes from `baseline` to `current` as a snapshot delta body.
///
/// Nothing is written unless the whole body fits. Returns the bytes written.
pub fn encode_snapshot_delta(
    schema: &Schema,
    baseline: &Snapshot,
    current: &Snapshot,
    limits: &CodecLimits,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    let mut scratch = CodecScratch::default();
    encode_snapshot_delta_with_scratch(schema, baseline, current, limits, &mut scratch, out)
}

/// Encodes a snapshot delta body using reusable scratch buffers.
pub fn encode_snapshot_delta_with_scratch(
    schema: &Schema,
    baseline: &Snapshot,
    current: &Snapshot,
    limits: &CodecLimits,
    scratch: &mut CodecScratch,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    encode_body(schema, baseline, current, limits, &mut scratch.entity, out)
}

/// Encodes `current` as a delta against the empty snapshot.
pub fn encode_full_snapshot(
    schema: &Schema,
    current: &Snapshot,
    limits: &CodecLimits,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    encode_snapshot_delta(schema, &Snapshot::default(), current, limits, out)
}

/// Applies a snapshot delta body to `baseline`, producing the snapshot at
/// `tick`.
pub fn decode_snapshot_delta(
    schema: &Schema,
    baseline: &Snapshot,
    body: &[u8],
    tick: SnapshotTick,
    limits: &CodecLimits,
) -> CodecResult<Snapshot> {
    let mut reader = ByteReader::new(body);
    let count = reader.read_varu32()? as usize;
    if count > limits.max_entries {
        return Err(CodecError::LimitsExceeded {
            kind: LimitKind::Entries,
            limit: limits.max_entries,
            actual: count,
        });
    }

    let mut snapshot = Snapshot {
        tick,
        entities: baseline.entities.clone(),
    };
    let mut previous: Option<EntitySlot> = None;
    for _ in 0..count {
        let raw = reader.read_varu32()?;
        let slot = u16::try_from(raw)
            .ok()
            .and_then(EntitySlot::new)
            .ok_or(CodecError::InvalidSlot { raw })?;
        if usize::from(slot.raw()) >= limits.max_slots {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::Slots,
                limit: limits.max_slots,
                actual: usize::from(slot.raw()),
            });
        }
        if let Some(prev) = previous {
            if slot <= prev {
                return Err(CodecError::InvalidEntityOrder {
                    previous: prev.raw(),
                    current: slot.raw(),
                });
            }
        }
        previous = Some(slot);

        match decode_entity_delta(schema, baseline.get(slot), &mut reader)? {
            Some(state) => {
                snapshot.entities.insert(slot, state);
            }
            None => {
                if snapshot.entities.remove(&slot).is_none() {
                    return Err(CodecError::EntityNotFound { slot: slot.raw() });
                }
            }
        }
    }

    if !reader.is_empty() {
        return Err(CodecError::TrailingSectionData {
            section: wire::SectionTag::Entities,
            remaining: reader.remaining(),
        });
    }
    Ok(snapshot)
}

/// Decodes a full snapshot body.
pub fn decode_full_snapshot(
    schema: &Schema,
    body: &[u8],
    tick: SnapshotTick,
    limits: &CodecLimits,
) -> CodecResult<Snapshot> {
    decode_snapshot_delta(schema, &Snapshot::default(), body, tick, limits)
}

pub(crate) fn encode_body(
    schema: &Schema,
    baseline: &Snapshot,
    current: &Snapshot,
    limits: &CodecLimits,
    scratch: &mut EntityScratch,
    out: &mut MessageBuffer,
) -> CodecResult<usize> {
    // Entries are staged so the count prefix can precede them and a body
    // that does not fit leaves `out` untouched.
    let mut staged = std::mem::take(&mut scratch.entries);
    let result = stage_entries(
        schema,
        baseline,
        current,
        limits,
        scratch,
        staged.reset(out.free()),
    )
    .and_then(|count| {
        let total = varint_len(u64::from(count)) + staged.as_bytes().len();
        out.ensure_free(total)?;
        out.write_varu32(count)?;
        out.write_bytes(staged.as_bytes())?;
        tracing::trace!(
            entries = count,
            bytes = total,
            "encoded snapshot delta body"
        );
        Ok(total)
    });
    scratch.entries = staged;
    result
}

/// Writes every changed entity into `entries`, returning the entry count.
fn stage_entries(
    schema: &Schema,
    baseline: &Snapshot,
    current: &Snapshot,
    limits: &CodecLimits,
    scratch: &mut EntityScratch,
    entries: &mut MessageBuffer,
) -> CodecResult<u32> {
    let mut count = 0u32;
    for (slot, base, cur) in merge_slots(baseline, current) {
        if usize::from(slot.raw()) >= limits.max_slots {
            return Err(CodecError::EncodeLimitExceeded {
                kind: LimitKind::Slots,
                limit: limits.max_slots,
                actual: usize::from(slot.raw()),
            });
        }
        let Some(cur) = cur else {
            entries.write_varu32(u32::from(slot.raw()))?;
            entries.write_u8(ENTITY_REMOVED)?;
            count += 1;
            continue;
        };
        let (writer, changed) = compose_fields(schema, base, cur, scratch)?;
        if base.is_some() && changed == 0 {
            continue;
        }
        entries.write_varu32(u32::from(slot.raw()))?;
        entries.write_u8(ENTITY_PRESENT)?;
        writer.finish_into(entries)?;
        count += 1;
    }
    if count as usize > limits.max_entries {
        return Err(CodecError::EncodeLimitExceeded {
            kind: LimitKind::Entries,
            limit: limits.max_entries,
            actual: count as usize,
        });
    }
    Ok(count)
}

fn compose_fields(
    schema: &Schema,
    baseline: Option<&EntityState>,
    current: &EntityState,
    scratch: &mut EntityScratch,
) -> CodecResult<(DeltaWriter, usize)> {
    check_len(schema, current)?;
    if let Some(baseline) = baseline {
        check_len(schema, baseline)?;
    }

    let mut writer = DeltaWriter::new(schema.max_payload_len()).with_max_fields(schema.len());
    let mut changed = 0;
    for (index, (def, value)) in schema.fields.iter().zip(current.values()).enumerate() {
        let (cur_bytes, base_bytes) = scratch.value_bufs_mut();
        write_value(def.kind, value, index, cur_bytes)?;
        match baseline.and_then(|state| state.get(index)) {
            Some(base) => write_value(def.kind, base, index, base_bytes)?,
            None => write_value(def.kind, &FieldValue::zero(def.kind), index, base_bytes)?,
        }
        if cur_bytes == base_bytes {
            writer.add_bit(false);
        } else {
            writer.add_bit(true);
            writer.add_bytes(cur_bytes);
            changed += 1;
        }
    }
    if let Some(err) = writer.error() {
        return Err(err.clone().into());
    }
    Ok((writer, changed))
}

fn check_len(schema: &Schema, state: &EntityState) -> CodecResult<()> {
    if state.values().len() == schema.len() {
        Ok(())
    } else {
        Err(CodecError::FieldCountMismatch {
            expected: schema.len(),
            actual: state.values().len(),
        })
    }
}

/// Appends the wire bytes of `value` after quantization.
fn write_value(
    kind: FieldKind,
    value: &FieldValue,
    field: usize,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    value
        .check(kind)
        .map_err(|reason| CodecError::InvalidValue { field, reason })?;
    match (kind, value) {
        (FieldKind::Float(codec), FieldValue::F32(v)) => {
            let bits = codec.to_bits(codec.quantize(*v));
            out.extend_from_slice(&bits.to_le_bytes()[..codec.wire_size()]);
        }
        (FieldKind::Enum { variants }, FieldValue::Enum(v)) => {
            out.extend_from_slice(&v.to_le_bytes()[..enum_width(variants)]);
        }
        (_, FieldValue::Bool(v)) => out.push(u8::from(*v)),
        (_, FieldValue::U8(v)) => out.push(*v),
        (_, FieldValue::U16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::U32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::U64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::I8(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::I16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::I32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::I64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (_, FieldValue::Str(text)) => {
            out.extend_from_slice(text.as_bytes());
            out.push(0);
        }
        // `check` has matched kind and value.
        (_, FieldValue::F32(_) | FieldValue::Enum(_)) => {}
    }
    Ok(())
}

/// Reads one leaf; out-of-domain values set the sticky error.
fn read_value(kind: FieldKind, delta: &mut DeltaReader<'_, '_>) -> FieldValue {
    match kind {
        FieldKind::Bool => {
            let [byte] = delta.get_array::<1>();
            if byte > 1 {
                delta.set_error(BitError::RangeViolation {
                    value: u64::from(byte),
                    limit: 2,
                });
            }
            FieldValue::Bool(byte == 1)
        }
        FieldKind::U8 => FieldValue::U8(u8::from_le_bytes(delta.get_array())),
        FieldKind::U16 => FieldValue::U16(u16::from_le_bytes(delta.get_array())),
        FieldKind::U32 => FieldValue::U32(u32::from_le_bytes(delta.get_array())),
        FieldKind::U64 => FieldValue::U64(u64::from_le_bytes(delta.get_array())),
        FieldKind::I8 => FieldValue::I8(i8::from_le_bytes(delta.get_array())),
        FieldKind::I16 => FieldValue::I16(i16::from_le_bytes(delta.get_array())),
        FieldKind::I32 => FieldValue::I32(i32::from_le_bytes(delta.get_array())),
        FieldKind::I64 => FieldValue::I64(i64::from_le_bytes(delta.get_array())),
        FieldKind::Float(codec) => {
            let mut raw = [0u8; 4];
            delta.get_bytes(&mut raw[..codec.wire_size()]);
            FieldValue::F32(codec.from_bits(u32::from_le_bytes(raw)))
        }
        FieldKind::Enum { variants } => {
            let mut raw = [0u8; 4];
            delta.get_bytes(&mut raw[..enum_width(variants)]);
            let value = u32::from_le_bytes(raw);
            if value >= variants {
                delta.set_error(BitError::RangeViolation {
                    value: u64::from(value),
                    limit: u64::from(variants),
                });
                return FieldValue::Enum(0);
            }
            FieldValue::Enum(value)
        }
        FieldKind::Str { max_len } => FieldValue::Str(delta.get_string(usize::from(max_len))),
    }
}

type SlotPair<'a> = (EntitySlot, Option<&'a EntityState>, Option<&'a EntityState>);

/// Walks the union of both snapshots' slots in ascending order.
fn merge_slots<'a>(
    baseline: &'a Snapshot,
    current: &'a Snapshot,
) -> impl Iterator<Item = SlotPair<'a>> {
    let mut base = baseline.iter().peekable();
    let mut cur = current.iter().peekable();
    std::iter::from_fn(move || {
        let order = match (base.peek(), cur.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((b, _)), Some((c, _))) => b.cmp(c),
        };
        match order {
            Ordering::Less => base.next().map(|(slot, state)| (slot, Some(state), None)),
            Ordering::Greater => cur.next().map(|(slot, state)| (slot, None, Some(state))),
            Ordering::Equal => {
                let (slot, b) = base.next()?;
                let (_, c) = cur.next()?;
                Some((slot, Some(b), Some(c)))
            }
        }
    })
}
