use bitstream::MessageBuffer;
use codec::{
    decode_snapshot_delta, decode_snapshot_message, encode_snapshot_delta,
    encode_snapshot_message, CodecLimits, CodecScratch, EntitySlot, EntityState, FieldValue,
    MessageKind, Snapshot, SnapshotTick,
};
use proptest::prelude::*;
use schema::{FieldKind, FloatCodec, Schema};

fn schema() -> Schema {
    Schema::builder("prop")
        .field("alive", FieldKind::Bool)
        .vec3("origin", FloatCodec::Half)
        .vec3("angles", FloatCodec::Angle16)
        .field("speed", FieldKind::f32())
        .field("flags", FieldKind::U32)
        .field("score", FieldKind::I64)
        .field("weapon", FieldKind::enumeration(300))
        .field("name", FieldKind::string(12))
        .build()
        .unwrap()
}

fn state_strategy() -> impl Strategy<Value = Vec<FieldValue>> {
    (
        any::<bool>(),
        prop::array::uniform3(-4096.0f32..4096.0),
        prop::array::uniform3(-720.0f32..720.0),
        -1.0e6f32..1.0e6,
        any::<u32>(),
        any::<i64>(),
        0u32..300,
        "[a-z_]{0,12}",
    )
        .prop_map(|(alive, origin, angles, speed, flags, score, weapon, name)| {
            let mut values = vec![FieldValue::Bool(alive)];
            values.extend(origin.into_iter().map(FieldValue::F32));
            values.extend(angles.into_iter().map(FieldValue::F32));
            values.push(FieldValue::F32(speed));
            values.push(FieldValue::U32(flags));
            values.push(FieldValue::I64(score));
            values.push(FieldValue::Enum(weapon));
            values.push(FieldValue::Str(name));
            values
        })
}

fn entities_strategy() -> impl Strategy<Value = Vec<(u16, Vec<FieldValue>)>> {
    prop::collection::btree_map(1u16..64, state_strategy(), 0..12)
        .prop_map(|map| map.into_iter().collect::<Vec<_>>())
}

fn build(schema: &Schema, tick: u32, entries: Vec<(u16, Vec<FieldValue>)>) -> Snapshot {
    let mut snapshot = Snapshot::new(SnapshotTick::new(tick));
    for (slot, values) in entries {
        snapshot.insert(
            EntitySlot::new(slot).unwrap(),
            EntityState::from_values(schema, values).unwrap(),
        );
    }
    snapshot
}

proptest! {
    #[test]
    fn prop_delta_roundtrip(
        baseline in entities_strategy(),
        current in entities_strategy(),
    ) {
        let schema = schema();
        let limits = CodecLimits::for_testing();
        let baseline = build(&schema, 1, baseline).quantized(&schema);
        let current = build(&schema, 2, current);

        let mut out = MessageBuffer::new(16 * 1024);
        encode_snapshot_delta(&schema, &baseline, &current, &limits, &mut out).unwrap();
        let decoded = decode_snapshot_delta(
            &schema,
            &baseline,
            out.as_bytes(),
            current.tick,
            &limits,
        )
        .unwrap();
        prop_assert_eq!(decoded, current.quantized(&schema));
    }

    #[test]
    fn prop_identical_snapshots_encode_empty(entries in entities_strategy()) {
        let schema = schema();
        let limits = CodecLimits::for_testing();
        let quantized = build(&schema, 1, entries).quantized(&schema);
        let mut out = MessageBuffer::new(16 * 1024);
        encode_snapshot_delta(&schema, &quantized, &quantized, &limits, &mut out).unwrap();
        prop_assert_eq!(out.as_bytes(), &[0u8][..]);
    }

    #[test]
    fn prop_message_roundtrip(
        baseline in entities_strategy(),
        current in entities_strategy(),
    ) {
        let schema = schema();
        let limits = CodecLimits::for_testing();
        let wire_limits = wire::Limits::default();
        let baseline = build(&schema, 5, baseline).quantized(&schema);
        let current = build(&schema, 9, current);

        let mut out = MessageBuffer::new(wire_limits.max_message_bytes);
        encode_snapshot_message(
            &schema,
            MessageKind::Delta { baseline: &baseline },
            &current,
            &[],
            &limits,
            &wire_limits,
            &mut CodecScratch::new(),
            &mut out,
        )
        .unwrap();
        let decoded = decode_snapshot_message(
            &schema,
            out.as_bytes(),
            &limits,
            &wire_limits,
            |tick| (tick == baseline.tick).then_some(&baseline),
        )
        .unwrap();
        prop_assert_eq!(decoded.snapshot, current.quantized(&schema));
    }

    #[test]
    fn prop_decode_never_panics(
        body in prop::collection::vec(any::<u8>(), 0..256),
        entries in entities_strategy(),
    ) {
        let schema = schema();
        let baseline = build(&schema, 1, entries);
        let _ = decode_snapshot_delta(
            &schema,
            &baseline,
            &body,
            SnapshotTick::new(2),
            &CodecLimits::for_testing(),
        );
    }
}
