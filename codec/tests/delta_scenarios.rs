use bitstream::{mask_len, ByteReader, MessageBuffer};
use codec::{
    decode_entity_delta, decode_fields, decode_snapshot_delta, encode_entity_delta,
    encode_fields, encode_snapshot_delta, CodecLimits, EntitySlot, EntityState, FieldValue,
    Snapshot, SnapshotTick,
};
use schema::{float_to_half, FieldKind, FloatCodec, Schema, ANGLE_PRECISION};

fn entity_schema() -> Schema {
    Schema::builder("entity")
        .vec3("origin", FloatCodec::Half)
        .vec3("angles", FloatCodec::Angle16)
        .bbox("bounds", FloatCodec::Half)
        .color("tint")
        .field("model", FieldKind::U16)
        .field("frame", FieldKind::U8)
        .field("effects", FieldKind::U32)
        .field("movetype", FieldKind::enumeration(10))
        .field("classname", FieldKind::string(32))
        .array("ammo", 4, FieldKind::I16)
        .build()
        .unwrap()
}

fn set(schema: &Schema, state: &mut EntityState, name: &str, value: FieldValue) {
    state.set_named(schema, name, value).unwrap();
}

fn encode(schema: &Schema, baseline: &EntityState, current: &EntityState) -> Vec<u8> {
    let mut out = MessageBuffer::new(1024);
    encode_fields(schema, Some(baseline), current, &mut out).unwrap();
    out.as_bytes().to_vec()
}

fn decode(schema: &Schema, baseline: &EntityState, bytes: &[u8]) -> EntityState {
    let mut reader = ByteReader::new(bytes);
    let state = decode_fields(schema, Some(baseline), &mut reader).unwrap();
    assert!(reader.is_empty());
    state
}

/// Returns the indices of the set flags in a field block's mask.
fn set_leaves(bytes: &[u8]) -> Vec<usize> {
    let count = bytes[0] as usize;
    let mask = &bytes[1..=mask_len(count)];
    (0..count)
        .filter(|&i| mask[i / 8] & (1 << (i % 8)) != 0)
        .collect()
}

#[test]
fn origin_z_change_carries_one_half_float() {
    let schema = entity_schema();
    let baseline = EntityState::zeroed(&schema);
    let mut current = baseline.clone();
    set(&schema, &mut current, "origin.z", FieldValue::F32(1.0));

    let bytes = encode(&schema, &baseline, &current);
    let z = schema.index_of("origin.z").unwrap();
    assert_eq!(set_leaves(&bytes), vec![z]);

    let header = 1 + mask_len(schema.len());
    assert_eq!(&bytes[header..], &float_to_half(1.0).to_le_bytes());
    assert_eq!(decode(&schema, &baseline, &bytes), current);
}

#[test]
fn yaw_wraps_from_350_to_5_degrees() {
    let schema = entity_schema();
    let mut baseline = EntityState::zeroed(&schema);
    set(&schema, &mut baseline, "angles.y", FieldValue::F32(350.0));
    let baseline = baseline.quantized(&schema);
    let mut current = baseline.clone();
    set(&schema, &mut current, "angles.y", FieldValue::F32(5.0));

    let bytes = encode(&schema, &baseline, &current);
    let yaw = schema.index_of("angles.y").unwrap();
    assert_eq!(set_leaves(&bytes), vec![yaw]);
    let header = 1 + mask_len(schema.len());
    assert_eq!(bytes.len() - header, 2);

    let decoded = decode(&schema, &baseline, &bytes);
    let Some(FieldValue::F32(angle)) = decoded.get(yaw) else {
        panic!("yaw should decode as a float");
    };
    assert!((angle - 5.0).abs() <= ANGLE_PRECISION, "decoded {angle}");
}

#[test]
fn unchanged_state_costs_only_count_and_mask() {
    let schema = entity_schema();
    let mut state = EntityState::zeroed(&schema);
    set(&schema, &mut state, "origin.x", FieldValue::F32(12.5));
    set(
        &schema,
        &mut state,
        "classname",
        FieldValue::Str("monster_dog".into()),
    );
    set(&schema, &mut state, "tint.a", FieldValue::U8(255));

    let bytes = encode(&schema, &state, &state);
    assert_eq!(bytes.len(), 1 + mask_len(schema.len()));
    assert!(set_leaves(&bytes).is_empty());
}

#[test]
fn quantization_noise_below_precision_is_not_a_change() {
    let schema = entity_schema();
    let mut baseline = EntityState::zeroed(&schema);
    set(&schema, &mut baseline, "angles.x", FieldValue::F32(90.0));
    let mut current = baseline.clone();
    set(&schema, &mut current, "angles.x", FieldValue::F32(90.0001));

    let bytes = encode(&schema, &baseline, &current);
    assert!(set_leaves(&bytes).is_empty());
}

#[test]
fn each_leaf_changes_in_isolation() {
    let schema = entity_schema();
    let baseline = EntityState::zeroed(&schema);
    for (index, def) in schema.fields.iter().enumerate() {
        let value = match def.kind {
            FieldKind::Bool => FieldValue::Bool(true),
            FieldKind::U8 => FieldValue::U8(7),
            FieldKind::U16 => FieldValue::U16(7),
            FieldKind::U32 => FieldValue::U32(7),
            FieldKind::U64 => FieldValue::U64(7),
            FieldKind::I8 => FieldValue::I8(-7),
            FieldKind::I16 => FieldValue::I16(-7),
            FieldKind::I32 => FieldValue::I32(-7),
            FieldKind::I64 => FieldValue::I64(-7),
            FieldKind::Float(_) => FieldValue::F32(7.0),
            FieldKind::Enum { .. } => FieldValue::Enum(7),
            FieldKind::Str { .. } => FieldValue::Str("seven".into()),
        };
        let mut current = baseline.clone();
        current.set(&schema, index, value).unwrap();

        let bytes = encode(&schema, &baseline, &current);
        assert_eq!(set_leaves(&bytes), vec![index], "{}", def.name);
        let header = 1 + mask_len(schema.len());
        let expected_len = def.kind.wire_size().unwrap_or("seven".len() + 1);
        assert_eq!(bytes.len() - header, expected_len, "{}", def.name);
        assert_eq!(
            decode(&schema, &baseline, &bytes),
            current.quantized(&schema),
            "{}",
            def.name
        );
    }
}

#[test]
fn entity_block_prefixes_the_field_block_with_an_exists_byte() {
    let schema = entity_schema();
    let baseline = EntityState::zeroed(&schema);
    let mut current = baseline.clone();
    set(&schema, &mut current, "frame", FieldValue::U8(9));

    let mut out = MessageBuffer::new(1024);
    encode_entity_delta(&schema, Some(&baseline), Some(&current), &mut out).unwrap();
    let bytes = out.as_bytes();
    assert_eq!(bytes[0], 1);
    assert_eq!(&bytes[1..], encode(&schema, &baseline, &current).as_slice());

    let mut reader = ByteReader::new(bytes);
    let decoded = decode_entity_delta(&schema, Some(&baseline), &mut reader).unwrap();
    assert_eq!(decoded, Some(current));

    let mut out = MessageBuffer::new(16);
    encode_entity_delta(&schema, Some(&baseline), None, &mut out).unwrap();
    assert_eq!(out.as_bytes(), &[0]);
}

#[test]
fn snapshot_delta_creates_updates_and_removes() {
    let schema = entity_schema();
    let limits = CodecLimits::for_testing();
    let slot = |raw| EntitySlot::new(raw).unwrap();

    let mut baseline = Snapshot::new(SnapshotTick::new(40));
    for raw in [1, 2, 3] {
        let mut state = EntityState::zeroed(&schema);
        set(&schema, &mut state, "model", FieldValue::U16(raw));
        baseline.insert(slot(raw), state);
    }

    let mut current = baseline.clone();
    current.tick = SnapshotTick::new(41);
    current.remove(slot(2));
    let mut moved = current.get(slot(3)).unwrap().clone();
    set(&schema, &mut moved, "origin.x", FieldValue::F32(-64.0));
    current.insert(slot(3), moved);
    let mut spawned = EntityState::zeroed(&schema);
    set(
        &schema,
        &mut spawned,
        "classname",
        FieldValue::Str("item_shells".into()),
    );
    current.insert(slot(200), spawned);

    let mut out = MessageBuffer::new(4096);
    encode_snapshot_delta(&schema, &baseline, &current, &limits, &mut out).unwrap();
    let decoded =
        decode_snapshot_delta(&schema, &baseline, out.as_bytes(), current.tick, &limits).unwrap();
    assert_eq!(decoded, current.quantized(&schema));
}

#[test]
fn decode_failure_leaves_baseline_usable() {
    let schema = entity_schema();
    let limits = CodecLimits::for_testing();
    let mut baseline = Snapshot::new(SnapshotTick::new(1));
    baseline.insert(EntitySlot::new(1).unwrap(), EntityState::zeroed(&schema));

    let mut current = baseline.clone();
    current.tick = SnapshotTick::new(2);
    let mut state = EntityState::zeroed(&schema);
    set(&schema, &mut state, "frame", FieldValue::U8(3));
    current.insert(EntitySlot::new(1).unwrap(), state);

    let mut out = MessageBuffer::new(256);
    encode_snapshot_delta(&schema, &baseline, &current, &limits, &mut out).unwrap();
    let bytes = out.as_bytes();

    for cut in 0..bytes.len() {
        assert!(
            decode_snapshot_delta(&schema, &baseline, &bytes[..cut], current.tick, &limits)
                .is_err(),
            "prefix of {cut} bytes should not decode"
        );
    }
    let decoded =
        decode_snapshot_delta(&schema, &baseline, bytes, current.tick, &limits).unwrap();
    assert_eq!(decoded, current);
}
