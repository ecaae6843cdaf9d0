#![no_main]

use bitstream::{ByteReader, DeltaReader, MAX_DELTA_FIELDS};
use codec::{
    decode_entity_delta, decode_fields, decode_snapshot_message, CodecLimits, EntitySlot,
    EntityState, Snapshot, SnapshotTick,
};
use libfuzzer_sys::fuzz_target;
use schema::{FieldKind, FloatCodec, Schema};

fn schema() -> Schema {
    Schema::builder("fuzz")
        .field("alive", FieldKind::Bool)
        .vec3("origin", FloatCodec::Half)
        .field("yaw", FieldKind::angle())
        .field("weapon", FieldKind::enumeration(5))
        .field("name", FieldKind::string(8))
        .build()
        .unwrap()
}

fuzz_target!(|data: &[u8]| {
    // Raw field mask walk driven by the input itself.
    let mut reader = ByteReader::new(data);
    let mut delta = DeltaReader::begin(&mut reader, MAX_DELTA_FIELDS);
    for _ in 0..64 {
        if delta.get_bit() {
            let _ = delta.get_array::<2>();
        }
    }
    let _ = delta.finish();

    let schema = schema();
    let baseline_state = EntityState::zeroed(&schema);
    let _ = decode_entity_delta(&schema, Some(&baseline_state), &mut ByteReader::new(data));
    let _ = decode_entity_delta(&schema, None, &mut ByteReader::new(data));
    let _ = decode_fields(&schema, Some(&baseline_state), &mut ByteReader::new(data));

    let mut baseline = Snapshot::new(SnapshotTick::new(1));
    if let Some(slot) = EntitySlot::new(3) {
        baseline.insert(slot, baseline_state);
    }
    let _ = decode_snapshot_message(
        &schema,
        data,
        &CodecLimits::for_testing(),
        &wire::Limits::for_testing(),
        |_| Some(&baseline),
    );
});
