//! Deterministic schema hashing.

use blake3::Hasher;

use crate::{FieldKind, FloatCodec, Schema};

/// Computes a deterministic hash of the wire layout of `schema`.
///
/// Leaf names, kinds and order contribute; the schema's own name does not.
#[must_use]
pub fn schema_hash(schema: &Schema) -> u64 {
    let mut hasher = Hasher::new();
    write_len(&mut hasher, schema.fields.len());

    for field in &schema.fields {
        write_len(&mut hasher, field.name.len());
        hasher.update(field.name.as_bytes());
        write_kind(&mut hasher, field.kind);
    }

    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(out)
}

fn write_kind(hasher: &mut Hasher, kind: FieldKind) {
    match kind {
        FieldKind::Bool => write_u8(hasher, 0),
        FieldKind::U8 => write_u8(hasher, 1),
        FieldKind::U16 => write_u8(hasher, 2),
        FieldKind::U32 => write_u8(hasher, 3),
        FieldKind::U64 => write_u8(hasher, 4),
        FieldKind::I8 => write_u8(hasher, 5),
        FieldKind::I16 => write_u8(hasher, 6),
        FieldKind::I32 => write_u8(hasher, 7),
        FieldKind::I64 => write_u8(hasher, 8),
        FieldKind::Float(codec) => {
            write_u8(hasher, 9);
            write_u8(
                hasher,
                match codec {
                    FloatCodec::Full => 0,
                    FloatCodec::Half => 1,
                    FloatCodec::Angle16 => 2,
                },
            );
        }
        FieldKind::Enum { variants } => {
            write_u8(hasher, 10);
            hasher.update(&variants.to_le_bytes());
        }
        FieldKind::Str { max_len } => {
            write_u8(hasher, 11);
            hasher.update(&max_len.to_le_bytes());
        }
    }
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_len(hasher: &mut Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}
