//! Snapshot and entity state types.

use std::collections::BTreeMap;

use schema::{FieldKind, FloatCodec, Schema};

use crate::error::{CodecError, CodecResult, ValueReason};
use crate::types::{EntitySlot, SnapshotTick};

/// A single leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    Enum(u32),
    Str(String),
}

impl FieldValue {
    /// The all-zero value for `kind`.
    #[must_use]
    pub fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bool => Self::Bool(false),
            FieldKind::U8 => Self::U8(0),
            FieldKind::U16 => Self::U16(0),
            FieldKind::U32 => Self::U32(0),
            FieldKind::U64 => Self::U64(0),
            FieldKind::I8 => Self::I8(0),
            FieldKind::I16 => Self::I16(0),
            FieldKind::I32 => Self::I32(0),
            FieldKind::I64 => Self::I64(0),
            FieldKind::Float(_) => Self::F32(0.0),
            FieldKind::Enum { .. } => Self::Enum(0),
            FieldKind::Str { .. } => Self::Str(String::new()),
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::Enum(_) => "enum",
            Self::Str(_) => "string",
        }
    }

    /// Checks that this value is representable as `kind`.
    pub fn check(&self, kind: FieldKind) -> Result<(), ValueReason> {
        match (kind, self) {
            (FieldKind::Bool, Self::Bool(_))
            | (FieldKind::U8, Self::U8(_))
            | (FieldKind::U16, Self::U16(_))
            | (FieldKind::U32, Self::U32(_))
            | (FieldKind::U64, Self::U64(_))
            | (FieldKind::I8, Self::I8(_))
            | (FieldKind::I16, Self::I16(_))
            | (FieldKind::I32, Self::I32(_))
            | (FieldKind::I64, Self::I64(_))
            | (FieldKind::Float(_), Self::F32(_)) => Ok(()),
            (FieldKind::Enum { variants }, Self::Enum(value)) => {
                if *value < variants {
                    Ok(())
                } else {
                    Err(ValueReason::EnumOutOfRange {
                        value: *value,
                        variants,
                    })
                }
            }
            (FieldKind::Str { max_len }, Self::Str(text)) => {
                if text.len() > usize::from(max_len) {
                    Err(ValueReason::StringTooLong {
                        len: text.len(),
                        max_len,
                    })
                } else if text.as_bytes().contains(&0) {
                    Err(ValueReason::StringContainsNul)
                } else {
                    Ok(())
                }
            }
            (kind, value) => Err(ValueReason::TypeMismatch {
                expected: kind_name(kind),
                found: value.type_name(),
            }),
        }
    }
}

/// Returns the value a receiver reconstructs after `value` crosses the wire.
///
/// Only float leaves lose precision; everything else is returned unchanged.
#[must_use]
pub fn quantize_value(kind: FieldKind, value: &FieldValue) -> FieldValue {
    match (kind, value) {
        (FieldKind::Float(codec), FieldValue::F32(v)) => FieldValue::F32(codec.quantize(*v)),
        _ => value.clone(),
    }
}

const fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool => "bool",
        FieldKind::U8 => "u8",
        FieldKind::U16 => "u16",
        FieldKind::U32 => "u32",
        FieldKind::U64 => "u64",
        FieldKind::I8 => "i8",
        FieldKind::I16 => "i16",
        FieldKind::I32 => "i32",
        FieldKind::I64 => "i64",
        FieldKind::Float(FloatCodec::Full) => "f32",
        FieldKind::Float(FloatCodec::Half) => "f32 (half)",
        FieldKind::Float(FloatCodec::Angle16) => "f32 (angle)",
        FieldKind::Enum { .. } => "enum",
        FieldKind::Str { .. } => "string",
    }
}

/// The state of one entity: one value per schema leaf, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    values: Vec<FieldValue>,
}

impl EntityState {
    /// Creates a state with every leaf at its zero value.
    #[must_use]
    pub fn zeroed(schema: &Schema) -> Self {
        Self {
            values: schema
                .fields
                .iter()
                .map(|field| FieldValue::zero(field.kind))
                .collect(),
        }
    }

    /// Creates a state from explicit values, validating each against `schema`.
    pub fn from_values(schema: &Schema, values: Vec<FieldValue>) -> CodecResult<Self> {
        if values.len() != schema.len() {
            return Err(CodecError::FieldCountMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        for (field, (def, value)) in schema.fields.iter().zip(&values).enumerate() {
            value
                .check(def.kind)
                .map_err(|reason| CodecError::InvalidValue { field, reason })?;
        }
        Ok(Self { values })
    }

    /// Returns the value of leaf `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Returns the value of the leaf called `name`.
    #[must_use]
    pub fn get_named(&self, schema: &Schema, name: &str) -> Option<&FieldValue> {
        schema.index_of(name).and_then(|index| self.get(index))
    }

    /// Replaces the value of leaf `index`.
    pub fn set(&mut self, schema: &Schema, index: usize, value: FieldValue) -> CodecResult<()> {
        let Some(def) = schema.fields.get(index) else {
            return Err(CodecError::InvalidValue {
                field: index,
                reason: ValueReason::IndexOutOfRange { len: schema.len() },
            });
        };
        value
            .check(def.kind)
            .map_err(|reason| CodecError::InvalidValue {
                field: index,
                reason,
            })?;
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CodecError::FieldCountMismatch {
                expected: schema.len(),
                actual: self.values.len(),
            }),
        }
    }

    /// Replaces the value of the leaf called `name`.
    pub fn set_named(&mut self, schema: &Schema, name: &str, value: FieldValue) -> CodecResult<()> {
        let index = schema
            .index_of(name)
            .ok_or_else(|| CodecError::UnknownField {
                name: name.to_owned(),
            })?;
        self.set(schema, index, value)
    }

    /// All leaf values in schema order.
    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [FieldValue] {
        &mut self.values
    }

    /// Returns this state as a receiver would reconstruct it.
    #[must_use]
    pub fn quantized(&self, schema: &Schema) -> Self {
        Self {
            values: schema
                .fields
                .iter()
                .zip(&self.values)
                .map(|(def, value)| quantize_value(def.kind, value))
                .collect(),
        }
    }
}

/// A world snapshot at a specific tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: SnapshotTick,
    pub entities: BTreeMap<EntitySlot, EntityState>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new(tick: SnapshotTick) -> Self {
        Self {
            tick,
            entities: BTreeMap::new(),
        }
    }

    /// Inserts or replaces an entity, returning the previous state.
    pub fn insert(&mut self, slot: EntitySlot, state: EntityState) -> Option<EntityState> {
        self.entities.insert(slot, state)
    }

    pub fn remove(&mut self, slot: EntitySlot) -> Option<EntityState> {
        self.entities.remove(&slot)
    }

    #[must_use]
    pub fn get(&self, slot: EntitySlot) -> Option<&EntityState> {
        self.entities.get(&slot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates entities in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntitySlot, &EntityState)> {
        self.entities.iter().map(|(slot, state)| (*slot, state))
    }

    /// Returns this snapshot as a receiver would reconstruct it.
    #[must_use]
    pub fn quantized(&self, schema: &Schema) -> Self {
        Self {
            tick: self.tick,
            entities: self
                .entities
                .iter()
                .map(|(slot, state)| (*slot, state.quantized(schema)))
                .collect(),
        }
    }
}
