//! Schema definitions and validation.

use std::collections::HashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::{FieldDef, FieldKind, FloatCodec};

/// Maximum number of leaves. One mask slot per entity is reserved for the
/// presence flag.
pub const MAX_SCHEMA_FIELDS: usize = 1023;

/// An ordered list of leaf fields shared by encoder and decoder.
///
/// Composite values (vectors, boxes, colors, arrays) are flattened into
/// named leaves by [`SchemaBuilder`]; the order of `fields` is the wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl Schema {
    /// Creates a schema from leaves after validation.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> SchemaResult<Self> {
        let schema = Self {
            name: name.into(),
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Creates a schema builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the position of the leaf called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Upper bound of one entity's payload in bytes.
    #[must_use]
    pub fn max_payload_len(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.kind.max_wire_size())
            .sum()
    }

    /// Validates schema invariants.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.fields.len() > MAX_SCHEMA_FIELDS {
            return Err(SchemaError::TooManyFields {
                count: self.fields.len(),
                max: MAX_SCHEMA_FIELDS,
            });
        }
        let mut names = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName { index });
            }
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
            validate_field(field)?;
        }
        Ok(())
    }
}

fn validate_field(field: &FieldDef) -> SchemaResult<()> {
    match field.kind {
        FieldKind::Enum { variants: 0 } => Err(SchemaError::InvalidEnum {
            name: field.name.clone(),
        }),
        FieldKind::Str { max_len: 0 } => Err(SchemaError::InvalidStringBound {
            name: field.name.clone(),
        }),
        _ => Ok(()),
    }
}

/// Builder for `Schema`.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Adds a scalar leaf.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef::new(name, kind));
        self
    }

    /// Adds a 3-vector as `name.x`, `name.y`, `name.z`.
    #[must_use]
    pub fn vec3(mut self, name: &str, codec: FloatCodec) -> Self {
        self.push_vec3(name, codec);
        self
    }

    /// Adds a bounding box as two 3-vectors, `name.mins` and `name.maxs`.
    #[must_use]
    pub fn bbox(mut self, name: &str, codec: FloatCodec) -> Self {
        self.push_vec3(&format!("{name}.mins"), codec);
        self.push_vec3(&format!("{name}.maxs"), codec);
        self
    }

    /// Adds an RGBA8 color as `name.r`, `name.g`, `name.b`, `name.a`.
    #[must_use]
    pub fn color(mut self, name: &str) -> Self {
        for channel in ["r", "g", "b", "a"] {
            self.fields
                .push(FieldDef::new(format!("{name}.{channel}"), FieldKind::U8));
        }
        self
    }

    /// Adds a fixed array as `name[0]` through `name[len - 1]`.
    #[must_use]
    pub fn array(mut self, name: &str, len: usize, kind: FieldKind) -> Self {
        for index in 0..len {
            self.fields
                .push(FieldDef::new(format!("{name}[{index}]"), kind));
        }
        self
    }

    fn push_vec3(&mut self, name: &str, codec: FloatCodec) {
        for axis in ["x", "y", "z"] {
            self.fields.push(FieldDef::new(
                format!("{name}.{axis}"),
                FieldKind::Float(codec),
            ));
        }
    }

    /// Builds the schema after validation.
    pub fn build(self) -> SchemaResult<Schema> {
        Schema::new(self.name, self.fields)
    }
}
